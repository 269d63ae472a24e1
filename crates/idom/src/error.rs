use crate::types::{ItemKind, NodeId};
use thiserror::Error;

/// Structural misuse of the tree.
///
/// Every variant is returned before any mutation is committed, so the tree is
/// unchanged when a call fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("a {kind} item cannot be a child of group {group}")]
    InvalidKind { group: NodeId, kind: ItemKind },

    #[error("item {item} is owned by {owner}; detach or clone it first")]
    AlreadyOwned { item: NodeId, owner: NodeId },

    #[error("adding {item} to {group} would make it its own descendant")]
    Cycle { group: NodeId, item: NodeId },

    #[error("item {item} is not a child of {group}")]
    NotFound { group: NodeId, item: NodeId },

    #[error("index {index} is out of bounds for {group} with {len} children")]
    IndexOutOfBounds {
        group: NodeId,
        index: usize,
        len: usize,
    },

    #[error("item {0} is not a group")]
    NotAGroup(NodeId),

    #[error("unknown item {0}")]
    UnknownNode(NodeId),

    #[error("{kind} items do not support {operation}")]
    NotSupported {
        kind: ItemKind,
        operation: &'static str,
    },

    #[error("invalid name pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Corruption found by [`Tree::check_invariants`](crate::Tree::check_invariants).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("child {child} of {group} records parent {recorded:?}")]
    ParentMismatch {
        group: NodeId,
        child: NodeId,
        recorded: Option<NodeId>,
    },

    #[error("item {0} is reachable more than once")]
    SharedItem(NodeId),

    #[error("group {0} is its own descendant")]
    Cycle(NodeId),

    #[error("group {group} holds a {kind} child {child}")]
    IllegalChild {
        group: NodeId,
        child: NodeId,
        kind: ItemKind,
    },

    #[error("name index of {group} is out of sync for '{name}'")]
    IndexMismatch { group: NodeId, name: String },

    #[error("dangling handle {0}")]
    Dangling(NodeId),
}
