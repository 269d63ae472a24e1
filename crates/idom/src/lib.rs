//! Mutable document tree with strict single ownership.
//!
//! A [`Tree`] owns every item; callers hold [`NodeId`] handles. Groups
//! (documents and elements) keep an ordered child sequence and, when
//! configured, a name index that answers exact tag-name lookups without
//! scanning. All structural edits are validated before anything changes.

mod clone;
mod coalesce;
mod config;
pub mod debug;
mod error;
mod invariants;
mod name_index;
mod query;
mod sequence;
mod tree;
mod types;
mod view;

pub use config::TreeConfig;
pub use error::{InvariantViolation, TreeError};
pub use name_index::NameIndex;
pub use query::FindMode;
pub use sequence::ChildSequence;
pub use tree::{Ancestors, Tree};
pub use types::{ItemKind, NodeId, QName};
pub use view::SequenceView;
