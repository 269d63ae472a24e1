//! Child-sequence mutation pipeline.
//!
//! Every structural change to a group runs validate -> index -> commit:
//! - validate: the child kind is permitted by the group, the item is
//!   unattached, and inserting it cannot create a cycle;
//! - index: element children are placed in the group's name index, using the
//!   anchor rule below;
//! - commit: the child list and the item's parent link are updated together.
//!
//! Nothing is mutated until validation has passed.
//!
//! Anchor rule: a new element is positioned in its name bucket relative to the
//! structural occupant `other` it is inserted in front of (or replaces). If
//! `other` is an element it is the anchor; otherwise the first element after
//! `other` is. The index then inserts before the anchor only when the anchor
//! shares the new element's name, and appends otherwise.

use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::{ItemKind, NodeId};

impl Tree {
    // -- reads --

    /// Children of `group` in document order.
    pub fn children(&self, group: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.group(group)?.children)
    }

    pub fn child_count(&self, group: NodeId) -> Result<usize, TreeError> {
        Ok(self.group(group)?.children.len())
    }

    pub fn child_at(&self, group: NodeId, index: usize) -> Result<Option<NodeId>, TreeError> {
        Ok(self.group(group)?.children.get(index).copied())
    }

    pub fn first_child(&self, group: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.group(group)?.children.first().copied())
    }

    pub fn last_child(&self, group: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.group(group)?.children.last().copied())
    }

    pub fn has_children(&self, group: NodeId) -> Result<bool, TreeError> {
        Ok(!self.group(group)?.children.is_empty())
    }

    /// Position of `item` among the children of `group`.
    pub fn position_of(&self, group: NodeId, item: NodeId) -> Result<Option<usize>, TreeError> {
        Ok(self.group(group)?.children.iter().position(|c| *c == item))
    }

    /// Live, mutable handle over the children of `group`.
    pub fn sequence_mut(&mut self, group: NodeId) -> Result<ChildSequence<'_>, TreeError> {
        self.group(group)?;
        Ok(ChildSequence { tree: self, group })
    }

    // -- mutations --

    /// Attach `item` to `group`, before `before` or at the end.
    pub fn attach(
        &mut self,
        item: NodeId,
        group: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        match before {
            Some(before) => self.insert_before(group, item, before),
            None => self.append_child(group, item),
        }
    }

    pub fn append_child(&mut self, group: NodeId, item: NodeId) -> Result<(), TreeError> {
        let len = self.child_count(group)?;
        self.insert_at(group, len, item)
    }

    /// Insert `item` in front of the existing child `before`.
    pub fn insert_before(
        &mut self,
        group: NodeId,
        item: NodeId,
        before: NodeId,
    ) -> Result<(), TreeError> {
        let pos = self
            .position_of(group, before)?
            .ok_or(TreeError::NotFound {
                group,
                item: before,
            })?;
        self.insert_at(group, pos, item)
    }

    /// Insert `item` so that it ends up at `index`. `index == len` appends.
    pub fn insert_at(&mut self, group: NodeId, index: usize, item: NodeId) -> Result<(), TreeError> {
        let len = self.child_count(group)?;
        if index > len {
            return Err(TreeError::IndexOutOfBounds { group, index, len });
        }
        self.validate_insert(group, item)?;
        // The occupant at `index` is the structural "following" sibling.
        let anchor = self.index_anchor(group, (index < len).then_some(index))?;
        self.index_put(group, item, anchor)?;
        self.group_mut(group)?.children.insert(index, item);
        self.record_mut(item)?.parent = Some(group);
        log::trace!(target: "idom.sequence", "insert {item} into {group} at {index}");
        self.after_mutation(group);
        Ok(())
    }

    /// Replace the child `old` with `new`. Returns the detached `old`.
    pub fn replace_child(
        &mut self,
        group: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<NodeId, TreeError> {
        let pos = self
            .position_of(group, old)?
            .ok_or(TreeError::NotFound { group, item: old })?;
        self.set_at(group, pos, new)
    }

    /// Replace the child at `index` with `item`. Returns the detached occupant.
    pub fn set_at(&mut self, group: NodeId, index: usize, item: NodeId) -> Result<NodeId, TreeError> {
        let len = self.child_count(group)?;
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { group, index, len });
        }
        self.validate_insert(group, item)?;
        // The new element is indexed while the old occupant is still in place,
        // so a same-named occupant anchors it; the occupant leaves afterwards.
        let anchor = self.index_anchor(group, Some(index))?;
        self.index_put(group, item, anchor)?;
        let old = std::mem::replace(&mut self.group_mut(group)?.children[index], item);
        self.record_mut(item)?.parent = Some(group);
        self.release(group, old)?;
        log::trace!(target: "idom.sequence", "replace {old} with {item} in {group} at {index}");
        self.after_mutation(group);
        Ok(old)
    }

    pub fn remove_child(&mut self, group: NodeId, item: NodeId) -> Result<(), TreeError> {
        let pos = self
            .position_of(group, item)?
            .ok_or(TreeError::NotFound { group, item })?;
        self.remove_at(group, pos)?;
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub fn remove_at(&mut self, group: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let len = self.child_count(group)?;
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { group, index, len });
        }
        let item = self.group_mut(group)?.children.remove(index);
        self.release(group, item)?;
        log::trace!(target: "idom.sequence", "remove {item} from {group} at {index}");
        self.after_mutation(group);
        Ok(item)
    }

    /// Remove every child of `group`, returning them in their former order.
    pub fn detach_all(&mut self, group: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let children = std::mem::take(&mut self.group_mut(group)?.children);
        for child in &children {
            self.release(group, *child)?;
        }
        log::trace!(target: "idom.sequence", "detach {} children of {group}", children.len());
        self.after_mutation(group);
        Ok(children)
    }

    // -- pipeline stages --

    fn validate_insert(&self, group: NodeId, item: NodeId) -> Result<(), TreeError> {
        self.check_insert(group, item).inspect_err(|err| {
            log::debug!(target: "idom.sequence", "rejected {item} for {group}: {err}");
        })
    }

    fn check_insert(&self, group: NodeId, item: NodeId) -> Result<(), TreeError> {
        let group_kind = self.kind(group)?;
        if !group_kind.is_group() {
            return Err(TreeError::NotAGroup(group));
        }
        let record = self.record(item)?;
        let kind = record.data.kind();
        if !group_kind.permits_child(kind) {
            return Err(TreeError::InvalidKind { group, kind });
        }
        if let Some(owner) = record.parent {
            return Err(TreeError::AlreadyOwned { item, owner });
        }
        if kind.is_group() && self.is_self_or_ancestor(item, group) {
            return Err(TreeError::Cycle { group, item });
        }
        Ok(())
    }

    /// Resolve the index anchor for the structural position `at`.
    fn index_anchor(&self, group: NodeId, at: Option<usize>) -> Result<Option<NodeId>, TreeError> {
        let Some(at) = at else {
            return Ok(None);
        };
        let children = &self.group(group)?.children;
        let other = children[at];
        if self.kind(other)? == ItemKind::Element {
            return Ok(Some(other));
        }
        Ok(self.next_element_after(children, at))
    }

    fn index_put(
        &mut self,
        group: NodeId,
        item: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<(), TreeError> {
        let Some(name) = self.record(item)?.data.element_tag().map(str::to_string) else {
            return Ok(());
        };
        if let Some(index) = self.group_mut(group)?.index.as_mut() {
            index.put(&name, item, anchor);
        }
        Ok(())
    }

    /// Side effects of an item leaving `group`: parent cleared, index updated.
    fn release(&mut self, group: NodeId, item: NodeId) -> Result<(), TreeError> {
        let record = self.record_mut(item)?;
        record.parent = None;
        let Some(name) = record.data.element_tag().map(str::to_string) else {
            return Ok(());
        };
        if let Some(index) = self.group_mut(group)?.index.as_mut() {
            index.remove(&name, item);
        }
        Ok(())
    }

    #[cfg(feature = "tree-invariants")]
    pub(crate) fn after_mutation(&self, group: NodeId) {
        if let Err(violation) = self.check_invariants(group) {
            panic!("tree invariant violated after mutating {group}: {violation}");
        }
    }

    #[cfg(not(feature = "tree-invariants"))]
    #[inline]
    pub(crate) fn after_mutation(&self, _group: NodeId) {}
}

/// Mutable view over one group's children.
///
/// Its methods are thin entry points into the same validated pipeline as the
/// `Tree` methods; there is no way to push a raw handle past the checks.
pub struct ChildSequence<'a> {
    tree: &'a mut Tree,
    group: NodeId,
}

impl ChildSequence<'_> {
    pub fn group(&self) -> NodeId {
        self.group
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.as_slice().get(index).copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        self.tree.children(self.group).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn push(&mut self, item: NodeId) -> Result<(), TreeError> {
        self.tree.append_child(self.group, item)
    }

    pub fn insert(&mut self, index: usize, item: NodeId) -> Result<(), TreeError> {
        self.tree.insert_at(self.group, index, item)
    }

    pub fn insert_before(&mut self, item: NodeId, before: Option<NodeId>) -> Result<(), TreeError> {
        self.tree.attach(item, self.group, before)
    }

    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<NodeId, TreeError> {
        self.tree.replace_child(self.group, old, new)
    }

    pub fn set(&mut self, index: usize, item: NodeId) -> Result<NodeId, TreeError> {
        self.tree.set_at(self.group, index, item)
    }

    pub fn remove(&mut self, item: NodeId) -> Result<(), TreeError> {
        self.tree.remove_child(self.group, item)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<NodeId, TreeError> {
        self.tree.remove_at(self.group, index)
    }

    pub fn detach_all(&mut self) -> Result<Vec<NodeId>, TreeError> {
        self.tree.detach_all(self.group)
    }
}
