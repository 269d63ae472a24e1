//! Name-keyed index over a group's element children.
//!
//! Each bucket holds the element children sharing one tag name. Bucket
//! membership always equals the set of same-named element children; bucket
//! order follows the anchor rule in `put` and may differ from document order.

use crate::types::NodeId;
use indexmap::IndexMap;

#[derive(Clone, Debug, Default)]
pub struct NameIndex {
    // Bucket names iterate in creation order.
    buckets: IndexMap<String, Vec<NodeId>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `element` to the `name` bucket.
    ///
    /// If `anchor` is already in that bucket (it therefore shares the name),
    /// `element` goes immediately before it; otherwise it is appended.
    pub fn put(&mut self, name: &str, element: NodeId, anchor: Option<NodeId>) {
        if !self.buckets.contains_key(name) {
            log::trace!(target: "idom.index", "create bucket '{name}'");
            self.buckets.insert(name.to_string(), Vec::new());
        }
        let Some(bucket) = self.buckets.get_mut(name) else {
            return;
        };
        let at = anchor.and_then(|anchor| bucket.iter().position(|id| *id == anchor));
        match at {
            Some(pos) => bucket.insert(pos, element),
            None => bucket.push(element),
        }
    }

    /// First element of the `name` bucket.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.buckets.get(name).and_then(|bucket| bucket.first().copied())
    }

    /// The whole `name` bucket; empty when no element has that name.
    pub fn get_all(&self, name: &str) -> &[NodeId] {
        self.buckets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove `element` from the `name` bucket, dropping the bucket once empty.
    pub fn remove(&mut self, name: &str, element: NodeId) {
        let Some(bucket) = self.buckets.get_mut(name) else {
            return;
        };
        bucket.retain(|id| *id != element);
        if bucket.is_empty() {
            log::trace!(target: "idom.index", "drop bucket '{name}'");
            self.buckets.shift_remove(name);
        }
    }

    pub fn any(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Bucket names in the order their buckets were created.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.buckets.keys().map(String::as_str)
    }

    /// Total number of indexed elements.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub(crate) fn buckets(&self) -> impl Iterator<Item = (&str, &[NodeId])> + '_ {
        self.buckets
            .iter()
            .map(|(name, bucket)| (name.as_str(), bucket.as_slice()))
    }
}
