use crate::error::{InvariantViolation, TreeError};
use crate::name_index::NameIndex;
use crate::tree::{GroupData, Tree};
use crate::types::{ItemKind, NodeId};
use std::collections::HashSet;

impl Tree {
    /// Walk the subtree under `root` and verify its structural invariants.
    ///
    /// Checked per group: every child records the group as its parent, its
    /// kind is permitted, no item is reachable twice, the group is not its own
    /// descendant, and the name index (if any) holds exactly the element
    /// children, each under its own tag name.
    pub fn check_invariants(&self, root: NodeId) -> Result<(), InvariantViolation> {
        self.record(root)
            .map_err(|_| InvariantViolation::Dangling(root))?;
        let mut seen = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let record = self
                .record(current)
                .map_err(|_| InvariantViolation::Dangling(current))?;
            let Some(group) = record.data.group() else {
                continue;
            };
            let group_kind = record.data.kind();
            for &child in &group.children {
                let child_record = self
                    .record(child)
                    .map_err(|_| InvariantViolation::Dangling(child))?;
                if child == root {
                    return Err(InvariantViolation::Cycle(root));
                }
                if !seen.insert(child) {
                    return Err(InvariantViolation::SharedItem(child));
                }
                if child_record.parent != Some(current) {
                    return Err(InvariantViolation::ParentMismatch {
                        group: current,
                        child,
                        recorded: child_record.parent,
                    });
                }
                let kind = child_record.data.kind();
                if !group_kind.permits_child(kind) {
                    return Err(InvariantViolation::IllegalChild {
                        group: current,
                        child,
                        kind,
                    });
                }
                if kind.is_group() {
                    stack.push(child);
                }
            }
            if let Some(index) = &group.index {
                self.check_index(current, group, index)?;
            }
        }
        Ok(())
    }

    fn check_index(
        &self,
        id: NodeId,
        group: &GroupData,
        index: &NameIndex,
    ) -> Result<(), InvariantViolation> {
        let mut indexed = HashSet::new();
        for (name, bucket) in index.buckets() {
            let mismatch = || InvariantViolation::IndexMismatch {
                group: id,
                name: name.to_string(),
            };
            if bucket.is_empty() {
                return Err(mismatch());
            }
            for &member in bucket {
                let record = self.record(member).map_err(|_| mismatch())?;
                if record.parent != Some(id) || record.data.element_tag() != Some(name) {
                    return Err(mismatch());
                }
                if !indexed.insert(member) {
                    return Err(mismatch());
                }
            }
        }
        for &child in &group.children {
            let Ok(record) = self.record(child) else {
                continue;
            };
            if let Some(tag) = record.data.element_tag() {
                if !indexed.contains(&child) {
                    return Err(InvariantViolation::IndexMismatch {
                        group: id,
                        name: tag.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Name index of `group`, or `None` when the group scans.
    #[cfg(any(test, feature = "internal-api"))]
    pub fn name_index(&self, group: NodeId) -> Result<Option<&NameIndex>, TreeError> {
        Ok(self.group(group)?.index.as_ref())
    }

    /// Whether `group` carries a name index.
    pub fn is_indexed(&self, group: NodeId) -> Result<bool, TreeError> {
        Ok(self.group(group)?.index.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeData;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let text = tree.create_text("t");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, text).unwrap();
        tree.append_child(a, b).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn well_formed_tree_passes() {
        let (tree, root, ..) = sample();
        assert_eq!(tree.check_invariants(root), Ok(()));
    }

    #[test]
    fn parent_mismatch_is_reported() {
        let (mut tree, root, a, b) = sample();
        tree.record_mut(b).unwrap().parent = Some(root);
        assert_eq!(
            tree.check_invariants(root),
            Err(InvariantViolation::ParentMismatch {
                group: a,
                child: b,
                recorded: Some(root),
            })
        );
    }

    #[test]
    fn shared_item_is_reported() {
        let (mut tree, root, a, b) = sample();
        tree.group_mut(a).unwrap().children.push(b);
        assert_eq!(
            tree.check_invariants(root),
            Err(InvariantViolation::SharedItem(b))
        );
    }

    #[test]
    fn cycle_is_reported() {
        let (mut tree, root, a, _) = sample();
        tree.group_mut(a).unwrap().children.push(root);
        assert_eq!(tree.check_invariants(root), Err(InvariantViolation::Cycle(root)));
    }

    #[test]
    fn illegal_child_is_reported() {
        let mut tree = Tree::new();
        let doc = tree.create_document();
        let text = tree.create_text("loose");
        tree.group_mut(doc).unwrap().children.push(text);
        tree.record_mut(text).unwrap().parent = Some(doc);
        assert_eq!(
            tree.check_invariants(doc),
            Err(InvariantViolation::IllegalChild {
                group: doc,
                child: text,
                kind: ItemKind::Text,
            })
        );
    }

    #[test]
    fn stale_index_is_reported() {
        let (mut tree, root, a, _) = sample();
        if let NodeData::Element { name, .. } = &mut tree.record_mut(a).unwrap().data {
            name.rename("renamed");
        }
        assert_eq!(
            tree.check_invariants(root),
            Err(InvariantViolation::IndexMismatch {
                group: root,
                name: "a".to_string(),
            })
        );
    }

    #[test]
    fn discarded_child_is_dangling() {
        let (mut tree, root, a, b) = sample();
        tree.remove_child(a, b).unwrap();
        tree.discard(b).unwrap();
        tree.group_mut(a).unwrap().children.push(b);
        assert_eq!(tree.check_invariants(root), Err(InvariantViolation::Dangling(b)));
    }

    #[test]
    fn index_inspection() {
        let (tree, root, a, _) = sample();
        let index = tree.name_index(root).unwrap().unwrap();
        assert_eq!(index.get_all("a"), &[a]);
        assert!(tree.is_indexed(root).unwrap());

        let mut unindexed = Tree::with_config(crate::TreeConfig::unindexed());
        let e = unindexed.create_element("e");
        assert!(unindexed.name_index(e).unwrap().is_none());
    }
}
