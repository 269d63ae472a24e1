use crate::error::TreeError;
use crate::tree::{NodeData, Tree};
use crate::types::{ItemKind, NodeId};

impl Tree {
    /// Merge runs of adjacent coalesceable children of the same kind.
    ///
    /// The first item of each run keeps the concatenated text; the rest are
    /// detached. Returns how many items were removed, summed over all child
    /// groups when `recursive` is set.
    pub fn coalesce(&mut self, group: NodeId, recursive: bool) -> Result<usize, TreeError> {
        let mut removed = 0;
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            removed += self.coalesce_children(current)?;
            if recursive {
                for child in &self.group(current)?.children {
                    if self.record(*child)?.data.group().is_some() {
                        stack.push(*child);
                    }
                }
            }
        }
        log::debug!(target: "idom.tree", "coalesced {group}: {removed} items removed");
        Ok(removed)
    }

    fn coalesce_children(&mut self, group: NodeId) -> Result<usize, TreeError> {
        let children = self.group(group)?.children.clone();
        let mut kept = Vec::with_capacity(children.len());
        let mut merged = Vec::new();
        let mut pending: Option<(NodeId, ItemKind)> = None;
        let mut buffer: Option<String> = None;

        for child in children {
            let kind = self.kind(child)?;
            let coalesceable = kind.is_coalesceable();
            if let Some((target, target_kind)) = pending {
                if coalesceable && target_kind == kind {
                    if buffer.is_none() {
                        buffer = Some(self.stored_text(target)?.to_string());
                    }
                    if let Some(buf) = buffer.as_mut() {
                        buf.push_str(self.stored_text(child)?);
                    }
                    merged.push(child);
                    continue;
                }
                if let Some(text) = buffer.take() {
                    self.set_text(target, &text)?;
                }
            }
            pending = coalesceable.then_some((child, kind));
            kept.push(child);
        }
        if let (Some((target, _)), Some(text)) = (pending, buffer.take()) {
            self.set_text(target, &text)?;
        }

        if merged.is_empty() {
            return Ok(0);
        }
        self.group_mut(group)?.children = kept;
        for item in &merged {
            // Coalesceable kinds are never elements, so the index is untouched.
            self.record_mut(*item)?.parent = None;
        }
        log::trace!(target: "idom.sequence", "coalesce {group}: merged {}", merged.len());
        self.after_mutation(group);
        Ok(merged.len())
    }

    fn stored_text(&self, id: NodeId) -> Result<&str, TreeError> {
        Ok(match &self.record(id)?.data {
            NodeData::Text(text) | NodeData::CData(text) => text.as_str(),
            _ => "",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_text() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let a = tree.create_element("a");
        let hello = tree.create_text("hello");
        let world = tree.create_text(" world");
        let b = tree.create_element("b");
        for id in [a, hello, world, b] {
            tree.append_child(root, id).unwrap();
        }

        assert_eq!(tree.coalesce(root, false).unwrap(), 1);
        assert_eq!(tree.children(root).unwrap(), &[a, hello, b]);
        assert_eq!(tree.text(hello).unwrap().as_deref(), Some("hello world"));
        assert_eq!(tree.parent(world).unwrap(), None);
    }

    #[test]
    fn different_kinds_are_not_merged() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let t1 = tree.create_text("a");
        let c1 = tree.create_cdata("b");
        let c2 = tree.create_cdata("c");
        let t2 = tree.create_text("d");
        for id in [t1, c1, c2, t2] {
            tree.append_child(root, id).unwrap();
        }
        assert_eq!(tree.coalesce(root, false).unwrap(), 1);
        assert_eq!(tree.children(root).unwrap(), &[t1, c1, t2]);
        assert_eq!(tree.text(c1).unwrap().as_deref(), Some("bc"));
    }

    #[test]
    fn non_coalesceable_breaks_runs() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let parts = [
            tree.create_text("a"),
            tree.create_comment("x"),
            tree.create_comment("y"),
            tree.create_text("b"),
            tree.create_text("c"),
            tree.create_text("d"),
        ];
        for id in parts {
            tree.append_child(root, id).unwrap();
        }
        assert_eq!(tree.coalesce(root, false).unwrap(), 2);
        assert_eq!(tree.child_count(root).unwrap(), 4);
        assert_eq!(tree.text(parts[3]).unwrap().as_deref(), Some("bcd"));
        assert_eq!(tree.text(parts[1]).unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn recursive_sums_nested_groups() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let inner = tree.create_element("inner");
        tree.append_child(root, inner).unwrap();
        for text in ["1", "2", "3"] {
            let t = tree.create_text(text);
            tree.append_child(inner, t).unwrap();
        }
        let t = tree.create_text("x");
        tree.append_child(root, t).unwrap();

        assert_eq!(tree.coalesce(root, false).unwrap(), 0);
        assert_eq!(tree.coalesce(root, true).unwrap(), 2);
        assert_eq!(tree.text(inner).unwrap().as_deref(), Some("123"));
        tree.check_invariants(root).unwrap();
    }

    #[test]
    fn empty_texts_still_merge() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let a = tree.create_text("");
        let b = tree.create_text("");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        assert_eq!(tree.coalesce(root, false).unwrap(), 1);
        assert_eq!(tree.children(root).unwrap(), &[a]);
    }
}
