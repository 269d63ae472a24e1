use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::NodeId;

/// Read-only handle over a group's children.
///
/// The handle stores only the group, so every read sees the sequence as it
/// is at that moment. Reads on a discarded group report an empty sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SequenceView {
    group: NodeId,
}

impl SequenceView {
    pub fn group(self) -> NodeId {
        self.group
    }

    pub fn len(self, tree: &Tree) -> usize {
        self.slice(tree).len()
    }

    pub fn is_empty(self, tree: &Tree) -> bool {
        self.slice(tree).is_empty()
    }

    pub fn item(self, tree: &Tree, index: usize) -> Option<NodeId> {
        self.slice(tree).get(index).copied()
    }

    pub fn iter<'t>(self, tree: &'t Tree) -> impl Iterator<Item = NodeId> + 't {
        self.slice(tree).iter().copied()
    }

    pub fn to_vec(self, tree: &Tree) -> Vec<NodeId> {
        self.slice(tree).to_vec()
    }

    fn slice<'t>(self, tree: &'t Tree) -> &'t [NodeId] {
        tree.children(self.group).unwrap_or(&[])
    }
}

impl Tree {
    /// Read-only view over the children of `group`.
    pub fn view(&self, group: NodeId) -> Result<SequenceView, TreeError> {
        self.group(group)?;
        Ok(SequenceView { group })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_tracks_later_mutations() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let view = tree.view(root).unwrap();
        assert!(view.is_empty(&tree));

        let a = tree.create_element("a");
        let b = tree.create_text("b");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        assert_eq!(view.len(&tree), 2);
        assert_eq!(view.item(&tree, 1), Some(b));

        tree.remove_child(root, a).unwrap();
        assert_eq!(view.to_vec(&tree), vec![b]);
        assert_eq!(view.item(&tree, 1), None);
    }

    #[test]
    fn view_requires_group() {
        let mut tree = Tree::new();
        let text = tree.create_text("x");
        assert_eq!(tree.view(text), Err(TreeError::NotAGroup(text)));
    }

    #[test]
    fn view_of_discarded_group_is_empty() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let child = tree.create_element("child");
        tree.append_child(root, child).unwrap();
        let view = tree.view(root).unwrap();
        tree.discard(root).unwrap();
        assert_eq!(view.len(&tree), 0);
        assert_eq!(view.iter(&tree).count(), 0);
    }
}
