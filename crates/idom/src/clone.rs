use crate::error::TreeError;
use crate::tree::{NodeData, Tree};
use crate::types::{ItemKind, NodeId};

impl Tree {
    /// Deep-copy `item` into a new, unattached subtree.
    ///
    /// Each copied group starts with an empty child sequence (and a fresh
    /// name index) and is refilled through the normal append path, so the
    /// copy's index is rebuilt rather than copied.
    pub fn clone_deep(&mut self, item: NodeId) -> Result<NodeId, TreeError> {
        let root = self.clone_shallow(item)?;
        let mut copied = 1usize;
        let mut stack = vec![(item, root)];
        while let Some((source, target)) = stack.pop() {
            let Some(group) = self.record(source)?.data.group() else {
                continue;
            };
            let children = group.children.clone();
            for child in children {
                let copy = self.clone_shallow(child)?;
                self.append_child(target, copy)?;
                copied += 1;
                if self.is_group(child) {
                    stack.push((child, copy));
                }
            }
        }
        log::debug!(target: "idom.tree", "cloned {item} as {root} ({copied} items)");
        Ok(root)
    }

    /// Copy one item without its children.
    fn clone_shallow(&mut self, item: NodeId) -> Result<NodeId, TreeError> {
        let data = match &self.record(item)?.data {
            NodeData::Document(_) => NodeData::Document(self.new_group_data(ItemKind::Document)),
            NodeData::Element { name, .. } => NodeData::Element {
                name: name.clone(),
                group: self.new_group_data(ItemKind::Element),
            },
            NodeData::Text(text) => NodeData::Text(text.clone()),
            NodeData::CData(text) => NodeData::CData(text.clone()),
            NodeData::Comment(text) => NodeData::Comment(text.clone()),
            NodeData::EntityReference(name) => NodeData::EntityReference(name.clone()),
            NodeData::Binary(bytes) => NodeData::Binary(bytes.clone()),
            NodeData::ProcessingInstruction { target, data } => NodeData::ProcessingInstruction {
                target: target.clone(),
                data: data.clone(),
            },
        };
        Ok(self.alloc(data))
    }
}
