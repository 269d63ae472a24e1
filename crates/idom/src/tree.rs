//! Arena holding every item of one document tree.
//!
//! Items are addressed by [`NodeId`] handles. A group owns its children by
//! listing their handles; each item records its owning group as a plain
//! back-reference. All structural mutation goes through the child-sequence
//! operations in `sequence.rs`, which keep both sides in step.

use crate::config::TreeConfig;
use crate::error::TreeError;
use crate::name_index::NameIndex;
use crate::types::{ItemKind, NodeId, QName};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct Tree {
    id: u32,
    nodes: Vec<Option<NodeRecord>>,
    live: usize,
    config: TreeConfig,
}

pub(crate) struct NodeRecord {
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
}

pub(crate) enum NodeData {
    Document(GroupData),
    Element { name: QName, group: GroupData },
    Text(String),
    CData(String),
    Comment(String),
    EntityReference(String),
    Binary(Vec<u8>),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Default)]
pub(crate) struct GroupData {
    pub(crate) children: Vec<NodeId>,
    pub(crate) index: Option<NameIndex>,
}

impl NodeData {
    pub(crate) fn kind(&self) -> ItemKind {
        match self {
            NodeData::Document(_) => ItemKind::Document,
            NodeData::Element { .. } => ItemKind::Element,
            NodeData::Text(_) => ItemKind::Text,
            NodeData::CData(_) => ItemKind::CData,
            NodeData::Comment(_) => ItemKind::Comment,
            NodeData::EntityReference(_) => ItemKind::EntityReference,
            NodeData::Binary(_) => ItemKind::Binary,
            NodeData::ProcessingInstruction { .. } => ItemKind::ProcessingInstruction,
        }
    }

    pub(crate) fn group(&self) -> Option<&GroupData> {
        match self {
            NodeData::Document(group) | NodeData::Element { group, .. } => Some(group),
            _ => None,
        }
    }

    pub(crate) fn group_mut(&mut self) -> Option<&mut GroupData> {
        match self {
            NodeData::Document(group) | NodeData::Element { group, .. } => Some(group),
            _ => None,
        }
    }

    /// Tag name when this is an element.
    pub(crate) fn element_tag(&self) -> Option<&str> {
        match self {
            NodeData::Element { name, .. } => Some(name.tag_name()),
            _ => None,
        }
    }

    /// Stored text of textual leaves; `None` for groups and named leaves.
    pub(crate) fn leaf_text(&self) -> Option<Cow<'_, str>> {
        match self {
            NodeData::Text(text) | NodeData::CData(text) | NodeData::Comment(text) => {
                Some(Cow::Borrowed(text))
            }
            NodeData::Binary(bytes) => Some(String::from_utf8_lossy(bytes)),
            NodeData::ProcessingInstruction { data, .. } => Some(Cow::Borrowed(data)),
            NodeData::Document(_) | NodeData::Element { .. } | NodeData::EntityReference(_) => {
                None
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            live: 0,
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of live items, attached or not.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether `id` names a live item of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.record(id).is_ok()
    }

    // -- construction --

    pub fn create_document(&mut self) -> NodeId {
        let group = self.new_group_data(ItemKind::Document);
        self.alloc(NodeData::Document(group))
    }

    /// Create an element with no namespace URI. `tag` may carry a `prefix:`.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_qname(QName::new(tag))
    }

    pub fn create_element_ns(&mut self, tag: &str, namespace_uri: &str) -> NodeId {
        self.create_element_qname(QName::with_uri(tag, namespace_uri))
    }

    pub fn create_element_qname(&mut self, name: QName) -> NodeId {
        let group = self.new_group_data(ItemKind::Element);
        self.alloc(NodeData::Element { name, group })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_cdata(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::CData(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    pub fn create_entity_reference(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::EntityReference(name.to_string()))
    }

    pub fn create_binary(&mut self, value: Vec<u8>) -> NodeId {
        self.alloc(NodeData::Binary(value))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.alloc(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    pub(crate) fn new_group_data(&self, kind: ItemKind) -> GroupData {
        let indexed = match kind {
            ItemKind::Element => self.config.index_elements,
            ItemKind::Document => self.config.index_documents,
            _ => false,
        };
        GroupData {
            children: Vec::new(),
            index: indexed.then(NameIndex::new),
        }
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.id, self.nodes.len() as u32);
        self.nodes.push(Some(NodeRecord { parent: None, data }));
        self.live += 1;
        id
    }

    // -- record access --

    pub(crate) fn record(&self, id: NodeId) -> Result<&NodeRecord, TreeError> {
        if id.tree != self.id {
            return Err(TreeError::UnknownNode(id));
        }
        self.nodes
            .get(id.index as usize)
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, TreeError> {
        if id.tree != self.id {
            return Err(TreeError::UnknownNode(id));
        }
        self.nodes
            .get_mut(id.index as usize)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn group(&self, id: NodeId) -> Result<&GroupData, TreeError> {
        self.record(id)?
            .data
            .group()
            .ok_or(TreeError::NotAGroup(id))
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> Result<&mut GroupData, TreeError> {
        self.record_mut(id)?
            .data
            .group_mut()
            .ok_or(TreeError::NotAGroup(id))
    }

    // -- item contract --

    pub fn kind(&self, id: NodeId) -> Result<ItemKind, TreeError> {
        Ok(self.record(id)?.data.kind())
    }

    pub fn is_group(&self, id: NodeId) -> bool {
        self.kind(id).is_ok_and(ItemKind::is_group)
    }

    /// Item name: the tag name for elements, the entity name, the PI target,
    /// or a fixed `#kind` name for the rest.
    pub fn name(&self, id: NodeId) -> Result<&str, TreeError> {
        let data = &self.record(id)?.data;
        let name = match data {
            NodeData::Element { name, .. } => name.tag_name(),
            NodeData::EntityReference(name) => name.as_str(),
            NodeData::ProcessingInstruction { target, .. } => target.as_str(),
            other => other.kind().fixed_name().unwrap_or_default(),
        };
        Ok(name)
    }

    /// Qualified name of an element.
    pub fn qname(&self, id: NodeId) -> Result<&QName, TreeError> {
        match &self.record(id)?.data {
            NodeData::Element { name, .. } => Ok(name),
            other => Err(TreeError::NotSupported {
                kind: other.kind(),
                operation: "qualified names",
            }),
        }
    }

    /// Item text.
    ///
    /// Elements report the concatenation of their direct text, CDATA and
    /// binary children. Documents and entity references have no text.
    pub fn text(&self, id: NodeId) -> Result<Option<Cow<'_, str>>, TreeError> {
        let data = &self.record(id)?.data;
        let NodeData::Element { group, .. } = data else {
            return Ok(data.leaf_text());
        };
        let mut out = String::new();
        for child in &group.children {
            let child = &self.record(*child)?.data;
            if child.kind().contributes_to_element_text() {
                if let Some(text) = child.leaf_text() {
                    out.push_str(&text);
                }
            }
        }
        Ok(Some(Cow::Owned(out)))
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        let data = &mut self.record_mut(id)?.data;
        match data {
            NodeData::Text(value) | NodeData::CData(value) | NodeData::Comment(value) => {
                value.clear();
                value.push_str(text);
            }
            NodeData::Binary(bytes) => {
                bytes.clear();
                bytes.extend_from_slice(text.as_bytes());
            }
            NodeData::ProcessingInstruction { data, .. } => {
                data.clear();
                data.push_str(text);
            }
            other => {
                return Err(TreeError::NotSupported {
                    kind: other.kind(),
                    operation: "setting text",
                });
            }
        }
        Ok(())
    }

    /// Rename an element, entity reference or processing instruction.
    ///
    /// Renaming an attached element moves it to its new bucket in the
    /// parent's name index, anchored on the next element sibling.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        let record = self.record(id)?;
        let parent = record.parent;
        match &record.data {
            NodeData::Element { name: old, .. } => {
                let old = old.tag_name().to_string();
                if let Some(parent) = parent {
                    self.reindex_renamed(parent, id, &old, name)?;
                }
                if let NodeData::Element { name: qname, .. } = &mut self.record_mut(id)?.data {
                    qname.rename(name);
                }
                if let Some(parent) = parent {
                    self.after_mutation(parent);
                }
            }
            NodeData::EntityReference(_) => {
                if let NodeData::EntityReference(value) = &mut self.record_mut(id)?.data {
                    *value = name.to_string();
                }
            }
            NodeData::ProcessingInstruction { .. } => {
                if let NodeData::ProcessingInstruction { target, .. } =
                    &mut self.record_mut(id)?.data
                {
                    *target = name.to_string();
                }
            }
            other => {
                return Err(TreeError::NotSupported {
                    kind: other.kind(),
                    operation: "renaming",
                });
            }
        }
        Ok(())
    }

    fn reindex_renamed(
        &mut self,
        parent: NodeId,
        id: NodeId,
        old: &str,
        new: &str,
    ) -> Result<(), TreeError> {
        let group = self.group(parent)?;
        if group.index.is_none() {
            return Ok(());
        }
        let anchor = group
            .children
            .iter()
            .position(|child| *child == id)
            .and_then(|pos| self.next_element_after(&group.children, pos));
        if let Some(index) = self.group_mut(parent)?.index.as_mut() {
            index.remove(old, id);
            index.put(new, id, anchor);
        }
        Ok(())
    }

    /// First element in `children` strictly after `pos`.
    pub(crate) fn next_element_after(&self, children: &[NodeId], pos: usize) -> Option<NodeId> {
        children.iter().skip(pos + 1).copied().find(|child| {
            self.record(*child)
                .is_ok_and(|record| record.data.kind() == ItemKind::Element)
        })
    }

    // -- ancestry --

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.record(id)?.parent)
    }

    /// Owning groups of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.record(id).ok().and_then(|record| record.parent),
        }
    }

    /// Topmost ancestor of `id`, or `id` itself when unattached.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        self.record(id)?;
        Ok(self.ancestors(id).last().unwrap_or(id))
    }

    /// First document in the chain `id, parent(id), ...`.
    pub fn document_of(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        if self.kind(id)? == ItemKind::Document {
            return Ok(Some(id));
        }
        Ok(self
            .ancestors(id)
            .find(|a| self.kind(*a).is_ok_and(|k| k == ItemKind::Document)))
    }

    /// Whether `candidate` is `of` or one of its ancestors.
    pub(crate) fn is_self_or_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        candidate == of || self.ancestors(of).any(|a| a == candidate)
    }

    // -- lifetime --

    /// Detach `item` from its owning group. Unattached items are returned as is.
    pub fn detach(&mut self, item: NodeId) -> Result<NodeId, TreeError> {
        if let Some(parent) = self.parent(item)? {
            self.remove_child(parent, item)?;
        }
        Ok(item)
    }

    /// Free an unattached item together with its whole subtree.
    pub fn discard(&mut self, item: NodeId) -> Result<(), TreeError> {
        if let Some(owner) = self.parent(item)? {
            return Err(TreeError::AlreadyOwned { item, owner });
        }
        let mut stack = vec![item];
        let mut freed = 0usize;
        while let Some(current) = stack.pop() {
            let Some(slot) = self.nodes.get_mut(current.index as usize) else {
                continue;
            };
            if let Some(record) = slot.take() {
                if let Some(group) = record.data.group() {
                    stack.extend(group.children.iter().copied());
                }
                freed += 1;
            }
        }
        self.live -= freed;
        log::debug!(target: "idom.tree", "discarded {item} ({freed} items)");
        Ok(())
    }
}

/// Iterator over the owning groups of an item, nearest first.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self
            .tree
            .record(current)
            .ok()
            .and_then(|record| record.parent);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_items_are_unattached() {
        let mut tree = Tree::new();
        let e = tree.create_element("a");
        let t = tree.create_text("x");
        assert_eq!(tree.parent(e).unwrap(), None);
        assert_eq!(tree.parent(t).unwrap(), None);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn names_follow_kind() {
        let mut tree = Tree::new();
        let doc = tree.create_document();
        let e = tree.create_element("svg:rect");
        let t = tree.create_text("x");
        let c = tree.create_cdata("x");
        let r = tree.create_entity_reference("amp");
        let pi = tree.create_processing_instruction("xml-stylesheet", "href='a'");
        assert_eq!(tree.name(doc).unwrap(), "#document");
        assert_eq!(tree.name(e).unwrap(), "svg:rect");
        assert_eq!(tree.name(t).unwrap(), "#text");
        assert_eq!(tree.name(c).unwrap(), "#cdata-section");
        assert_eq!(tree.name(r).unwrap(), "amp");
        assert_eq!(tree.name(pi).unwrap(), "xml-stylesheet");
    }

    #[test]
    fn element_text_concatenates_textual_children() {
        let mut tree = Tree::new();
        let e = tree.create_element("p");
        let parts = [
            tree.create_text("a"),
            tree.create_comment("skipped"),
            tree.create_cdata("b"),
            tree.create_binary(b"c".to_vec()),
        ];
        for part in parts {
            tree.append_child(e, part).unwrap();
        }
        assert_eq!(tree.text(e).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn set_text_rejected_for_groups() {
        let mut tree = Tree::new();
        let e = tree.create_element("p");
        let err = tree.set_text(e, "x").unwrap_err();
        assert_eq!(
            err,
            TreeError::NotSupported {
                kind: ItemKind::Element,
                operation: "setting text"
            }
        );
    }

    #[test]
    fn foreign_handles_are_unknown() {
        let mut a = Tree::new();
        let b = Tree::new();
        let e = a.create_element("x");
        assert_eq!(b.kind(e), Err(TreeError::UnknownNode(e)));
    }

    #[test]
    fn document_of_walks_up() {
        let mut tree = Tree::new();
        let doc = tree.create_document();
        let root = tree.create_element("root");
        let leaf = tree.create_text("t");
        tree.append_child(doc, root).unwrap();
        tree.append_child(root, leaf).unwrap();
        assert_eq!(tree.document_of(leaf).unwrap(), Some(doc));
        assert_eq!(tree.root_of(leaf).unwrap(), doc);
        assert_eq!(tree.ancestors(leaf).collect::<Vec<_>>(), vec![root, doc]);
    }

    #[test]
    fn discard_frees_subtree_but_not_attached_items() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let child = tree.create_element("child");
        let leaf = tree.create_text("t");
        tree.append_child(root, child).unwrap();
        tree.append_child(child, leaf).unwrap();

        assert!(matches!(
            tree.discard(child),
            Err(TreeError::AlreadyOwned { .. })
        ));
        tree.discard(root).unwrap();
        assert!(tree.is_empty());
        assert!(!tree.contains(leaf));
    }

    #[test]
    fn rename_attached_element_moves_bucket() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();

        tree.set_name(a, "b").unwrap();
        assert_eq!(tree.element(root, "a").unwrap(), None);
        assert_eq!(tree.elements(root, "b").unwrap(), vec![a, b]);
        tree.check_invariants(root).unwrap();
    }

    #[test]
    fn repeated_renames_keep_parent_index_consistent() {
        let mut tree = Tree::new();
        let root = tree.create_element("root");
        let ids: Vec<NodeId> = ["x", "y", "x", "y"]
            .into_iter()
            .map(|name| {
                let e = tree.create_element(name);
                tree.append_child(root, e).unwrap();
                e
            })
            .collect();

        for (id, name) in [(ids[1], "x"), (ids[0], "y"), (ids[3], "x"), (ids[2], "z")] {
            tree.set_name(id, name).unwrap();
            tree.check_invariants(root).unwrap();
        }
        assert_eq!(tree.elements(root, "x").unwrap(), vec![ids[1], ids[3]]);
        assert_eq!(tree.elements(root, "y").unwrap(), vec![ids[0]]);
        assert_eq!(tree.element(root, "z").unwrap(), Some(ids[2]));
    }
}
