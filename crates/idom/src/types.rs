use std::fmt;

/// Handle to an item stored in a [`Tree`](crate::Tree).
///
/// Handles are bound to the tree that created them; passing a handle to a
/// different tree is reported as [`TreeError::UnknownNode`](crate::TreeError).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) tree: u32,
    pub(crate) index: u32,
}

impl NodeId {
    pub(crate) fn new(tree: u32, index: u32) -> Self {
        Self { tree, index }
    }

    /// Arena slot of this handle. Stable for the lifetime of the item.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Concrete kind of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    EntityReference,
    Binary,
    ProcessingInstruction,
}

impl ItemKind {
    /// Kinds that own a child sequence.
    pub fn is_group(self) -> bool {
        matches!(self, ItemKind::Document | ItemKind::Element)
    }

    /// Kinds whose adjacent runs are merged by `coalesce`.
    pub fn is_coalesceable(self) -> bool {
        matches!(self, ItemKind::Text | ItemKind::CData)
    }

    /// Kinds contributing to an element's concatenated text.
    pub(crate) fn contributes_to_element_text(self) -> bool {
        matches!(self, ItemKind::Text | ItemKind::CData | ItemKind::Binary)
    }

    /// Whether a group of kind `self` accepts a child of kind `child`.
    pub fn permits_child(self, child: ItemKind) -> bool {
        match self {
            ItemKind::Element => matches!(
                child,
                ItemKind::Element
                    | ItemKind::Text
                    | ItemKind::CData
                    | ItemKind::Comment
                    | ItemKind::EntityReference
                    | ItemKind::Binary
                    | ItemKind::ProcessingInstruction
            ),
            ItemKind::Document => matches!(
                child,
                ItemKind::Element | ItemKind::Comment | ItemKind::ProcessingInstruction
            ),
            _ => false,
        }
    }

    /// Fixed name reported by kinds that have no user-assigned name.
    pub(crate) fn fixed_name(self) -> Option<&'static str> {
        match self {
            ItemKind::Document => Some("#document"),
            ItemKind::Text => Some("#text"),
            ItemKind::CData => Some("#cdata-section"),
            ItemKind::Comment => Some("#comment"),
            ItemKind::Binary => Some("#binary"),
            ItemKind::Element | ItemKind::EntityReference | ItemKind::ProcessingInstruction => {
                None
            }
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemKind::Document => "document",
            ItemKind::Element => "element",
            ItemKind::Text => "text",
            ItemKind::CData => "cdata",
            ItemKind::Comment => "comment",
            ItemKind::EntityReference => "entity reference",
            ItemKind::Binary => "binary",
            ItemKind::ProcessingInstruction => "processing instruction",
        };
        f.write_str(label)
    }
}

/// Namespace-qualified element name.
///
/// Invariant: `tag` is always `prefix ":" local` when `prefix` is non-empty,
/// otherwise `local`. An empty prefix or URI means "none".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QName {
    tag: String,
    prefix_len: usize,
    uri: String,
}

impl QName {
    /// Parse a tag name, splitting an optional `prefix:` off the local name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_uri(tag, "")
    }

    pub fn with_uri(tag: impl Into<String>, uri: impl Into<String>) -> Self {
        let tag = tag.into();
        let prefix_len = tag.find(':').unwrap_or(0);
        Self {
            tag,
            prefix_len,
            uri: uri.into(),
        }
    }

    /// Build from parts. An empty `prefix` yields an unprefixed name.
    pub fn from_parts(prefix: &str, local: &str, uri: impl Into<String>) -> Self {
        if prefix.is_empty() {
            return Self::with_uri(local, uri);
        }
        let mut tag = String::with_capacity(prefix.len() + 1 + local.len());
        tag.push_str(prefix);
        tag.push(':');
        tag.push_str(local);
        Self {
            tag,
            prefix_len: prefix.len(),
            uri: uri.into(),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    pub fn local_name(&self) -> &str {
        if self.prefix_len == 0 {
            &self.tag
        } else {
            &self.tag[self.prefix_len + 1..]
        }
    }

    pub fn prefix(&self) -> &str {
        &self.tag[..self.prefix_len]
    }

    pub fn namespace_uri(&self) -> &str {
        &self.uri
    }

    /// Replace the tag name, keeping the namespace URI.
    pub(crate) fn rename(&mut self, tag: &str) {
        let uri = std::mem::take(&mut self.uri);
        *self = Self::with_uri(tag, uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_splits_prefix() {
        let q = QName::with_uri("svg:rect", "http://www.w3.org/2000/svg");
        assert_eq!(q.tag_name(), "svg:rect");
        assert_eq!(q.prefix(), "svg");
        assert_eq!(q.local_name(), "rect");
        assert_eq!(q.namespace_uri(), "http://www.w3.org/2000/svg");
    }

    #[test]
    fn qname_without_prefix() {
        let q = QName::new("div");
        assert_eq!(q.prefix(), "");
        assert_eq!(q.local_name(), "div");
        assert_eq!(q.namespace_uri(), "");
    }

    #[test]
    fn qname_from_parts_matches_parse() {
        let a = QName::from_parts("x", "item", "urn:x");
        let b = QName::with_uri("x:item", "urn:x");
        assert_eq!(a, b);
        assert_eq!(QName::from_parts("", "item", ""), QName::new("item"));
    }

    #[test]
    fn rename_keeps_uri() {
        let mut q = QName::with_uri("a:b", "urn:a");
        q.rename("c");
        assert_eq!(q.tag_name(), "c");
        assert_eq!(q.prefix(), "");
        assert_eq!(q.namespace_uri(), "urn:a");
    }

    #[test]
    fn document_accepts_narrower_set() {
        assert!(ItemKind::Document.permits_child(ItemKind::Element));
        assert!(ItemKind::Document.permits_child(ItemKind::Comment));
        assert!(!ItemKind::Document.permits_child(ItemKind::Text));
        assert!(!ItemKind::Element.permits_child(ItemKind::Document));
        assert!(!ItemKind::Text.permits_child(ItemKind::Text));
    }
}
