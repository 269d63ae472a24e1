//! Element search over a group's children.
//!
//! Two paths exist:
//! - fast: an exact tag-name lookup (`FindMode::BY_TAG_NAME` alone, no
//!   namespace) on an indexed group is answered from its name index;
//! - general: a linear scan over the children, covering regex, case-folding,
//!   local-name, namespace and recursive queries.
//!
//! Recursive queries first search a group's own children, then each child
//! group in child order. Both the single and the multi-result forms walk an
//! explicit stack, so deep trees do not grow the call stack.

use crate::error::TreeError;
use crate::name_index::NameIndex;
use crate::tree::{GroupData, NodeData, Tree};
use crate::types::{NodeId, QName};
use indexmap::IndexSet;
use regex::Regex;
use std::ops::{BitOr, BitOrAssign};

/// Search mode bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FindMode(u16);

impl FindMode {
    /// Exact, case-sensitive local-name match on direct children.
    pub const EXACT: FindMode = FindMode(0);
    /// The name argument is a regular expression that must match the whole name.
    pub const REGEX: FindMode = FindMode(0x0001);
    /// Case-insensitive comparison. Ignored together with `REGEX`.
    pub const IGNORE_CASE: FindMode = FindMode(0x0002);
    /// Compare against the tag name (`prefix:local`) instead of the local name.
    pub const BY_TAG_NAME: FindMode = FindMode(0x0004);
    /// The namespace argument is a prefix rather than a URI.
    pub const BY_PREFIX: FindMode = FindMode(0x0008);
    /// Also search descendant groups.
    pub const RECURSIVE: FindMode = FindMode(0x0100);

    const ALL: u16 = 0x0001 | 0x0002 | 0x0004 | 0x0008 | 0x0100;

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u16) -> Self {
        FindMode(bits & Self::ALL)
    }

    pub const fn contains(self, other: FindMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: FindMode) -> Self {
        FindMode(self.0 | other.0)
    }
}

impl BitOr for FindMode {
    type Output = FindMode;

    fn bitor(self, rhs: FindMode) -> FindMode {
        self.union(rhs)
    }
}

impl BitOrAssign for FindMode {
    fn bitor_assign(&mut self, rhs: FindMode) {
        *self = self.union(rhs);
    }
}

/// A compiled `(namespace, name, mode)` query.
struct NameMatcher<'q> {
    namespace: Option<&'q str>,
    name: &'q str,
    pattern: Option<Regex>,
    mode: FindMode,
}

impl<'q> NameMatcher<'q> {
    fn compile(namespace: Option<&'q str>, name: &'q str, mode: FindMode) -> Result<Self, TreeError> {
        let pattern = if mode.contains(FindMode::REGEX) {
            let invalid = |err: regex::Error| TreeError::InvalidPattern {
                pattern: name.to_string(),
                message: err.to_string(),
            };
            // The bare pattern must parse on its own before it is anchored,
            // or an unbalanced `)` would escape the wrapping group.
            Regex::new(name).map_err(invalid)?;
            Some(Regex::new(&format!("^(?:{name})$")).map_err(invalid)?)
        } else {
            None
        };
        Ok(Self {
            namespace,
            name,
            pattern,
            mode,
        })
    }

    fn recursive(&self) -> bool {
        self.mode.contains(FindMode::RECURSIVE)
    }

    fn matches(&self, qname: &QName) -> bool {
        if let Some(namespace) = self.namespace {
            let candidate = if self.mode.contains(FindMode::BY_PREFIX) {
                qname.prefix()
            } else {
                qname.namespace_uri()
            };
            if candidate != namespace {
                return false;
            }
        }
        let candidate = if self.mode.contains(FindMode::BY_TAG_NAME) {
            qname.tag_name()
        } else {
            qname.local_name()
        };
        match &self.pattern {
            Some(re) => re.is_match(candidate),
            None if self.mode.contains(FindMode::IGNORE_CASE) => {
                eq_ignore_case(candidate, self.name)
            }
            None => candidate == self.name,
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// The name index answers the query iff it is a plain tag-name lookup.
fn fast_path<'g>(group: &'g GroupData, namespace: Option<&str>, mode: FindMode) -> Option<&'g NameIndex> {
    if namespace.is_some() || mode != FindMode::BY_TAG_NAME {
        return None;
    }
    group.index.as_ref()
}

impl Tree {
    /// Index of the first element child at or after `from` that matches.
    pub fn find_child_index(
        &self,
        group: NodeId,
        from: usize,
        namespace: Option<&str>,
        name: &str,
        mode: FindMode,
    ) -> Result<Option<usize>, TreeError> {
        let matcher = NameMatcher::compile(namespace, name, mode)?;
        self.scan_index(group, from, &matcher)
    }

    fn scan_index(
        &self,
        group: NodeId,
        from: usize,
        matcher: &NameMatcher<'_>,
    ) -> Result<Option<usize>, TreeError> {
        let children = &self.group(group)?.children;
        if from >= children.len() {
            return Ok(None);
        }
        for (offset, child) in children[from..].iter().enumerate() {
            if self.element_matches(*child, matcher)? {
                return Ok(Some(from + offset));
            }
        }
        Ok(None)
    }

    fn element_matches(&self, id: NodeId, matcher: &NameMatcher<'_>) -> Result<bool, TreeError> {
        Ok(match &self.record(id)?.data {
            NodeData::Element { name, .. } => matcher.matches(name),
            _ => false,
        })
    }

    /// First matching element; see the module docs for search order.
    pub fn find_element(
        &self,
        group: NodeId,
        namespace: Option<&str>,
        name: &str,
        mode: FindMode,
    ) -> Result<Option<NodeId>, TreeError> {
        if let Some(index) = fast_path(self.group(group)?, namespace, mode) {
            log::trace!(target: "idom.query", "index lookup '{name}' in {group}");
            return Ok(index.get(name));
        }
        log::trace!(target: "idom.query", "scan for '{name}' in {group} ({mode:?})");
        let matcher = NameMatcher::compile(namespace, name, mode)?;
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            if let Some(pos) = self.scan_index(current, 0, &matcher)? {
                return Ok(Some(self.group(current)?.children[pos]));
            }
            if !matcher.recursive() {
                break;
            }
            self.push_child_groups(current, &mut stack)?;
        }
        Ok(None)
    }

    /// All matching elements: direct matches in document order, then the
    /// matches of each child group in child order.
    ///
    /// The fast path returns the name bucket, whose order may differ from
    /// document order after anchored insertions.
    pub fn find_elements(
        &self,
        group: NodeId,
        namespace: Option<&str>,
        name: &str,
        mode: FindMode,
    ) -> Result<Vec<NodeId>, TreeError> {
        if let Some(index) = fast_path(self.group(group)?, namespace, mode) {
            log::trace!(target: "idom.query", "index lookup all '{name}' in {group}");
            return Ok(index.get_all(name).to_vec());
        }
        log::trace!(target: "idom.query", "scan all '{name}' in {group} ({mode:?})");
        let matcher = NameMatcher::compile(namespace, name, mode)?;
        let mut found = Vec::new();
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            for child in &self.group(current)?.children {
                if self.element_matches(*child, &matcher)? {
                    found.push(*child);
                }
            }
            if !matcher.recursive() {
                break;
            }
            self.push_child_groups(current, &mut stack)?;
        }
        Ok(found)
    }

    /// Push child groups of `group` so that the first child is popped first.
    fn push_child_groups(&self, group: NodeId, stack: &mut Vec<NodeId>) -> Result<(), TreeError> {
        for child in self.group(group)?.children.iter().rev() {
            if self.record(*child)?.data.group().is_some() {
                stack.push(*child);
            }
        }
        Ok(())
    }

    /// First direct child element with tag name `tag`.
    pub fn element(&self, group: NodeId, tag: &str) -> Result<Option<NodeId>, TreeError> {
        self.find_element(group, None, tag, FindMode::BY_TAG_NAME)
    }

    /// All direct child elements with tag name `tag`.
    pub fn elements(&self, group: NodeId, tag: &str) -> Result<Vec<NodeId>, TreeError> {
        self.find_elements(group, None, tag, FindMode::BY_TAG_NAME)
    }

    pub fn element_index(
        &self,
        group: NodeId,
        from: usize,
        tag: &str,
    ) -> Result<Option<usize>, TreeError> {
        self.find_child_index(group, from, None, tag, FindMode::BY_TAG_NAME)
    }

    /// Text of the first matching element, optionally trimmed.
    pub fn element_value(
        &self,
        group: NodeId,
        namespace: Option<&str>,
        name: &str,
        mode: FindMode,
        trim: bool,
    ) -> Result<Option<String>, TreeError> {
        let Some(element) = self.find_element(group, namespace, name, mode)? else {
            return Ok(None);
        };
        let text = self.text(element)?.unwrap_or_default();
        Ok(Some(if trim {
            text.trim().to_string()
        } else {
            text.into_owned()
        }))
    }

    pub fn any_element(&self, group: NodeId) -> Result<bool, TreeError> {
        let data = self.group(group)?;
        if let Some(index) = &data.index {
            return Ok(index.any());
        }
        for child in &data.children {
            if self.record(*child)?.data.element_tag().is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Distinct tag names of the element children.
    ///
    /// Indexed groups report bucket-creation order; others report
    /// first-occurrence document order.
    pub fn element_names(&self, group: NodeId) -> Result<Vec<&str>, TreeError> {
        let data = self.group(group)?;
        if let Some(index) = &data.index {
            return Ok(index.names().collect());
        }
        let mut names = IndexSet::new();
        for child in &data.children {
            if let Some(tag) = self.record(*child)?.data.element_tag() {
                names.insert(tag);
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Every element child in document order.
    pub fn child_elements(&self, group: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut out = Vec::new();
        for child in &self.group(group)?.children {
            if self.record(*child)?.data.element_tag().is_some() {
                out.push(*child);
            }
        }
        Ok(out)
    }
}
