//! Human-readable outlines of a subtree, for tests and diagnostics.

use crate::tree::{NodeData, Tree};
use crate::types::NodeId;

const INDENT_STEP: &str = "  ";

/// One line per item under `root`, indented by depth, at most `cap` lines.
///
/// Whitespace-only text is skipped. Text previews are trimmed, have newlines
/// flattened, and are cut at `outline_preview_chars` from the tree config.
/// Handles that no longer resolve are rendered as `#dangling`.
pub fn outline(tree: &Tree, root: NodeId, cap: usize) -> Vec<String> {
    let max_chars = tree.config().outline_preview_chars;
    let mut out = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        if out.len() == cap {
            break;
        }
        let mut line = INDENT_STEP.repeat(depth);
        let Ok(record) = tree.record(id) else {
            line.push_str("#dangling ");
            line.push_str(&id.to_string());
            out.push(line);
            continue;
        };
        match &record.data {
            NodeData::Document(_) => line.push_str("#document"),
            NodeData::Element { name, .. } => {
                line.push('<');
                line.push_str(name.tag_name());
                if !name.namespace_uri().is_empty() {
                    line.push_str(r#" xmlns=""#);
                    line.push_str(name.namespace_uri());
                    line.push('"');
                }
                line.push('>');
            }
            NodeData::Text(text) => {
                let Some(trimmed) = trimmed_nonempty(text) else {
                    continue;
                };
                line.push('"');
                push_preview(&mut line, trimmed, max_chars);
                line.push('"');
            }
            NodeData::CData(text) => {
                line.push_str("<![CDATA[");
                push_preview(&mut line, text, max_chars);
                line.push_str("]]>");
            }
            NodeData::Comment(text) => {
                line.push_str("<!-- ");
                push_preview(&mut line, text, max_chars);
                line.push_str(" -->");
            }
            NodeData::EntityReference(name) => {
                line.push('&');
                line.push_str(name);
                line.push(';');
            }
            NodeData::Binary(bytes) => {
                line.push_str(&format!("#binary[{} bytes]", bytes.len()));
            }
            NodeData::ProcessingInstruction { target, data } => {
                line.push_str("<?");
                line.push_str(target);
                if !data.is_empty() {
                    line.push(' ');
                    push_preview(&mut line, data, max_chars);
                }
                line.push_str("?>");
            }
        }
        out.push(line);
        if let Some(group) = record.data.group() {
            for child in group.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
    }
    out
}

fn trimmed_nonempty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn push_preview(out: &mut String, s: &str, max_chars: usize) {
    let mut chars = s.chars();
    for ch in chars.by_ref().take(max_chars) {
        out.push(if ch == '\n' { ' ' } else { ch });
    }
    if chars.next().is_some() {
        out.push('…');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeConfig;

    #[test]
    fn outline_indents_by_depth() {
        let mut tree = Tree::new();
        let doc = tree.create_document();
        let html = tree.create_element_ns("svg:svg", "http://www.w3.org/2000/svg");
        let comment = tree.create_comment("note");
        let body = tree.create_element("body");
        let blank = tree.create_text("  \n ");
        let text = tree.create_text("  hello\nworld ");
        let amp = tree.create_entity_reference("amp");
        tree.append_child(doc, comment).unwrap();
        tree.append_child(doc, html).unwrap();
        tree.append_child(html, body).unwrap();
        for id in [blank, text, amp] {
            tree.append_child(body, id).unwrap();
        }

        assert_eq!(
            outline(&tree, doc, usize::MAX),
            vec![
                "#document".to_string(),
                "  <!-- note -->".to_string(),
                r#"  <svg:svg xmlns="http://www.w3.org/2000/svg">"#.to_string(),
                "    <body>".to_string(),
                r#"      "hello world""#.to_string(),
                "      &amp;".to_string(),
            ]
        );
    }

    #[test]
    fn outline_respects_cap_and_preview_length() {
        let mut tree = Tree::with_config(TreeConfig {
            outline_preview_chars: 3,
            ..TreeConfig::default()
        });
        let root = tree.create_element("root");
        let text = tree.create_text("abcdef");
        let pi = tree.create_processing_instruction("go", "xy");
        tree.append_child(root, text).unwrap();
        tree.append_child(root, pi).unwrap();

        assert_eq!(
            outline(&tree, root, 10),
            vec!["<root>", r#"  "abc…""#, "  <?go xy?>"]
        );
        assert_eq!(outline(&tree, root, 1), vec!["<root>"]);
    }
}
