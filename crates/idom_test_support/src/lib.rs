use idom::{NodeId, Tree};

pub mod scenario;

const INDENT: &str = "  ";

/// One rendered item of an outline: its nesting depth and its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OutlineItem<'a> {
    depth: usize,
    label: &'a str,
}

fn parse_outline(lines: &[String]) -> Vec<OutlineItem<'_>> {
    lines
        .iter()
        .map(|line| {
            let mut rest = line.as_str();
            let mut depth = 0;
            while let Some(stripped) = rest.strip_prefix(INDENT) {
                rest = stripped;
                depth += 1;
            }
            OutlineItem { depth, label: rest }
        })
        .collect()
}

/// Labels of the enclosing groups of `items[at]`, outermost first.
fn ancestry<'a>(items: &[OutlineItem<'a>], at: usize) -> Vec<&'a str> {
    let mut path = Vec::new();
    let mut depth = items[at].depth;
    for item in items[..at].iter().rev() {
        if item.depth < depth {
            path.push(item.label);
            depth = item.depth;
        }
    }
    path.reverse();
    path
}

fn describe(item: Option<&OutlineItem<'_>>) -> String {
    match item {
        Some(item) => format!("{} (depth {})", item.label, item.depth),
        None => "<no item>".to_string(),
    }
}

/// Explain how two outlines differ, by item rather than by raw line.
///
/// Reports the first diverging item, where it sits in the tree, and how many
/// items each side has past the shared prefix. Empty when equal.
pub fn diff_outlines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;

    let left = parse_outline(expected);
    let right = parse_outline(actual);
    let Some(at) = (0..left.len().max(right.len())).find(|&i| left.get(i) != right.get(i)) else {
        return String::new();
    };

    let mut out = String::new();
    let context = if at < left.len() { &left } else { &right };
    let path = ancestry(context, at);
    let location = if path.is_empty() {
        "at the top level".to_string()
    } else {
        format!("under {}", path.join(" > "))
    };
    let _ = writeln!(&mut out, "item #{} differs {location}", at + 1);
    let _ = writeln!(&mut out, "  expected: {}", describe(left.get(at)));
    let _ = writeln!(&mut out, "    actual: {}", describe(right.get(at)));
    let _ = writeln!(
        &mut out,
        "{} items agree; {} more expected, {} more actual",
        at,
        left.len() - at,
        right.len() - at
    );
    out
}

/// Panic with an item diff unless the outline of `root` equals `expected`.
pub fn assert_outline_eq(tree: &Tree, root: NodeId, expected: &[String]) {
    let actual = idom::debug::outline(tree, root, usize::MAX);
    if actual != expected {
        panic!(
            "outline mismatch under {root}\n{}",
            diff_outlines(expected, &actual)
        );
    }
}

/// Panic with the indexed and scanned orders unless every bucket of `group`
/// holds the same elements as a linear scan for that name.
pub fn assert_index_membership(tree: &Tree, group: NodeId) {
    let Some(index) = tree.name_index(group).unwrap_or_else(|err| panic!("{err}")) else {
        return;
    };
    let scanned = tree
        .child_elements(group)
        .unwrap_or_else(|err| panic!("{err}"));
    for name in index.names() {
        let mut bucket = index.get_all(name).to_vec();
        let mut by_scan: Vec<NodeId> = scanned
            .iter()
            .copied()
            .filter(|id| tree.name(*id).is_ok_and(|n| n == name))
            .collect();
        bucket.sort();
        by_scan.sort();
        assert_eq!(bucket, by_scan, "bucket '{name}' of {group} diverged from scan");
    }
    assert_eq!(
        index.len(),
        scanned.len(),
        "index of {group} does not cover every element child"
    );
}
