//! Declarative tree-editing scenarios stored as TOML fixtures.
//!
//! A scenario declares named items, applies a list of edits to them, and then
//! states the expected outline and query results. Each edit may name the
//! error it is expected to fail with; the tree must then be unchanged.

use idom::{FindMode, NodeId, Tree, TreeConfig, TreeError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SCENARIO_FORMAT_V1: &str = "idom-scenario-v1";

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub format: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unindexed: bool,
    pub root: String,
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub outline: Vec<String>,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ItemSpec {
    pub id: String,
    pub kind: ItemKindSpec,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKindSpec {
    Document,
    Element,
    Text,
    Cdata,
    Comment,
    EntityReference,
    Binary,
    ProcessingInstruction,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Append { group: String, item: String },
    InsertBefore { group: String, item: String, before: String },
    InsertAt { group: String, index: usize, item: String },
    Replace { group: String, old: String, new: String },
    Remove { group: String, item: String },
    Detach { item: String },
    Coalesce {
        group: String,
        #[serde(default)]
        recursive: bool,
    },
    Rename { item: String, name: String },
    Clone { item: String, id: String },
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuerySpec {
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub mode: Vec<String>,
    pub expect: Vec<String>,
}

/// Tree built by a scenario, with its declared names resolved.
pub struct ScenarioRun {
    pub tree: Tree,
    pub ids: BTreeMap<String, NodeId>,
}

impl ScenarioRun {
    pub fn id(&self, name: &str) -> NodeId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("scenario refers to undeclared item '{name}'"))
    }

    fn name_of(&self, id: NodeId) -> String {
        self.ids
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Run a query and report the result by declared item names.
    pub fn query(&self, spec: &QuerySpec) -> Result<Vec<String>, TreeError> {
        let group = self.id(&spec.group);
        let mode = parse_mode(&spec.mode);
        let found = self
            .tree
            .find_elements(group, spec.namespace.as_deref(), &spec.name, mode)?;
        let first = self
            .tree
            .find_element(group, spec.namespace.as_deref(), &spec.name, mode)?;
        assert_eq!(
            first,
            found.first().copied(),
            "find_element and find_elements disagree on the first match for '{}'",
            spec.name
        );
        Ok(found.into_iter().map(|id| self.name_of(id)).collect())
    }
}

pub fn parse_mode(flags: &[String]) -> FindMode {
    let mut mode = FindMode::EXACT;
    for flag in flags {
        mode |= match flag.as_str() {
            "regex" => FindMode::REGEX,
            "ignore-case" => FindMode::IGNORE_CASE,
            "by-tag-name" => FindMode::BY_TAG_NAME,
            "by-prefix" => FindMode::BY_PREFIX,
            "recursive" => FindMode::RECURSIVE,
            other => panic!("unknown find mode flag '{other}'"),
        };
    }
    mode
}

/// Stable short name of an error variant, as used by `expect_error`.
pub fn error_code(err: &TreeError) -> &'static str {
    match err {
        TreeError::InvalidKind { .. } => "invalid-kind",
        TreeError::AlreadyOwned { .. } => "already-owned",
        TreeError::Cycle { .. } => "cycle",
        TreeError::NotFound { .. } => "not-found",
        TreeError::IndexOutOfBounds { .. } => "index-out-of-bounds",
        TreeError::NotAGroup(_) => "not-a-group",
        TreeError::UnknownNode(_) => "unknown-node",
        TreeError::NotSupported { .. } => "not-supported",
        TreeError::InvalidPattern { .. } => "invalid-pattern",
    }
}

impl Scenario {
    pub fn run(&self) -> Result<ScenarioRun, String> {
        let config = if self.unindexed {
            TreeConfig::unindexed()
        } else {
            TreeConfig::default()
        };
        let mut run = ScenarioRun {
            tree: Tree::with_config(config),
            ids: BTreeMap::new(),
        };
        for item in &self.items {
            let id = create_item(&mut run.tree, item);
            if run.ids.insert(item.id.clone(), id).is_some() {
                return Err(format!("item '{}' declared twice", item.id));
            }
        }
        let root = run.id(&self.root);
        for (n, step) in self.steps.iter().enumerate() {
            let before = idom::debug::outline(&run.tree, root, usize::MAX);
            let result = apply(&mut run, &step.action);
            match (result, &step.expect_error) {
                (Ok(()), None) => {}
                (Err(err), Some(code)) if error_code(&err) == code.as_str() => {
                    let after = idom::debug::outline(&run.tree, root, usize::MAX);
                    if before != after {
                        return Err(format!(
                            "step {n} failed with {code} but changed the tree\n{}",
                            crate::diff_outlines(&before, &after)
                        ));
                    }
                }
                (Ok(()), Some(code)) => {
                    return Err(format!("step {n} succeeded, expected {code}"));
                }
                (Err(err), _) => return Err(format!("step {n} failed: {err}")),
            }
            run.tree
                .check_invariants(root)
                .map_err(|violation| format!("step {n}: {violation}"))?;
        }
        Ok(run)
    }
}

fn create_item(tree: &mut Tree, item: &ItemSpec) -> NodeId {
    match item.kind {
        ItemKindSpec::Document => tree.create_document(),
        ItemKindSpec::Element if item.namespace.is_empty() => tree.create_element(&item.name),
        ItemKindSpec::Element => tree.create_element_ns(&item.name, &item.namespace),
        ItemKindSpec::Text => tree.create_text(&item.text),
        ItemKindSpec::Cdata => tree.create_cdata(&item.text),
        ItemKindSpec::Comment => tree.create_comment(&item.text),
        ItemKindSpec::EntityReference => tree.create_entity_reference(&item.name),
        ItemKindSpec::Binary => tree.create_binary(item.text.as_bytes().to_vec()),
        ItemKindSpec::ProcessingInstruction => {
            tree.create_processing_instruction(&item.name, &item.text)
        }
    }
}

fn apply(run: &mut ScenarioRun, action: &Action) -> Result<(), TreeError> {
    match action {
        Action::Append { group, item } => {
            let (group, item) = (run.id(group), run.id(item));
            run.tree.append_child(group, item)
        }
        Action::InsertBefore {
            group,
            item,
            before,
        } => {
            let (group, item, before) = (run.id(group), run.id(item), run.id(before));
            run.tree.insert_before(group, item, before)
        }
        Action::InsertAt { group, index, item } => {
            let (group, item) = (run.id(group), run.id(item));
            run.tree.insert_at(group, *index, item)
        }
        Action::Replace { group, old, new } => {
            let (group, old, new) = (run.id(group), run.id(old), run.id(new));
            run.tree.replace_child(group, old, new).map(drop)
        }
        Action::Remove { group, item } => {
            let (group, item) = (run.id(group), run.id(item));
            run.tree.remove_child(group, item)
        }
        Action::Detach { item } => {
            let item = run.id(item);
            run.tree.detach(item).map(drop)
        }
        Action::Coalesce { group, recursive } => {
            let group = run.id(group);
            run.tree.coalesce(group, *recursive).map(drop)
        }
        Action::Rename { item, name } => {
            let item = run.id(item);
            run.tree.set_name(item, name)
        }
        Action::Clone { item, id } => {
            let item = run.id(item);
            let copy = run.tree.clone_deep(item)?;
            run.ids.insert(id.clone(), copy);
            Ok(())
        }
    }
}

/// Load every `*.toml` scenario under `dir`, sorted by file name.
pub fn load_scenarios(dir: &Path) -> Vec<(PathBuf, Scenario)> {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to read scenario dir {dir:?}: {err}"));
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)
                .unwrap_or_else(|err| panic!("failed to read scenario {path:?}: {err}"));
            let scenario: Scenario = toml::from_str(&content)
                .unwrap_or_else(|err| panic!("failed to parse scenario {path:?}: {err}"));
            assert_eq!(
                scenario.format, SCENARIO_FORMAT_V1,
                "unsupported scenario format in {path:?}"
            );
            (path, scenario)
        })
        .collect()
}
