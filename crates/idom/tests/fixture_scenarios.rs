use idom_test_support::assert_outline_eq;
use idom_test_support::scenario::{Scenario, load_scenarios};
use pretty_assertions::assert_eq;
use std::env;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// `IDOM_SCENARIO=<substring>` restricts the run to matching fixture files.
fn fixture_filter() -> Option<String> {
    env::var("IDOM_SCENARIO").ok().filter(|raw| !raw.is_empty())
}

fn run_scenario(path: &Path, scenario: &Scenario) {
    let run = scenario
        .run()
        .unwrap_or_else(|err| panic!("scenario {path:?} failed: {err}"));
    let root = run.id(&scenario.root);
    assert_outline_eq(&run.tree, root, &scenario.outline);
    for query in &scenario.queries {
        let actual = run
            .query(query)
            .unwrap_or_else(|err| panic!("query {query:?} in {path:?} failed: {err}"));
        assert_eq!(
            actual, query.expect,
            "query '{}' with mode {:?} in {path:?}",
            query.name, query.mode
        );
    }
}

#[test]
fn fixture_scenarios() {
    let filter = fixture_filter();
    let mut ran = 0usize;
    for (path, scenario) in load_scenarios(&fixtures_dir()) {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if filter.as_deref().is_some_and(|f| !name.contains(f)) {
            continue;
        }
        ran += 1;
        run_scenario(&path, &scenario);
    }
    assert!(ran > 0, "no scenarios matched filter");
}

#[test]
fn failed_expectation_is_reported() {
    let scenario: Scenario = toml::from_str(
        r#"
        format = "idom-scenario-v1"
        root = "a"
        items = [
          { id = "a", kind = "element", name = "a" },
          { id = "b", kind = "element", name = "b" },
        ]
        steps = [
          { op = "append", group = "a", item = "b", expect_error = "cycle" },
        ]
        outline = ["<a>"]
        "#,
    )
    .expect("inline scenario parses");
    let err = scenario.run().err().expect("step should not meet its expectation");
    assert!(err.contains("succeeded, expected cycle"), "{err}");
}
