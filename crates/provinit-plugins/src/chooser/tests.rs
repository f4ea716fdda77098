//! Unit tests for plugin selection.

use std::path::PathBuf;

use rstest::{fixture, rstest};

use super::*;
use crate::tests::{requirements, version};

fn plugin(name: &str, v: &str, protocol: u32, path: &str) -> InstalledPlugin {
    InstalledPlugin::new(name, version(v), protocol, PathBuf::from(path))
}

#[fixture]
fn inventory() -> PluginSet {
    PluginSet::new(vec![
        plugin("aws", "1.2.0", 4, "/plugins/aws-1.2.0"),
        plugin("aws", "1.0.0", 4, "/plugins/aws-1.0.0"),
        plugin("aws", "2.1.0", 4, "/plugins/aws-2.1.0"),
        plugin("aws", "1.9.0", 5, "/plugins/aws-1.9.0"),
        plugin("google", "2.3.0", 4, "/z/google"),
        plugin("google", "2.3.0", 4, "/a/google"),
    ])
}

#[rstest]
fn selects_highest_satisfying_version(inventory: PluginSet) {
    let chosen = choose(&requirements(&[("aws", ">=1.0,<2.0")]), &inventory, 4).expect("choose");
    let aws = chosen.get("aws").expect("aws chosen");
    assert_eq!(aws.version(), &version("1.2.0"));
}

#[rstest]
fn ignores_other_protocol_versions(inventory: PluginSet) {
    let chosen = choose(&requirements(&[("aws", "~> 1.5")]), &inventory, 4);
    assert!(matches!(chosen, Err(InitError::Unsatisfiable { .. })));
}

#[rstest]
fn equal_versions_resolve_to_smallest_path(inventory: PluginSet) {
    let chosen = choose(&requirements(&[("google", "")]), &inventory, 4).expect("choose");
    assert_eq!(
        chosen.get("google").expect("google chosen").path(),
        PathBuf::from("/a/google")
    );
}

#[rstest]
fn repeated_runs_are_identical(inventory: PluginSet) {
    let required = requirements(&[("aws", ""), ("google", ">= 2")]);
    let first = choose(&required, &inventory, 4).expect("first run");
    let second = choose(&required, &inventory, 4).expect("second run");
    assert_eq!(first, second);
}

#[rstest]
fn unsatisfiable_requirement_reports_constraints(inventory: PluginSet) {
    let err = choose(&requirements(&[("aws", ">= 3.0")]), &inventory, 4)
        .expect_err("should fail");
    match err {
        InitError::Unsatisfiable { name, constraints } => {
            assert_eq!(name, "aws");
            assert_eq!(constraints.to_string(), ">= 3.0.0");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_provider_is_never_dropped() {
    let err = choose(&requirements(&[("null", "")]), &PluginSet::default(), 4)
        .expect_err("should fail");
    assert!(err.to_string().contains("'null'"));
}
