//! Integration tests for the `rig` binary entry point.
//!
//! Verifies help output, usage failures and the behaviour when the container
//! runtime client cannot be launched.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use tempfile::TempDir;

#[test]
fn help_lists_workload_groups() {
    let mut command = cargo_bin_cmd!("rig");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("chains").and(contains("services")));
}

#[test]
fn unknown_verb_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("rig");
    command.args(["chains", "launch"]);
    command.assert().code(2).stderr(contains("launch"));
}

#[test]
fn known_on_empty_tree_prints_nothing() {
    let root = TempDir::new().expect("temp dir");
    let mut command = cargo_bin_cmd!("rig");
    command
        .env_remove("RIG_CONFIG_PATH")
        .arg("--root-dir")
        .arg(root.path())
        .args(["chains", "known"]);
    command.assert().success().stdout(is_empty());
}

#[test]
fn missing_runtime_client_fails() {
    let root = TempDir::new().expect("temp dir");
    let mut command = cargo_bin_cmd!("rig");
    command
        .env_remove("RIG_CONFIG_PATH")
        .arg("--root-dir")
        .arg(root.path())
        .args(["--docker-binary", "/nonexistent/rig-docker", "chains", "ps"]);
    command
        .assert()
        .failure()
        .stderr(contains("container runtime unavailable"));
}
