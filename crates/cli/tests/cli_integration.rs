//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `rfkit` binary inside a temporary project
//! directory and verify exit codes, stdout and stderr.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SUITE: &str = "\
*** Settings ***
Resource    common.resource
Resource    ${ROOT}/missing.resource
Library     Collections

*** Variables ***
${HOST}    localhost

*** Test Cases ***
Login
    ${user}=    Set Variable    alice
    Log    ${user}
    Wait 3 Seconds

*** Keywords ***
Log
    No Operation
";

const COMMON: &str = "\
*** Keywords ***
Wait ${n} Seconds
    Sleep    ${n}
";

/// A temporary project holding the sample suite.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "suite.robot", SUITE);
    write(dir.path(), "common.resource", COMMON);
    write(
        dir.path(),
        "rfkit.toml",
        "global_variables = [\"${BROWSER}\"]\n\n[[libraries]]\nname = \"Collections\"\nkeywords = [{ name = \"Append To List\", args = [\"list_\", \"*values\"] }]\n",
    );
    dir
}

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

/// Helper: create a Command for the `rfkit` binary, rooted at `dir`.
fn rfkit(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("rfkit");
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    let dir = project();
    rfkit(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("roundtrip"))
        .stdout(predicate::str::contains("keywords"));
}

#[test]
fn version_exits_0() {
    let dir = project();
    rfkit(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rfkit"));
}

// ──────────────────────────────────────────────
// 2. parse / roundtrip
// ──────────────────────────────────────────────

#[test]
fn parse_prints_a_summary() {
    let dir = project();
    rfkit(&dir)
        .args(["parse", "suite.robot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 imports"))
        .stdout(predicate::str::contains("anomalies:  none"));
}

#[test]
fn parse_json_lists_units() {
    let dir = project();
    let output = rfkit(&dir)
        .args(["parse", "suite.robot", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["test_cases"], serde_json::json!(["Login"]));
    assert_eq!(summary["keywords"], serde_json::json!(["Log"]));
}

#[test]
fn parse_missing_file_fails() {
    let dir = project();
    rfkit(&dir)
        .args(["parse", "nope.robot"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn roundtrip_of_untouched_file_is_identical() {
    let dir = project();
    write(dir.path(), "crlf.robot", &SUITE.replace('\n', "\r\n"));
    for file in ["suite.robot", "crlf.robot"] {
        rfkit(&dir)
            .args(["roundtrip", file])
            .assert()
            .success()
            .stdout(predicate::str::contains("identical"));
    }
}

// ──────────────────────────────────────────────
// 3. imports / keywords / find
// ──────────────────────────────────────────────

#[test]
fn imports_reports_unresolved_parameterized_paths() {
    let dir = project();
    rfkit(&dir)
        .args(["imports", "suite.robot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unresolved: parameterized path (${ROOT})"))
        .stdout(predicate::str::contains("library Collections"))
        .stdout(predicate::str::contains("3 imports, 1 unresolved"));
}

#[test]
fn keywords_are_grouped_by_scope() {
    let dir = project();
    rfkit(&dir)
        .args(["keywords", "suite.robot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Local (1)"))
        .stdout(predicate::str::contains("Wait ${n} Seconds  common.resource:2"))
        .stdout(predicate::str::contains("Append To List  Collections [list_, *values]"));
}

#[test]
fn find_prefers_the_local_definition() {
    let dir = project();
    rfkit(&dir)
        .args(["find", "suite.robot", "log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("log -> Log  suite.robot:16 (Local)"))
        .stdout(predicate::str::contains("also: Log  BuiltIn"));
}

#[test]
fn find_matches_embedded_arguments() {
    let dir = project();
    let output = rfkit(&dir)
        .args(["--output", "json", "find", "suite.robot", "Wait 3 Seconds"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["resolved"]["name"], "Wait ${n} Seconds");
    assert_eq!(report["resolved"]["scope"], "Resource");
}

#[test]
fn find_without_match_exits_1() {
    let dir = project();
    rfkit(&dir)
        .args(["find", "suite.robot", "Does Not Exist"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no accessible keyword matches"));
}

// ──────────────────────────────────────────────
// 4. variables / config
// ──────────────────────────────────────────────

#[test]
fn variables_at_a_line_include_locals() {
    let dir = project();
    rfkit(&dir)
        .args(["variables", "suite.robot", "--line", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("${user}  Local"))
        .stdout(predicate::str::contains("${HOST}  File"))
        .stdout(predicate::str::contains("${BROWSER}  Global"));
}

#[test]
fn variables_without_a_line_skip_locals() {
    let dir = project();
    rfkit(&dir)
        .args(["variables", "suite.robot", "--name", "${user}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not accessible"));
    rfkit(&dir)
        .args(["variables", "suite.robot", "--name", "%{HOME}"])
        .assert()
        .success();
}

#[test]
fn invalid_config_is_reported() {
    let dir = project();
    write(dir.path(), "bad.toml", "colour = true\n");
    rfkit(&dir)
        .args(["--config", "bad.toml", "parse", "suite.robot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn quiet_json_errors_are_silent() {
    let dir = project();
    rfkit(&dir)
        .args(["--quiet", "--output", "json", "parse", "nope.robot"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}
