//! CLI regression tests for the `rampart` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes and output formats.
//!
//! Run with: `cargo test -p rampart-test`
//! Requires the `rampart` binary to be built first (`cargo build -p rampart`).

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

use crate::fixtures;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `rampart` binary.
fn rampart() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("rampart")
        .expect("rampart binary not found, run `cargo build -p rampart` first");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn library_manifest() -> std::path::PathBuf {
    fixtures().join("library/rampart.yaml")
}

// ---------------------------------------------------------------------------
// rampart compile
// ---------------------------------------------------------------------------

#[test]
fn compile_manifest_prints_yaml() {
    rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(library_manifest())
        .assert()
        .success()
        .stdout(contains("name: library.example.com"))
        .stdout(contains("selector: library.v1.Library.CreateShelf"));
}

#[test]
fn compile_json_output_is_valid_json() {
    let output = rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(library_manifest())
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(output).expect("stdout should be valid UTF-8");
    let v: serde_json::Value =
        serde_json::from_str(&s).expect("--format json output should be valid JSON");
    assert_eq!(v["name"], "library.example.com");
    assert_eq!(v["config_version"], 3);
    assert!(v["http"]["rules"].as_array().is_some_and(|r| r.len() == 7));
}

#[test]
fn compile_writes_output_file() {
    let temp = TempDir::new().expect("temp dir");
    let out = temp.path().join("normalized.yaml");

    rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(library_manifest())
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout("")
        .stderr(contains("config written to"));

    let written = std::fs::read_to_string(&out).expect("output file");
    let config = rampart_model::parse_service_config(&written, "normalized.yaml")
        .expect("output should parse as a service config");
    assert_eq!(config.endpoints.len(), 1);
}

#[test]
fn compile_explicit_model_and_configs() {
    let dir = fixtures().join("library");
    rampart()
        .arg("compile")
        .arg("--model")
        .arg(dir.join("model.yaml"))
        .arg("--config")
        .arg(dir.join("service.yaml"))
        .arg(dir.join("quota.yaml"))
        .assert()
        .success()
        .stdout(contains("metric_rules"));
}

#[test]
fn compile_path_syntax_error_exits_one() {
    rampart()
        .arg("compile")
        .arg("--model")
        .arg(fixtures().join("library/model.yaml"))
        .arg("--config")
        .arg(fixtures().join("invalid/bad-path.yaml"))
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(contains("error[E2010]"))
        .stderr(contains("bad-path.yaml:http.rules[0]"));
}

#[test]
fn compile_broken_model_exits_one() {
    rampart()
        .arg("compile")
        .arg("--model")
        .arg(fixtures().join("invalid/broken-model.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1002"));
}

#[test]
fn compile_missing_manifest_exits_two() {
    rampart()
        .args(["compile", "--manifest", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("failed to read"));
}

#[test]
fn compile_missing_model_file_exits_three() {
    rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(fixtures().join("invalid/missing-model.rampart.yaml"))
        .assert()
        .failure()
        .code(3);
}

#[test]
fn manifest_conflicts_with_model() {
    rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(library_manifest())
        .arg("--model")
        .arg(fixtures().join("library/model.yaml"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("cannot be used with"));
}

// ---------------------------------------------------------------------------
// rampart validate
// ---------------------------------------------------------------------------

#[test]
fn validate_lists_collections() {
    rampart()
        .arg("validate")
        .arg("--manifest")
        .arg(library_manifest())
        .assert()
        .success()
        .stdout(contains("valid: 2 collection(s), 0 warning(s)"))
        .stdout(contains("v1.shelves.books [get, list, move] -> library.v1.Book"));
}

#[test]
fn validate_reports_warnings_without_failing() {
    rampart()
        .arg("validate")
        .arg("--model")
        .arg(fixtures().join("library/model.yaml"))
        .arg("--config")
        .arg(fixtures().join("invalid/unmatched-selector.yaml"))
        .assert()
        .success()
        .stderr(contains("warning[http-unmatched-selector]"))
        .stderr(contains("library.v1.Library.BurnShelf"));
}

#[test]
fn validate_suppress_flag_silences_warning() {
    rampart()
        .arg("validate")
        .arg("--model")
        .arg(fixtures().join("library/model.yaml"))
        .arg("--config")
        .arg(fixtures().join("invalid/unmatched-selector.yaml"))
        .args(["--suppress", "http-unmatched-selector"])
        .assert()
        .success()
        .stderr(contains("http-unmatched-selector").not());
}

#[test]
fn validate_json_format_outputs_report() {
    let output = rampart()
        .arg("validate")
        .arg("--model")
        .arg(fixtures().join("library/model.yaml"))
        .arg("--config")
        .arg(fixtures().join("invalid/bad-path.yaml"))
        .args(["--format", "json"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(output).expect("stdout should be valid UTF-8");
    let v: serde_json::Value =
        serde_json::from_str(&s).expect("--format json output should be valid JSON");
    assert_eq!(v["valid"], false);
    assert_eq!(v["errors"], 1);
    assert_eq!(v["diagnostics"][0]["code"], "E2010");
    assert_eq!(v["diagnostics"][0]["severity"], "error");
    assert_eq!(v["sources"].as_array().map(Vec::len), Some(2));
}

#[test]
fn invalid_log_format_is_rejected() {
    rampart()
        .arg("validate")
        .arg("--manifest")
        .arg(library_manifest())
        .args(["--log-format", "xml"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown log format"));
}

#[test]
fn json_logs_go_to_stderr() {
    rampart()
        .arg("compile")
        .arg("--manifest")
        .arg(library_manifest())
        .args(["--log-level", "info", "--log-format", "json"])
        .assert()
        .success()
        .stderr(contains("\"event\":\"compile_started\""))
        .stdout(contains("compile_started").not());
}
