//! CLI integration tests for the Vigil command-line interface.
//!
//! Every command runs against a temporary config directory so the user's
//! own configuration never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A vigil command isolated from the user's config and environment.
fn vigil(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vigil").unwrap();
    cmd.env("VIGIL_CONFIG_DIR", dir.path().join("user"))
        .env("VIGIL_PROJECT_DIR", dir.path())
        .env_remove("RUST_LOG");
    for key in vigil_config_env() {
        cmd.env_remove(key);
    }
    cmd
}

fn vigil_config_env() -> [&'static str; 7] {
    [
        "VIGIL_ENDPOINT",
        "VIGIL_NAMESPACE",
        "VIGIL_IDENTITY",
        "VIGIL_CLIENT_CERT",
        "VIGIL_CLIENT_KEY",
        "VIGIL_CONCURRENCY",
        "VIGIL_FEATURE_TIMEOUT_SECS",
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("conformance harness"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vigil"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let dir = TempDir::new().unwrap();
    vigil(&dir).arg("explode").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// List
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_list_features() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("signal/basic"))
        .stdout(predicate::str::contains("update/self"))
        .stdout(predicate::str::contains("data_converter/binary"));
}

#[test]
fn test_list_json() {
    let dir = TempDir::new().unwrap();
    let output = vigil(&dir).args(["--json", "list"]).output().unwrap();
    assert!(output.status.success());
    let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(names.len(), 6);
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_all_features() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("6 passed, 0 failed, 0 skipped"));
}

#[test]
fn test_run_without_updates_skips() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .args(["run", "--no-updates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 passed, 0 failed, 3 skipped"))
        .stdout(predicate::str::contains("server does not support updates"));
}

#[test]
fn test_run_filtered_json() {
    let dir = TempDir::new().unwrap();
    let output = vigil(&dir)
        .args(["--json", "run", "--filter", "signal/"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = summary["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r["status"] == "passed"));
}

#[test]
fn test_run_unmatched_filter_fails() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .args(["run", "--filter", "no-such-feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No features match"));
}

#[test]
fn test_run_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("vigil.toml"), "[harness]\nconcurrency = 0\n").unwrap();
    vigil(&dir).arg("run").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_reflects_project_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("vigil.toml"),
        "[client]\nnamespace = \"conformance\"\n",
    )
    .unwrap();
    vigil(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conformance"))
        .stdout(predicate::str::contains("task_queue_prefix"));
}

#[test]
fn test_config_env_override() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .env("VIGIL_NAMESPACE", "from-env")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"))
        .stdout(predicate::str::contains("VIGIL_NAMESPACE"));
}

#[test]
fn test_config_init_local() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .args(["config", "init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(dir.path().join("vigil.toml").exists());

    vigil(&dir)
        .args(["config", "init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    vigil(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
