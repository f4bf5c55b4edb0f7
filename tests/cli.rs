//! Subcommand tests driving the compiled binary end to end.

use std::process::{Command, Output};
use tempfile::TempDir;

/// Execute the workspace-synth CLI and return the output
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_workspace-synth"))
        .args(args)
        .output()
        .expect("run workspace-synth")
}

/// Verify CLI command succeeded
fn assert_cli_success(output: &Output, command_desc: &str) {
    if !output.status.success() {
        panic!(
            "{} failed!\nExit code: {:?}\nStdout: {}\nStderr: {}",
            command_desc,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_generate_stats_validate_cycle() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("cli.db");
    let db_arg = db.to_str().expect("utf8 path");

    let generate = run_cli(&[
        "generate",
        "--db",
        db_arg,
        "--seed",
        "9",
        "--users",
        "12",
        "--channels",
        "3",
        "--im-channels",
        "2",
        "--mpim-channels",
        "1",
        "--messages",
        "50",
        "--files",
        "5",
    ]);
    assert_cli_success(&generate, "generate");
    let summary: serde_json::Value =
        serde_json::from_slice(&generate.stdout).expect("summary json");
    assert_eq!(summary["users"], serde_json::json!(12));
    assert_eq!(summary["messages"], serde_json::json!(50));
    let workspace_id = summary["workspace_id"].as_str().expect("workspace id");

    let stats = run_cli(&["stats", "--db", db_arg, "--workspace-id", workspace_id]);
    assert_cli_success(&stats, "stats");
    let rendered: serde_json::Value = serde_json::from_slice(&stats.stdout).expect("stats json");
    assert_eq!(rendered["counts"]["messages"], serde_json::json!(50));
    assert_eq!(rendered["workspace"]["id"], serde_json::json!(workspace_id));

    let validate = run_cli(&["validate", "--db", db_arg]);
    assert_cli_success(&validate, "validate");
    let report: serde_json::Value =
        serde_json::from_slice(&validate.stdout).expect("report json");
    assert_eq!(report["ok"], serde_json::json!(true));
}

#[test]
fn test_export_import_cycle() {
    let dir = TempDir::new().expect("tempdir");
    let source_db = dir.path().join("source.db");
    let target_db = dir.path().join("target.db");
    let exports = dir.path().join("exports");

    let generate = run_cli(&[
        "generate",
        "--db",
        source_db.to_str().expect("utf8 path"),
        "--seed",
        "3",
        "--users",
        "10",
        "--channels",
        "2",
        "--messages",
        "40",
        "--files",
        "4",
    ]);
    assert_cli_success(&generate, "generate");

    let export = run_cli(&[
        "export",
        "--db",
        source_db.to_str().expect("utf8 path"),
        "--out",
        exports.to_str().expect("utf8 path"),
    ]);
    assert_cli_success(&export, "export");
    let report: serde_json::Value = serde_json::from_slice(&export.stdout).expect("export json");
    assert_eq!(report["messages"], serde_json::json!(40));

    let import = run_cli(&[
        "import",
        "--db",
        target_db.to_str().expect("utf8 path"),
        "--source",
        exports.to_str().expect("utf8 path"),
        "--mode",
        "fresh",
    ]);
    assert_cli_success(&import, "import");

    let stats = run_cli(&["stats", "--db", target_db.to_str().expect("utf8 path")]);
    assert_cli_success(&stats, "stats");
    let rendered: serde_json::Value = serde_json::from_slice(&stats.stdout).expect("stats json");
    assert_eq!(rendered["counts"]["users"], serde_json::json!(10));
    assert_eq!(rendered["counts"]["messages"], serde_json::json!(40));
}

#[test]
fn test_generate_rejects_invalid_config() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("invalid.db");

    let output = run_cli(&[
        "generate",
        "--db",
        db.to_str().expect("utf8 path"),
        "--users",
        "0",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("users must be > 0"), "stderr: {stderr}");
}

#[test]
fn test_validate_fails_on_missing_database() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("absent.db");

    let output = run_cli(&["validate", "--db", missing.to_str().expect("utf8 path")]);
    assert!(!output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["ok"], serde_json::json!(false));
}

#[test]
fn test_stats_on_missing_database_fails() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("absent.db");

    let output = run_cli(&["stats", "--db", missing.to_str().expect("utf8 path")]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("database file not found"), "stderr: {stderr}");
}
