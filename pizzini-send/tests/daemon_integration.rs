//! Integration tests for the pizzini-send daemon

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ENTRIES_JSON: &str = r#"[
  {"id": 1, "date": "17.09.2012", "title": "AIUTO (1°)",
   "content": "La parola rapporto dice che una cosa c'entra con un'altra."},
  {"id": 2, "date": "18.09.2012", "title": "INFINITO",
   "content": "L'infinito non si misura."}
]"#;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Setup test environment with config, entries file and snapshot path
fn setup_test_env(scheduling: &str) -> (TempDir, String, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let entries_path = temp_dir.path().join("entries.json");
    let snapshot_path = temp_dir.path().join("data").join("schedule.json");

    fs::write(&entries_path, ENTRIES_JSON).unwrap();

    let config_content = format!(
        r#"
[content]
entries_file = "{}"

[posting]
default_platforms = ["twitter"]

[scheduling]
snapshot_file = "{}"
poll_interval = 1
{}
"#,
        escape_path_for_toml(&entries_path.to_string_lossy()),
        escape_path_for_toml(&snapshot_path.to_string_lossy()),
        scheduling
    );
    fs::write(&config_path, config_content).unwrap();

    (
        temp_dir,
        config_path.to_string_lossy().to_string(),
        snapshot_path,
    )
}

fn pizzini_send(config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("pizzini-send").unwrap();
    cmd.env("PIZZINI_CONFIG", config_path).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("pizzini-send")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SIGNALS"));
}

#[test]
fn test_once_writes_snapshot() {
    let (_temp_dir, config_path, snapshot_path) = setup_test_env("enabled = true");

    pizzini_send(&config_path).arg("--once").assert().success();

    let snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    let jobs = snapshot["scheduled_jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["job_tag"], "recurring_7d");
}

#[test]
fn test_once_posts_missed_run_from_snapshot() {
    let (_temp_dir, config_path, snapshot_path) = setup_test_env("enabled = true");

    pizzini_send(&config_path).arg("--once").assert().success();

    // Pretend the daemon was down when the job came due
    let mut snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["posted_content_ids"], serde_json::json!([]));
    snapshot["scheduled_jobs"][0]["next_runs"] = serde_json::json!(["2020-01-06T09:00:00"]);
    fs::write(&snapshot_path, snapshot.to_string()).unwrap();

    pizzini_send(&config_path).arg("--once").assert().success();

    let snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["posted_content_ids"], serde_json::json!([1]));
    let next_run = snapshot["scheduled_jobs"][0]["next_runs"][0].as_str().unwrap();
    assert!(next_run > "2020-01-06T09:00:00", "{}", next_run);
}

#[test]
fn test_status_prints_schedule() {
    let (_temp_dir, config_path, _snapshot_path) = setup_test_env(
        r#"enabled = true
mode = "random"

[scheduling.random]
posts_per_week = 2
time_windows = [["10:00", "11:00"]]
"#,
    );

    let output = pizzini_send(&config_path).arg("--status").output().unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["running"], false);
    assert_eq!(status["scheduled_jobs"], 1);
    assert_eq!(status["total_jobs"], 2);
}

#[test]
fn test_resumes_saved_schedule() {
    let (_temp_dir, config_path, snapshot_path) = setup_test_env("enabled = true");

    pizzini_send(&config_path).arg("--once").assert().success();

    // Edit the snapshot: a resumed daemon keeps the posted set
    let mut snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    snapshot["posted_content_ids"] = serde_json::json!([1]);
    fs::write(&snapshot_path, snapshot.to_string()).unwrap();

    let output = pizzini_send(&config_path).arg("--status").output().unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["posted_content_count"], 1);

    let output = pizzini_send(&config_path)
        .args(["--status", "--fresh"])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["posted_content_count"], 0);
}

#[test]
fn test_disabled_scheduling_exits_cleanly() {
    let (_temp_dir, config_path, snapshot_path) = setup_test_env("enabled = false");

    pizzini_send(&config_path).arg("--once").assert().success();
    assert!(!snapshot_path.exists());
}

#[test]
fn test_invalid_config_exits_2() {
    let temp_dir = TempDir::new().unwrap();
    let invalid_config = temp_dir.path().join("invalid.toml");
    fs::write(&invalid_config, "invalid toml content [[[").unwrap();

    pizzini_send(invalid_config.to_str().unwrap())
        .arg("--once")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_missing_entries_file_exits_2() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[content]\nentries_file = \"{}\"\n",
            escape_path_for_toml(&temp_dir.path().join("missing.json").to_string_lossy())
        ),
    )
    .unwrap();

    pizzini_send(config_path.to_str().unwrap())
        .arg("--once")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_invalid_poll_interval_rejected() {
    Command::cargo_bin("pizzini-send")
        .unwrap()
        .args(["--poll-interval", "0", "--once"])
        .assert()
        .failure();
}
