//! Integration tests for the pizzini-post command line

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const ENTRIES_JSON: &str = r#"[
  {"id": 1, "date": "17.09.2012", "title": "AIUTO (1°)",
   "content": "La parola rapporto dice che una cosa c&apos;entra con un&apos;altra."},
  {"id": 2, "date": "18.09.2012", "title": "INFINITO",
   "content": "<p>L'infinito non si misura.</p>"},
  {"id": 3, "date": "19.09.2012", "title": "", "content": ""}
]"#;

/// Write the sample entries file and return its directory and path
fn setup_entries() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entries.json");
    fs::write(&path, ENTRIES_JSON).unwrap();
    (temp_dir, path.to_string_lossy().to_string())
}

fn pizzini_post() -> Command {
    let mut cmd = Command::cargo_bin("pizzini-post").unwrap();
    cmd.env_remove("PIZZINI_ENTRIES")
        .env_remove("PIZZINI_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

fn long_body() -> String {
    (0..15)
        .map(|i| format!("Questa è la frase numero {} di un pizzino lungo.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_help_lists_subcommands() {
    pizzini_post()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("format"))
        .stdout(predicate::str::contains("thread"))
        .stdout(predicate::str::contains("EXIT CODES"));
}

// FORMAT

#[test]
fn test_format_entry_for_twitter() {
    let (_dir, entries) = setup_entries();

    pizzini_post()
        .args(["--entries", &entries, "format", "--entry", "1", "--no-hashtags"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "AIUTO (1°)\n\nLa parola rapporto dice che una cosa c'entra con un'altra.",
        ));
}

#[test]
fn test_format_strips_markup() {
    let (_dir, entries) = setup_entries();

    pizzini_post()
        .args(["--entries", &entries, "format", "-e", "2", "-p", "facebook"])
        .assert()
        .success()
        .stdout(predicate::str::contains("L'infinito non si misura."))
        .stdout(predicate::str::contains("<p>").not());
}

#[test]
fn test_format_json_for_several_platforms() {
    let (_dir, entries) = setup_entries();

    let output = pizzini_post()
        .args([
            "--entries",
            &entries,
            "format",
            "--entry",
            "1",
            "--platform",
            "twitter,linkedin",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let posts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["platform"], "twitter");
    assert_eq!(posts[1]["platform"], "linkedin");
    assert!(posts[1]["text"].as_str().unwrap().starts_with("💭 AIUTO (1°)"));
    assert_eq!(posts[0]["within_limits"], true);
}

#[test]
fn test_format_reads_stdin() {
    pizzini_post()
        .args(["format", "--title", "NOTA", "--no-hashtags"])
        .write_stdin("Un pensiero breve.")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTA"))
        .stdout(predicate::str::contains("Un pensiero breve."));
}

#[test]
fn test_format_invalid_platform_exits_3() {
    pizzini_post()
        .args(["format", "--content", "ciao", "--platform", "myspace"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Unknown platform"));
}

#[test]
fn test_format_invalid_output_format_exits_3() {
    pizzini_post()
        .args(["format", "--content", "ciao", "--format", "yaml"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_format_missing_entry_exits_3() {
    let (_dir, entries) = setup_entries();

    pizzini_post()
        .args(["--entries", &entries, "format", "--entry", "99"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Entry 99 not found"));
}

#[test]
fn test_format_empty_input_exits_3() {
    pizzini_post()
        .arg("format")
        .write_stdin("   ")
        .assert()
        .failure()
        .code(3);
}

// THREAD

#[test]
fn test_thread_numbers_segments() {
    let output = pizzini_post()
        .args(["thread", "--title", "LUNGO", "--content", &long_body(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let thread: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let segments = thread["segments"].as_array().unwrap();
    let total = segments.len();
    assert!(total > 1);
    for (i, segment) in segments.iter().enumerate() {
        let text = segment.as_str().unwrap();
        assert!(text.ends_with(&format!("({}/{})", i + 1, total)));
        assert!(text.chars().count() <= 280);
    }
}

// ENTRIES

#[test]
fn test_entries_lists_non_blank_entries() {
    let (_dir, entries) = setup_entries();

    pizzini_post()
        .args(["--entries", &entries, "entries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 | 17.09.2012 | AIUTO (1°)"))
        .stdout(predicate::str::contains("2 | 18.09.2012 | INFINITO"))
        .stdout(predicate::str::contains("19.09.2012").not());
}

#[test]
fn test_entries_from_env_variable() {
    let (_dir, entries) = setup_entries();

    pizzini_post()
        .env("PIZZINI_ENTRIES", &entries)
        .args(["entries", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"INFINITO\""));
}

#[test]
fn test_entries_json_includes_iso_date() {
    let (_dir, entries) = setup_entries();

    let output = pizzini_post()
        .args(["--entries", &entries, "entries", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["id"], 1);
    assert_eq!(listed[0]["date"], "17.09.2012");
    assert_eq!(listed[0]["iso_date"], "2012-09-17");
}

#[test]
fn test_entries_json_malformed_date_is_null() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entries.json");
    fs::write(
        &path,
        r#"[{"id": 5, "date": "2012/09/17", "title": "DATA", "content": "Testo."}]"#,
    )
    .unwrap();

    let output = pizzini_post()
        .args(["--entries", path.to_str().unwrap(), "entries", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["title"], "DATA");
    assert!(listed[0]["iso_date"].is_null());
}

#[test]
fn test_entries_missing_config_exits_2() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    pizzini_post()
        .env("PIZZINI_CONFIG", missing.to_str().unwrap())
        .arg("entries")
        .assert()
        .failure()
        .code(2);
}

// SUGGEST / INIT-CONFIG

#[test]
fn test_suggest_json() {
    let output = pizzini_post()
        .args(["suggest", "--platform", "twitter,linkedin", "--posts-per-week", "2", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let suggestion: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(suggestion["twitter"].as_array().unwrap().len(), 2);
    assert_eq!(suggestion["linkedin"].as_array().unwrap().len(), 2);
}

#[test]
fn test_init_config_prints_defaults() {
    pizzini_post()
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[scheduling]"))
        .stdout(predicate::str::contains("entries_file"));
}
