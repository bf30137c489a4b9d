//! CLI integration tests
use std::path::{Path, PathBuf};

use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kindlekeep");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, api_url: &str) -> PathBuf {
    let path = dir.join("config.json");
    let config = json!({
        "karakeep": { "api_url": api_url, "api_key": "key" },
        "kindle": {
            "email": "reader@kindle.com",
            "smtp_server": "localhost",
            "smtp_port": 2525,
            "smtp_user": "me@example.org",
            "smtp_password": "pw"
        },
        "output": { "format": "html", "output_dir": dir.join("output") },
        "log_file": dir.join("run.log")
    });
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--compilation"))
        .stdout(predicate::str::contains("--send-email"))
        .stdout(predicate::str::contains("setup"));
}

#[test]
fn test_cli_version() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_format() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path()).args(["--format", "docx"]).assert().failure();
}

#[test]
fn test_cli_missing_config_creates_default() {
    let tmp = TempDir::new().unwrap();

    cmd(tmp.path())
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Created default config file"));

    let created = std::fs::read_to_string(tmp.path().join("config.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&created).unwrap();
    assert_eq!(value["kindle"]["smtp_port"], 587);
    assert_eq!(value["output"]["format"], "pdf");
}

#[test]
fn test_cli_invalid_config() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();

    cmd(tmp.path())
        .args(["--config", "broken.json", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_cli_send_missing_file() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "http://127.0.0.1:9/api/v1");

    cmd(tmp.path())
        .args(["--send-email", "nope.epub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to send 'nope.epub' to Kindle"));
}

#[test]
fn test_cli_send_file_dry_run() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "http://127.0.0.1:9/api/v1");
    let file = tmp.path().join("notes.pdf");
    std::fs::write(&file, "%PDF-1.4").unwrap();

    cmd(tmp.path())
        .args(["--dry-run", "--cleanup", "--send-email", "notes.pdf"])
        .assert()
        .success()
        .stderr(predicate::str::contains("DRY RUN"));

    assert!(file.exists());
}

#[test]
fn test_cli_dry_run_lists_without_archiving() {
    let tmp = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let listing = server
        .mock("GET", "/api/v1/bookmarks")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "bookmarks": [
                    { "id": "bm1", "archived": false, "content": { "type": "link", "title": "One" } },
                    { "id": "bm2", "archived": false, "content": { "type": "text", "text": "Two" } }
                ],
                "nextCursor": null
            })
            .to_string(),
        )
        .create();
    let archive = server.mock("PATCH", mockito::Matcher::Any).expect(0).create();

    write_config(tmp.path(), &format!("{}/api/v1", server.url()));

    cmd(tmp.path())
        .args(["--dry-run", "--compilation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 unarchived articles"))
        .stderr(predicate::str::contains("Dry Run Summary"));

    listing.assert();
    archive.assert();
    assert!(!tmp.path().join("output").exists());
    assert!(std::fs::read_to_string(tmp.path().join("run.log")).unwrap().contains("DRY RUN"));
}

#[test]
fn test_cli_api_failure_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    server.mock("GET", "/api/v1/bookmarks").match_query(mockito::Matcher::Any).with_status(500).create();

    write_config(tmp.path(), &format!("{}/api/v1", server.url()));

    cmd(tmp.path())
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_cli_setup_writes_config() {
    let tmp = TempDir::new().unwrap();
    let answers = "\nsecret\nreader@kindle.com\n\n\nme@example.org\npw\nepub\n./docs\n";

    cmd(tmp.path())
        .arg("setup")
        .write_stdin(answers)
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration saved"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(saved["karakeep"]["api_key"], "secret");
    assert_eq!(saved["output"]["format"], "epub");
    assert_eq!(saved["output"]["output_dir"], "./docs");
}

#[test]
fn test_cli_clean() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "http://127.0.0.1:9/api/v1");
    let output = tmp.path().join("output");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("a.epub"), "x").unwrap();
    std::fs::write(output.join("b.html"), "x").unwrap();

    cmd(tmp.path())
        .arg("clean")
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 2 file(s)"));

    assert_eq!(std::fs::read_dir(&output).unwrap().count(), 0);
}

#[test]
fn test_cli_completions() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kindlekeep"));
}

#[test]
fn test_completions_use_hyphenated_flags() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--send-email"))
        .stdout(predicate::str::contains("--dry_run").not());

    let generated = std::fs::read_to_string(Path::new(env!("OUT_DIR")).join("completions/kindlekeep.bash")).unwrap();
    for flag in ["--dry-run", "--send-email", "--keep-recent"] {
        assert!(generated.contains(flag), "missing {}", flag);
    }
    for flag in ["--dry_run", "--send_email", "--keep_recent"] {
        assert!(!generated.contains(flag), "unexpected {}", flag);
    }
}
