//! Smoke tests -- verify the binary runs and the subcommands are wired.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    Command::cargo_bin("quickalert")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("disaster alert"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("quickalert")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quickalert"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("quickalert")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

#[test]
fn test_classify_json() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("quickalert")
        .unwrap()
        .env_remove("QUICKALERT_CONFIG")
        .current_dir(dir.path())
        .args([
            "classify",
            "--text",
            "Major earthquake, evacuation underway, emergency declared",
            "--severity",
            "Extreme",
            "--lat",
            "34.05",
            "--lon",
            "-118.24",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"alert_level\": \"critical\""))
        .stdout(predicate::str::contains("\"disaster_type\": \"earthquake\""));
}

#[test]
fn test_classify_table_output() {
    Command::cargo_bin("quickalert")
        .unwrap()
        .env_remove("QUICKALERT_CONFIG")
        .args(["classify", "--text", "Flash flood warning downtown", "--severity", "Severe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disaster type"))
        .stdout(predicate::str::contains("flood"));
}

#[test]
fn test_classify_requires_text() {
    Command::cargo_bin("quickalert")
        .unwrap()
        .arg("classify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--text"));
}

#[test]
fn test_bad_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quickalert.toml");
    std::fs::write(&path, "[store\nmax_stored = ").unwrap();
    Command::cargo_bin("quickalert")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .args(["classify", "--text", "flood"])
        .assert()
        .failure();
}
