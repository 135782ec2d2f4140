//! CLI integration tests
use predicates::prelude::*;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("distill").unwrap()
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("readable article"));
}

#[test]
fn test_cli_requires_url() {
    cmd().assert().failure();
}

#[test]
fn test_cli_invalid_url_fails() {
    cmd().arg("http://").assert().failure();
}

#[test]
fn test_cli_rejects_unknown_format() {
    cmd()
        .args(["-f", "yaml", "http://example.org/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_cli_rejects_unknown_link_policy() {
    cmd()
        .args(["--links", "mangle", "http://example.org/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid link policy"));
}
