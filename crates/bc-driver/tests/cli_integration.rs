//! CLI integration tests
//!
//! Tests the bc-driver binary using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

fn bc_driver() -> Command {
    Command::cargo_bin("bc-driver")
        .expect("Failed to locate bc-driver binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    bc_driver()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backchannel test driver"))
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("attach"));
}

#[test]
fn test_cli_version() {
    bc_driver()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bc-driver"));
}

#[test]
fn test_cli_attach_help() {
    bc_driver()
        .args(["attach", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--name"))
        .stdout(predicate::str::contains("--exit"));
}

#[test]
fn test_cli_attach_times_out_without_agent() {
    bc_driver()
        .args(["--port", "0", "attach", "--timeout", "0.2"])
        .env_remove("RUST_LOG")
        .assert()
        .failure()
        .stdout(predicate::str::contains("BACKCHANNEL_AGENT=127.0.0.1:"))
        .stderr(predicate::str::contains("Agent port not received before timeout"));
}

#[test]
fn test_cli_missing_config_file() {
    bc_driver()
        .args(["--config", "/nonexistent/backchannel.toml", "attach"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_cli_invalid_command() {
    bc_driver().arg("invalid-command").assert().failure();
}
