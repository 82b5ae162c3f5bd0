//! Integration tests for the `tidewatch` CLI binary.
//!
//! These cover argument parsing, help output, shell completions, config
//! editing, and error handling without a live deployment.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const NO_HOME: &str = "/tmp/tidewatch-cli-test-nonexistent";

/// Build a command for the `tidewatch` binary with env isolation.
///
/// Clears all `TIDEWATCH_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn tidewatch_cmd_in(home: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tidewatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("TIDEWATCH_PROFILE")
        .env_remove("TIDEWATCH_AUTH_CENTER")
        .env_remove("TIDEWATCH_DATA_CENTER")
        .env_remove("TIDEWATCH_OUTPUT")
        .env_remove("TIDEWATCH_INSECURE")
        .env_remove("TIDEWATCH_TIMEOUT")
        .env_remove("TIDEWATCH_USERNAME")
        .env_remove("TIDEWATCH_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn tidewatch_cmd() -> assert_cmd::Command {
    tidewatch_cmd_in(NO_HOME)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = tidewatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn help_lists_command_groups() {
    tidewatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("models")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("firmware"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn version_flag() {
    tidewatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tidewatch"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn completions_bash() {
    tidewatch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn completions_zsh() {
    tidewatch_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn invalid_subcommand() {
    let output = tidewatch_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn models_list_without_config() {
    tidewatch_cmd()
        .args(["models", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Configuration")
                .or(predicate::str::contains("config init")),
        );
}

#[test]
fn models_list_without_session_needs_login() {
    let output = tidewatch_cmd()
        .args([
            "--auth-center",
            "http://127.0.0.1:9/auth-center/",
            "--data-center",
            "http://127.0.0.1:9/data-center/",
            "models",
            "list",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
    let text = combined_output(&output);
    assert!(text.contains("Not signed in"), "Unexpected output:\n{text}");
}

#[test]
fn invalid_output_format() {
    let output = tidewatch_cmd()
        .args(["--output", "invalid", "models", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about invalid output format:\n{text}"
    );
}

#[test]
fn export_start_requires_end() {
    let output = tidewatch_cmd()
        .args(["export", "SN1", "--start", "2024-05-01"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn data_follow_conflicts_with_older_pages() {
    let output = tidewatch_cmd()
        .args(["data", "parsed", "SN1", "--follow", "--before", "2024-05-01T00:00:00Z"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--before"));
}

#[test]
fn data_query_is_listed() {
    tidewatch_cmd()
        .args(["data", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("query"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_show_without_config() {
    tidewatch_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn config_set_then_show_masks_password() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().to_str().unwrap();

    tidewatch_cmd_in(home)
        .args(["config", "set", "auth_center", "https://ops.example.com/auth-center/"])
        .assert()
        .success();
    tidewatch_cmd_in(home)
        .args(["config", "set", "password", "hunter2"])
        .assert()
        .success();

    tidewatch_cmd_in(home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://ops.example.com/auth-center/")
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    tidewatch_cmd_in(home.path().to_str().unwrap())
        .args(["config", "set", "site", "default"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    tidewatch_cmd_in(home.path().to_str().unwrap())
        .args(["config", "use", "staging"])
        .assert()
        .code(4);
}
