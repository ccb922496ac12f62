//! Integration tests for the `atelier` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! error exit codes, and offline runs against the in-process store.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `atelier` binary with env isolation.
///
/// Clears all `ATELIER_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn atelier_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("atelier");
    cmd.env("HOME", "/tmp/atelier-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/atelier-cli-test-nonexistent")
        .env_remove("ATELIER_PROFILE")
        .env_remove("ATELIER_URL")
        .env_remove("ATELIER_API_KEY")
        .env_remove("ATELIER_OUTPUT")
        .env_remove("ATELIER_INSECURE")
        .env_remove("ATELIER_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = atelier_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    atelier_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("clients")
            .and(predicate::str::contains("instruments"))
            .and(predicate::str::contains("connections"))
            .and(predicate::str::contains("relationships"))
            .and(predicate::str::contains("search")),
    );
}

#[test]
fn test_version_flag() {
    atelier_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("atelier"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    atelier_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    atelier_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = atelier_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_list_without_backend_config_fails() {
    atelier_cmd()
        .args(["clients", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config").or(predicate::str::contains("profile")));
}

#[test]
fn test_url_without_key_is_auth_error() {
    atelier_cmd()
        .args(["--url", "https://shop.example.com", "clients", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_invalid_output_format() {
    let output = atelier_cmd()
        .args(["--output", "invalid", "--offline", "clients", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Offline runs ────────────────────────────────────────────────────

#[test]
fn test_offline_list_is_empty_json() {
    atelier_cmd()
        .args(["--offline", "--output", "json-compact", "instruments", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_offline_create_client_echoes_record() {
    atelier_cmd()
        .args([
            "--offline",
            "-o",
            "json",
            "clients",
            "create",
            "--first-name",
            "Jane",
            "--email",
            "jane@example.com",
            "--tags",
            "vip,cello",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"first_name\": \"Jane\"")
                .and(predicate::str::contains("\"vip\""))
                .and(predicate::str::contains("\"created_at\"")),
        );
}

#[test]
fn test_offline_create_without_name_is_usage_error() {
    atelier_cmd()
        .args(["--offline", "clients", "create", "--email", "a@b.c"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_offline_get_missing_is_not_found() {
    atelier_cmd()
        .args(["--offline", "instruments", "get", "i-missing"])
        .assert()
        .code(4);
}

#[test]
fn test_delete_requires_confirmation_when_not_interactive() {
    atelier_cmd()
        .args(["--offline", "clients", "delete", "c1"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_delete_missing_with_yes_is_not_found() {
    atelier_cmd()
        .args(["--offline", "-y", "connections", "delete", "x1"])
        .assert()
        .code(4);
}

#[test]
fn test_offline_search_reports_zero_matches() {
    atelier_cmd()
        .args(["--offline", "search", "amati"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 match(es)"));
}

#[test]
fn test_offline_relationships_plain_is_empty() {
    atelier_cmd()
        .args(["--offline", "-o", "plain", "relationships"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    atelier_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_set_then_show_masks_key() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().to_str().unwrap();

    atelier_cmd()
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .args(["config", "set", "url", "https://shop.example.com"])
        .assert()
        .success();
    atelier_cmd()
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .args(["config", "set", "api_key", "super-secret"])
        .assert()
        .success();

    atelier_cmd()
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://shop.example.com")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("super-secret").not()),
        );
}

#[test]
fn test_config_use_unknown_profile() {
    atelier_cmd()
        .args(["config", "use", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_connections_subcommands_exist() {
    atelier_cmd()
        .args(["connections", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("create"))
                .and(predicate::str::contains("reorder")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    atelier_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("set-key"))
                .and(predicate::str::contains("path")),
        );
}
