//! Integration tests for the `botdeck` CLI binary.
//!
//! Argument parsing, help output, completions, and error handling run
//! without a server; a few end-to-end cases run against wiremock.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `botdeck` binary with env isolation.
///
/// Clears all `BOTDECK_*` env vars and points config directories at a
/// fresh temp dir so tests never touch the user's real configuration.
fn botdeck_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("botdeck");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("BOTDECK_PROFILE")
        .env_remove("BOTDECK_URL")
        .env_remove("BOTDECK_OUTPUT")
        .env_remove("BOTDECK_INSECURE")
        .env_remove("BOTDECK_TIMEOUT");
    cmd
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A wiremock server on its own runtime, usable from sync tests.
struct Server {
    rt: tokio::runtime::Runtime,
    mock: MockServer,
}

impl Server {
    fn start() -> Self {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mock = rt.block_on(MockServer::start());
        Self { rt, mock }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.mock));
    }

    fn uri(&self) -> String {
        self.mock.uri()
    }
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = home();
    let output = botdeck_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = home();
    botdeck_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("members"))
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("logs")),
    );
}

#[test]
fn test_version_flag() {
    let home = home();
    botdeck_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("botdeck"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = home();
    botdeck_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = home();
    botdeck_cmd(&home)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = home();
    let output = botdeck_cmd(&home).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_server_config() {
    let home = home();
    botdeck_cmd(&home)
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No admin server configured"));
}

#[test]
fn test_unknown_profile_is_reported() {
    let home = home();
    botdeck_cmd(&home)
        .args(["--profile", "nope", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_invalid_output_format() {
    let home = home();
    let output = botdeck_cmd(&home)
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_bot_stop_needs_yes_when_not_interactive() {
    let home = home();
    botdeck_cmd(&home)
        .args(["--url", "http://127.0.0.1:9", "bot", "stop"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn test_active_and_inactive_conflict() {
    let home = home();
    botdeck_cmd(&home)
        .args([
            "--url",
            "http://127.0.0.1:9",
            "members",
            "edit",
            "10001",
            "--active",
            "--inactive",
        ])
        .assert()
        .code(2);
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    let home = home();
    botdeck_cmd(&home)
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("show")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("set"))
                .and(predicate::str::contains("traits"))
                .and(predicate::str::contains("env")),
        );
}

#[test]
fn test_bot_subcommands_exist() {
    let home = home();
    botdeck_cmd(&home)
        .args(["bot", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("start")
                .and(predicate::str::contains("stop"))
                .and(predicate::str::contains("restart")),
        );
}

// ── Profiles ────────────────────────────────────────────────────────

#[test]
fn test_profile_add_then_show() {
    let home = home();
    botdeck_cmd(&home)
        .args(["profile", "add", "lab", "--url", "http://10.0.0.5:5000"])
        .assert()
        .success();

    // The only profile becomes the default.
    botdeck_cmd(&home)
        .args(["--output", "plain", "profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://10.0.0.5:5000"));
}

#[test]
fn test_profile_add_rejects_bad_url() {
    let home = home();
    botdeck_cmd(&home)
        .args(["profile", "add", "lab", "--url", "not a url"])
        .assert()
        .code(2);
}

// ── Against a server ────────────────────────────────────────────────

#[test]
fn test_status_plain_output() {
    let server = Server::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/api/bot/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "running": true,
                "uptime": "2:00:00",
                "pid": 4242
            }))),
    );

    let home = home();
    botdeck_cmd(&home)
        .args(["--url", &server.uri(), "--output", "plain", "status"])
        .assert()
        .success()
        .stdout("running\n");
}

#[test]
fn test_members_list_json() {
    let server = Server::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/api/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "members": [{ "qq": 10001, "nickname": "alice", "is_active": 1 }]
            }))),
    );

    let home = home();
    let output = botdeck_cmd(&home)
        .args(["--url", &server.uri(), "--output", "json", "members", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let members: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(members[0]["qq"], "10001");
    assert_eq!(members[0]["nickname"], "alice");
}

#[test]
fn test_rejected_bot_start_prints_server_message() {
    let server = Server::start();
    server.mount(
        Mock::given(method("POST"))
            .and(path("/api/bot/start"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "error": "Bot已在运行" })),
            ),
    );

    let home = home();
    botdeck_cmd(&home)
        .args(["--url", &server.uri(), "bot", "start"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Bot已在运行"));
}

#[test]
fn test_config_get_merges_defaults() {
    let server = Server::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "config": { "bot": { "qq_number": "10001" } }
            }))),
    );

    let home = home();
    botdeck_cmd(&home)
        .args(["--url", &server.uri(), "config", "get", "bot.qq_number"])
        .assert()
        .success()
        .stdout("10001\n");

    // Not on the server, present in the defaults.
    botdeck_cmd(&home)
        .args([
            "--url",
            &server.uri(),
            "config",
            "get",
            "features.smart_reply",
        ])
        .assert()
        .success()
        .stdout("true\n");
}
