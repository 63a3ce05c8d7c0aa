//! Integration tests for the `isoft` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a device; the end-to-end cases use wiremock as the unit.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `isoft` binary with env isolation.
///
/// Clears all `ISOFT_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn isoft_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("isoft");
    cmd.env("HOME", "/tmp/isoft-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/isoft-cli-test-nonexistent")
        .env_remove("ISOFT_PROFILE")
        .env_remove("ISOFT_HOST")
        .env_remove("ISOFT_PORT")
        .env_remove("ISOFT_URL")
        .env_remove("ISOFT_OUTPUT")
        .env_remove("ISOFT_TIMEOUT")
        .env_remove("ISOFT_USERNAME")
        .env_remove("ISOFT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "data": data }))
}

async fn mount_command(server: &MockServer, command: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(query_param("command", command))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A mocked unit answering the full reading sequence.
async fn softener() -> MockServer {
    let server = MockServer::start().await;
    mount_command(
        &server,
        "login",
        ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "token": "tok-1" })),
    )
    .await;
    mount_command(
        &server,
        "show",
        ok(json!([{ "wtuType": "i-soft safe", "serial number": "200123" }])),
    )
    .await;
    mount_command(&server, "connect", ok(json!("connected"))).await;
    mount_command(&server, "water total", ok(json!("  12345  67890"))).await;
    mount_command(&server, "valve", ok(json!("opened"))).await;
    mount_command(&server, "vacation", ok(json!("0"))).await;
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || {
        isoft_cmd()
            .env("ISOFT_PASSWORD", "Connectivity")
            .args(args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn device_args(server: &MockServer, rest: &[&str]) -> Vec<String> {
    let mut args = vec![
        "--url".to_string(),
        format!("{}/", server.uri()),
        "-u".into(),
        "admin".into(),
        "--timeout".into(),
        "5".into(),
    ];
    args.extend(rest.iter().map(|s| (*s).to_string()));
    args
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = isoft_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    isoft_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("water softener")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn test_version_flag() {
    isoft_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("isoft"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    isoft_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    isoft_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = isoft_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_valve_state_is_usage_error() {
    isoft_cmd()
        .args(["set", "valve", "ajar"])
        .assert()
        .code(2);
}

#[test]
fn test_status_without_config() {
    isoft_cmd()
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No device configured"));
}

#[test]
fn test_unknown_profile() {
    isoft_cmd()
        .args(["-p", "cellar", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cellar"));
}

#[test]
fn test_config_path_prints_location() {
    isoft_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Against a mocked unit ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_renders_json() {
    let server = softener().await;
    let output = run(device_args(&server, &["-o", "json", "status"])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let reading: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        reading,
        json!({
            "type": "i-soft safe",
            "serial": "200123",
            "water_total_raw": 12345,
            "water_total_soft": 67890,
            "valve_open": true,
            "vacation": false,
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain_output() {
    let server = softener().await;
    let output = run(device_args(&server, &["-o", "plain", "status"])).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("water_total_soft=67890"), "{stdout}");
    assert!(stdout.contains("valve_open=true"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_valve_sends_close() {
    let server = softener().await;
    let output = run(device_args(&server, &["set", "valve", "close"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let reqs = server.received_requests().await.unwrap();
    let last = reqs.last().unwrap();
    let valve = last
        .url
        .query_pairs()
        .find(|(k, _)| k == "valve")
        .map(|(_, v)| v.into_owned());
    assert_eq!(valve.as_deref(), Some("close"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_raw_rejects_unknown_key() {
    let server = softener().await;
    let output = run(device_args(&server, &["set", "raw", "regeneration", "1"])).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_reports_refused_login() {
    let server = MockServer::start().await;
    mount_command(
        &server,
        "login",
        ResponseTemplate::new(200).set_body_json(json!({
            "status": "error", "error": "error", "data": "not logged in"
        })),
    )
    .await;

    let output = run(device_args(&server, &["check"])).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_succeeds() {
    let server = softener().await;
    let output = run(device_args(&server, &["--color", "never", "check"])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("i-soft safe #200123"));
}
