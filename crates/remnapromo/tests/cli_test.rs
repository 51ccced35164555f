//! Integration tests for the `remnapromo` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run without
//! a panel; the end-to-end tests point the binary at a wiremock panel.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `remnapromo` binary with env isolation.
///
/// Clears every `REMNAPROMO_*` and legacy variable and points config and
/// data directories into `home`, so tests never touch a real configuration.
fn remnapromo_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("remnapromo");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("REMNAPROMO_CONFIG", home.join("config.toml"))
        .env("REMNAPROMO_ARTIFACTS__DIR", home.join("listings"))
        .env("TMPDIR", home.join("tmp"))
        .env("NO_COLOR", "1")
        .current_dir(home);
    for var in [
        "REMNAPROMO_PROFILE",
        "REMNAPROMO_PANEL",
        "REMNAPROMO_TOKEN",
        "REMNAPROMO_OUTPUT",
        "REMNAPROMO_INSECURE",
        "REMNAPROMO_TIMEOUT",
        "REMNAPROMO_LOG_FILE",
        "REMNAPROMO_OPERATOR",
        "REMNAWAVE_BASE_URL",
        "REMNAWAVE_TOKEN",
        "REMNAWAVE_CADDY_TOKEN",
        "DEFAULT_UUID_PREFIX",
        "MAX_SUBSCRIPTIONS_PER_REQUEST",
        "ADMIN_USER_IDS",
        "SUBSCRIPTION_FILE_BASE_URL",
        "LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A command already pointed at `server` with a token.
fn panel_cmd(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = remnapromo_cmd(home);
    cmd.args(["--panel", &server.uri(), "--token", "test-token"]);
    cmd
}

/// Run a prepared command off the async runtime.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn user(uuid: &str, username: &str, status: &str, used: u64) -> Value {
    json!({
        "uuid": uuid,
        "shortUuid": format!("s-{uuid}"),
        "username": username,
        "status": status,
        "usedTrafficBytes": used,
        "trafficLimitBytes": 1_073_741_824_u64,
        "subscriptionUrl": format!("https://sub.example.com/{uuid}")
    })
}

/// Two SUMMER subscriptions (one expired), one WINTER under quota, one
/// user outside any campaign.
async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "users": [
                    user("u1", "promo-aaaa1111-SUMMER", "ACTIVE", 0),
                    user("u2", "promo-bbbb2222-SUMMER", "EXPIRED", 0),
                    user("u3", "promo-cccc3333-WINTER", "ACTIVE", 10),
                    user("u4", "alice", "ACTIVE", 0)
                ],
                "total": 4
            }
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = remnapromo_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_campaign_commands() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("stats")
                .and(predicate::str::contains("provision"))
                .and(predicate::str::contains("retire"))
                .and(predicate::str::contains("wizard")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("remnapromo"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = remnapromo_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_stats_without_panel_reports_missing_config() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_panel_without_token_exits_with_auth_code() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .args(["--panel", "https://panel.example.com", "stats"])
        .assert()
        .code(3);
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = remnapromo_cmd(home.path())
        .args(["--output", "invalid", "stats"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

// ── Config and artifacts (no panel) ─────────────────────────────────

#[test]
fn test_config_show_without_file_renders_defaults() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name_prefix = \"promo-\""));
}

#[test]
fn test_config_path_honours_override() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_masks_tokens() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[profiles.default]\npanel = \"https://panel.example.com\"\ntoken = \"very-secret\"\n",
    )
    .unwrap();
    remnapromo_cmd(home.path())
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("very-secret").not())
        .stdout(predicate::str::contains("****"));
}

#[test]
fn test_artifacts_cleanup_on_empty_dirs() {
    let home = tempfile::tempdir().unwrap();
    remnapromo_cmd(home.path())
        .args(["artifacts", "cleanup", "--days", "7"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 0 listing(s)"));
}

// ── End-to-end against a mock panel ─────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_stats_json_counts_campaigns() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args(["-o", "json", "stats"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        body,
        json!({
            "campaigns": [
                { "tag": "SUMMER", "total": 2, "active": 1, "used": 1 },
                { "tag": "WINTER", "total": 1, "active": 1, "used": 0 }
            ],
            "totals": { "total": 3, "active": 2, "used": 1 }
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stats_table_has_totals_row() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.arg("stats");
    let output = run(cmd).await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("SUMMER") && stdout.contains("TOTAL"), "{stdout}");
    assert!(!stdout.contains("alice"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_plain() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args(["-o", "plain", "preview", "SUMMER"]);
    let output = run(cmd).await;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2\t1\t1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_exits_with_auth_code() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })))
        .mount(&server)
        .await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.arg("stats");
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_count_makes_no_panel_calls() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args(["provision", "--tag", "SPRING", "--traffic-gb", "15", "--count", "0"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_provision_prints_links_and_writes_listing() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "response": user("u9", "promo-zzzz9999-SPRING", "ACTIVE", 0)
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/u9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": user("u9", "promo-zzzz9999-SPRING", "ACTIVE", 0)
        })))
        .mount(&server)
        .await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args([
        "-o", "plain", "provision", "--tag", "SPRING", "--traffic-gb", "15", "--count", "1",
    ]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "https://sub.example.com/u9"
    );

    let listings: Vec<_> = std::fs::read_dir(home.path().join("listings"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(listings.len(), 1, "{listings:?}");
    assert!(listings[0].starts_with("promo_SPRING_"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retire_requires_yes_when_not_interactive() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args(["retire", "SUMMER"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retire_deletes_only_used_subscriptions() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_directory(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/u2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "isDeleted": true } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.args(["-y", "-o", "plain", "retire", "SUMMER"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1\t2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wizard_rejects_operator_outside_allow_list() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    let mut cmd = panel_cmd(home.path(), &server);
    cmd.env("ADMIN_USER_IDS", "1,2")
        .args(["wizard", "--operator", "99"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}
