//! Integration tests for the `siteplan` CLI binary.
//!
//! Argument parsing, config handling and exit codes run without a
//! service; prediction flows run against a wiremock stand-in.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Smallest payload the GeoTIFF decoder accepts.
const TIFF: &[u8] = b"II*\0\x08\0\0\0";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `siteplan` binary with env isolation.
///
/// Clears all `SITEPLAN_*` env vars and points the config file into
/// `home`, so tests never touch the user's real configuration.
fn siteplan_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("siteplan");
    cmd.env("SITEPLAN_CONFIG", home.join("config.toml"))
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("SITEPLAN_PROFILE")
        .env_remove("SITEPLAN_SERVICE")
        .env_remove("SITEPLAN_OUTPUT")
        .env_remove("SITEPLAN_INSECURE")
        .env_remove("SITEPLAN_TIMEOUT")
        .env_remove("SITEPLAN_DEFAULT_PROFILE");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(home: &Path, service: &str) {
    let toml = format!(
        r#"default_profile = "lab"

[defaults]
poll_interval_ms = 10

[profiles.lab]
service = "{service}"

[profiles.lab.parameters.transmitter]
name = "Lab Tower"
latitude = 45.5
"#
    );
    std::fs::write(home.join("config.toml"), toml).unwrap();
}

/// Run the command on a blocking thread so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

async fn mount_task(server: &MockServer, task_id: &str, status: &str) {
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": task_id })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/status/{task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/result/{task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(TIFF))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, TempDir) {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &server.uri());
    (server, home)
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = siteplan_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("radio coverage")
                .and(predicate::str::contains("predict"))
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("result")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("siteplan"));
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = siteplan_cmd(home.path()).arg("frobnicate").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("siteplan"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_predict_without_config_explains_setup() {
    let home = tempfile::tempdir().unwrap();
    let output = siteplan_cmd(home.path()).arg("predict").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("config init"), "Expected setup hint:\n{text}");
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "http://localhost:9");

    let output = siteplan_cmd(home.path())
        .args(["--profile", "nope", "status", "t-1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("lab"));
}

#[test]
fn test_config_path_honors_env() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .args(["config", "set", "service", "http://planner.local:8080"])
        .assert()
        .success();
    siteplan_cmd(home.path())
        .args(["config", "set", "max_attempts", "12"])
        .assert()
        .success();

    let output = siteplan_cmd(home.path())
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let cfg: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cfg["profiles"]["default"]["service"], "http://planner.local:8080");
    assert_eq!(cfg["profiles"]["default"]["max_attempts"], 12);
}

#[test]
fn test_config_init_refuses_to_replace_unreadable_config() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");
    let broken = "default_profile = \"lab\"\n[profiles.lab\nservice = ";
    std::fs::write(&config, broken).unwrap();

    let output = siteplan_cmd(home.path())
        .args(["config", "init"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(
        combined_output(&output).contains("config loading failed"),
        "{}",
        combined_output(&output)
    );
    assert_eq!(std::fs::read_to_string(&config).unwrap(), broken);
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let output = siteplan_cmd(home.path())
        .args(["config", "set", "colour", "blue"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Valid keys"));
}

// ── Params ──────────────────────────────────────────────────────────

#[test]
fn test_params_uses_profile_and_flags() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "http://localhost:9");

    let output = siteplan_cmd(home.path())
        .args(["-o", "json", "params", "--power", "5", "--polarization", "horizontal"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let params: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(params["transmitter"]["name"], "Lab Tower");
    assert_eq!(params["transmitter"]["latitude"], 45.5);
    assert_eq!(params["transmitter"]["power_watts"], 5.0);
    assert_eq!(params["environment"]["polarization"], "horizontal");
}

#[test]
fn test_params_without_config_uses_defaults() {
    let home = tempfile::tempdir().unwrap();
    siteplan_cmd(home.path())
        .args(["-o", "plain", "params"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transmitter"));
}

#[test]
fn test_params_validate_rejects_out_of_range() {
    let home = tempfile::tempdir().unwrap();
    let output = siteplan_cmd(home.path())
        .args(["params", "--validate", "--lat", "123"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("transmitter.latitude"));
}

// ── Prediction flows ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_writes_overlay() {
    let (server, home) = setup().await;
    mount_task(&server, "t-1", "completed").await;
    let out_dir: PathBuf = home.path().join("overlays");

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "plain", "predict", "--name", "Alpha", "--out-dir"])
        .arg(&out_dir);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let written = out_dir.join("01-alpha.tif");
    assert_eq!(std::fs::read(&written).unwrap(), TIFF);
    assert!(String::from_utf8_lossy(&output.stdout).contains("01-alpha.tif"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_batch_file_writes_overlays_in_order() {
    let (server, home) = setup().await;
    mount_task(&server, "t-1", "completed").await;
    let params = home.path().join("sites.json");
    std::fs::write(
        &params,
        r#"[{ "transmitter": { "name": "North" } }, { "transmitter": { "name": "South" } }]"#,
    )
    .unwrap();
    let out_dir = home.path().join("out");

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "json", "predict", "--params"])
        .arg(&params)
        .arg("--out-dir")
        .arg(&out_dir);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let sites: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[0]["name"], "North");
    assert_eq!(sites[1]["name"], "South");
    assert!(out_dir.join("01-north.tif").exists());
    assert!(out_dir.join("02-south.tif").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_predict_keeps_earlier_overlay() {
    let (server, home) = setup().await;
    mount_task(&server, "t-1", "completed").await;
    let out_dir = home.path().join("overlays");
    std::fs::create_dir_all(&out_dir).unwrap();
    std::fs::write(out_dir.join("01-alpha.tif"), b"PREVIOUS-RUN").unwrap();

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "plain", "predict", "--name", "Alpha", "--out-dir"])
        .arg(&out_dir);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        std::fs::read(out_dir.join("01-alpha.tif")).unwrap(),
        b"PREVIOUS-RUN"
    );
    assert_eq!(std::fs::read(out_dir.join("02-alpha.tif")).unwrap(), TIFF);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_no_wait_prints_task_id() {
    let (server, home) = setup().await;
    mount_task(&server, "t-queued", "processing").await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "plain", "predict", "--no-wait"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "t-queued");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_service_failure_exit_code() {
    let (server, home) = setup().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "t-bad" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status/t-bad"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "failed", "error": "no terrain data" })),
        )
        .mount(&server)
        .await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["predict", "--out-dir"]).arg(home.path().join("o"));
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("no terrain data"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_rejected_submission_exit_code() {
    let (server, home) = setup().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(422).set_body_string("frequency out of range"))
        .mount(&server)
        .await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["predict", "--no-wait"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("frequency out of range"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_gives_up_after_max_attempts() {
    let (server, home) = setup().await;
    mount_task(&server, "t-slow", "processing").await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["predict", "--max-attempts", "2", "--poll-interval", "5ms", "--out-dir"])
        .arg(home.path().join("o"));
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(8));
    assert!(combined_output(&output).contains("siteplan result t-slow"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_service_flag_works_without_config() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    mount_task(&server, "t-adhoc", "processing").await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "plain", "--service", &server.uri(), "status", "t-adhoc"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "running");
}

// ── Status / result ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_unknown_task_exit_code() {
    let (server, home) = setup().await;
    Mock::given(method("GET"))
        .and(path("/status/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown task"))
        .mount(&server)
        .await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["status", "ghost"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("ghost"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_reports_failure_message() {
    let (server, home) = setup().await;
    Mock::given(method("GET"))
        .and(path("/status/t-9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "failed", "error": "out of memory" })),
        )
        .mount(&server)
        .await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "json", "status", "t-9"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["state"], "failed");
    assert_eq!(view["error"], "out of memory");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_result_wait_on_expired_task_exits_not_found() {
    let (server, home) = setup().await;
    Mock::given(method("GET"))
        .and(path("/status/t-expired"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Task not found"))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["result", "t-expired", "--wait", "-f"])
        .arg(home.path().join("x.tif"))
        .timeout(std::time::Duration::from_secs(20));
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(!home.path().join("x.tif").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_result_not_ready_suggests_wait() {
    let (server, home) = setup().await;
    mount_task(&server, "t-run", "processing").await;

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["result", "t-run", "-f"]).arg(home.path().join("x.tif"));
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("--wait"));
    assert!(!home.path().join("x.tif").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_result_downloads_completed_task() {
    let (server, home) = setup().await;
    mount_task(&server, "t-done", "completed").await;
    let target = home.path().join("nested/coverage.tif");

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["-o", "plain", "result", "t-done", "--wait", "-f"])
        .arg(&target);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(std::fs::read(&target).unwrap(), TIFF);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_result_rejects_non_tiff_payload() {
    let (server, home) = setup().await;
    Mock::given(method("GET"))
        .and(path("/status/t-html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "completed" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result/t-html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;
    let target = home.path().join("bad.tif");

    let mut cmd = siteplan_cmd(home.path());
    cmd.args(["result", "t-html", "-f"]).arg(&target);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("not a TIFF"));
    assert!(!target.exists());
}
