// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

//! End-to-end tests of the `critiq` binary.
//!
//! Every invocation clears the environment so ambient CRITIQ_* variables
//! and user config files cannot leak into assertions.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─── Test helpers ────────────────────────────────────────────────────────────

/// Lay out a minimal reviewable submission in `root`.
fn write_fixtures(root: &Path) {
    let submission = root.join("submission");
    fs::create_dir_all(&submission).unwrap();
    fs::write(
        submission.join("app.py"),
        "def handler(event):\n    return {\"ok\": True}\n",
    )
    .unwrap();
    fs::write(root.join("report.json"), r#"{"total": 0, "issues": []}"#).unwrap();
    fs::write(root.join("spec.md"), "Build an event handler.\n").unwrap();
    fs::write(
        root.join("scorecard.json"),
        r#"[{"question": "Is the handler tested?", "category": "general", "weight": 1.0}]"#,
    )
    .unwrap();
}

fn critiq() -> Command {
    let mut cmd = Command::cargo_bin("critiq").unwrap();
    cmd.env_clear();
    cmd
}

// ─── Argument surface ────────────────────────────────────────────────────────

#[test]
fn help_lists_review_flags() {
    critiq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--submission"))
        .stdout(predicate::str::contains("--tech-stack"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn missing_submission_fails_fast() {
    critiq()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required input"))
        .stderr(predicate::str::contains("submission"));
}

#[test]
fn completions_name_the_binary() {
    critiq()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("critiq"));
}

// ─── Configuration plumbing ──────────────────────────────────────────────────

#[test]
fn config_subcommand_prints_settings() {
    critiq()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend: ollama"))
        .stdout(predicate::str::contains("max_attempts: 3"));
}

#[test]
fn environment_overrides_reach_the_config() {
    critiq()
        .env("CRITIQ_MAX_CONCURRENCY", "8")
        .env("CRITIQ_SCORING__SECURITY_PENALTY", "10.0")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Max concurrency: 8"))
        .stdout(predicate::str::contains("security_penalty: 10"));
}

#[test]
fn invalid_environment_value_is_rejected() {
    critiq()
        .env("CRITIQ_MAX_CONCURRENCY", "0")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrency"));
}

// ─── Backend reachability ────────────────────────────────────────────────────

#[test]
fn unreachable_ollama_fails_before_review() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    critiq()
        .env("CRITIQ_OLLAMA_HOST", "http://127.0.0.1:1")
        .current_dir(dir.path())
        .args([
            "--submission",
            "submission",
            "--report",
            "report.json",
            "--spec",
            "spec.md",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ollama"));
}

#[test]
fn doctor_reports_but_does_not_fail_when_backend_is_down() {
    critiq()
        .env("CRITIQ_OLLAMA_HOST", "http://127.0.0.1:1")
        .arg("doctor")
        .assert()
        .success()
        .stderr(predicate::str::contains("NOT RUNNING"));
}

// ─── Degraded review run ─────────────────────────────────────────────────────

/// With every chat call failing, the run still completes: analysis tasks
/// fall back to their defaults and only the security dimension (no
/// findings collected) keeps the total above zero.
#[tokio::test(flavor = "multi_thread")]
async fn degraded_run_still_produces_a_report() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "qwen3:4b"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let uri = server.uri();
    let cwd = dir.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        critiq()
            .env("CRITIQ_OLLAMA_HOST", &uri)
            .env("CRITIQ_RETRY__MAX_ATTEMPTS", "1")
            .env("CRITIQ_RETRY__BASE_DELAY_MS", "1")
            .env("CRITIQ_RETRY__MAX_DELAY_MS", "2")
            .current_dir(&cwd)
            .args([
                "--submission",
                "submission",
                "--report",
                "report.json",
                "--spec",
                "spec.md",
                "--scorecard",
                "scorecard.json",
                "--dry-run",
            ])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains(r#""valid": true"#))
        .stdout(predicate::str::contains(r#""total": 25.0"#));

    // --dry-run prints to stdout and must not leave a report file behind.
    assert!(!dir.path().join("review.json").exists());
}
