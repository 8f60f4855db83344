//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary JAPA_HOME.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_japa"))
        .args(args)
        .env("JAPA_HOME", home)
        .env_remove("JAPA_ENV")
        .env_remove("JAPA_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_tap_and_status() {
    let home = TempDir::new().unwrap();
    run_json(home.path(), &["tap"]);
    let tapped = run_json(home.path(), &["tap", "--count", "4"]);
    assert_eq!(tapped["status"]["today_count"], 5);

    let status = run_json(home.path(), &["status"]);
    assert_eq!(status["today_count"], 5);
    assert_eq!(status["total_count"], 5);
    assert_eq!(status["streak_days"], 1);
    assert!(status["signed_in_as"].is_null());
}

#[test]
fn test_tap_mala_reports_milestone() {
    let home = TempDir::new().unwrap();
    let tapped = run_json(home.path(), &["tap", "--count", "108"]);

    let events = tapped["events"].as_array().unwrap();
    let messages: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "MilestoneReached")
        .filter_map(|e| e["message"].as_str())
        .collect();
    assert!(messages.iter().any(|m| m.contains("Mala completed")));
    assert!(events
        .iter()
        .any(|e| e["type"] == "AchievementUnlocked" && e["achievement"] == "MalaCompleted"));
    assert_eq!(tapped["status"]["malas_today"], 1);
}

#[test]
fn test_tap_rejects_zero() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["tap", "--count", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_reset_requires_confirmation() {
    let home = TempDir::new().unwrap();
    run_json(home.path(), &["tap", "--count", "12"]);

    let (_, _, code) = run_cli(home.path(), &["reset"]);
    assert_eq!(code, 1);
    assert_eq!(run_json(home.path(), &["status"])["total_count"], 12);

    let events = run_json(home.path(), &["reset", "--yes"]);
    assert_eq!(events[0]["type"], "CountersReset");
    let status = run_json(home.path(), &["status"]);
    assert_eq!(status["total_count"], 0);
    assert_eq!(status["achievements"], serde_json::json!([]));
}

#[test]
fn test_ack_without_pending_milestone() {
    let home = TempDir::new().unwrap();
    let ack = run_json(home.path(), &["ack"]);
    assert!(ack.is_null());
}

#[test]
fn test_history_views() {
    let home = TempDir::new().unwrap();
    run_json(home.path(), &["tap", "--count", "25"]);

    let summary = run_json(home.path(), &["history", "summary"]);
    assert_eq!(summary["active_days"], 1);
    assert_eq!(summary["best_day"]["count"], 25);
    assert_eq!(summary["best_day"]["intensity"], "moderate");

    let day = run_json(home.path(), &["history", "day", "2001-01-01"]);
    assert_eq!(day["count"], 0);
    assert_eq!(day["intensity"], "none");

    let month = run_json(home.path(), &["history", "month", "2024-02"]);
    assert_eq!(month.as_array().unwrap().len(), 29);

    let (_, _, code) = run_cli(home.path(), &["history", "month", "2024-13"]);
    assert_eq!(code, 1);
}

#[test]
fn test_prefs_persist() {
    let home = TempDir::new().unwrap();
    let prefs = run_json(home.path(), &["prefs", "show"]);
    assert_eq!(prefs["language"], "hindi");

    run_json(home.path(), &["prefs", "language", "english"]);
    run_json(home.path(), &["prefs", "theme", "#B3E5FC,#E1F5FE"]);
    let prefs = run_json(home.path(), &["prefs", "show"]);
    assert_eq!(prefs["language"], "english");
    assert_eq!(prefs["background_theme"], serde_json::json!(["#B3E5FC", "#E1F5FE"]));

    let (_, _, code) = run_cli(home.path(), &["prefs", "language", "latin"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "sync.collection"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "users");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "sync.leaderboard_poll_secs", "30"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "sync.leaderboard_poll_secs"]);
    assert_eq!(stdout.trim(), "30");

    let (_, _, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_auth_status_signed_out() {
    let home = TempDir::new().unwrap();
    let status = run_json(home.path(), &["auth", "status"]);
    assert_eq!(status["signed_in"], false);

    let (_, stderr, code) = run_cli(home.path(), &["auth", "logout"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not signed in"));
}

#[test]
fn test_sync_requires_configuration() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["sync", "push"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("disabled"));

    let (_, _, code) = run_cli(home.path(), &["leaderboard"]);
    assert_eq!(code, 1);
}
