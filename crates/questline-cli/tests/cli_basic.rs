//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a fresh temporary
//! directory, so config and the local database never touch the real ones.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_questline-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("QUESTLINE_ENV")
        .env_remove("QUESTLINE_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

#[test]
fn test_help() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("sync"));
    assert!(stdout.contains("lesson"));
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "sync.max_attempts"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "sync.debounce_ms", "500"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "sync.debounce_ms"]);
    assert_eq!(stdout.trim(), "500");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "nope.nothing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_one_section_masks_api_key() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "remote.api_key", "tok-123"]);
    let (code, stdout, _) = run_cli(home.path(), &["config", "list", "remote", "--json"]);
    assert_eq!(code, 0);
    let values = json(&stdout);
    assert_eq!(values["remote.api_key"], "********");
    assert!(values.get("sync.max_attempts").is_none());
    assert!(!stdout.contains("tok-123"));
}

#[test]
fn test_config_reset_single_section() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "sync.debounce_ms", "500"]);
    run_cli(home.path(), &["config", "set", "storage.namespace", "alt"]);
    let (code, _, _) = run_cli(home.path(), &["config", "reset", "sync"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "sync.debounce_ms"]);
    assert_eq!(stdout.trim(), "2000");
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "storage.namespace"]);
    assert_eq!(stdout.trim(), "alt");
}

#[test]
fn test_config_sections_and_unknown_section() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "sections"]);
    assert_eq!(code, 0);
    for section in ["remote", "sync", "rewards", "storage"] {
        assert!(stdout.contains(section));
    }
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "theme.color", "dark"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("sections: remote, sync, rewards, storage"));
}

#[test]
fn test_progress_show_json_for_new_learner() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["progress", "show", "--json"]);
    assert_eq!(code, 0);
    let summary = json(&stdout);
    assert_eq!(summary["xp"], 0);
    assert_eq!(summary["level"], 1);
    assert!(summary["learner"].as_str().unwrap().starts_with("learner-"));
}

#[test]
fn test_lesson_complete_persists_between_runs() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["lesson", "complete", "l1", "--json"]);
    assert_eq!(code, 0);
    let result = json(&stdout);
    assert_eq!(result["xp_awarded"], 100);
    assert_eq!(result["new_achievements"][0], "first_lesson");

    // Second completion of the same lesson earns nothing.
    let (_, stdout, _) = run_cli(home.path(), &["lesson", "complete", "l1", "--json"]);
    assert_eq!(json(&stdout)["xp_awarded"], 0);

    let (_, stdout, _) = run_cli(home.path(), &["progress", "show", "--json"]);
    assert_eq!(json(&stdout)["xp"], 100);
}

#[test]
fn test_habit_add_and_toggle() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["habit", "add", "Read", "--json"]);
    assert_eq!(code, 0);
    let id = json(&stdout)["id"].as_str().unwrap().to_string();

    let (code, _, _) = run_cli(home.path(), &["habit", "toggle", &id]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(home.path(), &["progress", "show", "--json"]);
    assert_eq!(json(&stdout)["habits"][0]["streak"], 1);
}

#[test]
fn test_toggle_unknown_habit_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["habit", "toggle", "habit-missing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_question_reward_is_rate_limited() {
    let home = tempfile::tempdir().unwrap();
    let mut total = 0;
    for _ in 0..4 {
        let (code, stdout, _) = run_cli(home.path(), &["reward", "ask", "l1", "--json"]);
        assert_eq!(code, 0);
        total += json(&stdout)["xp_awarded"].as_u64().unwrap();
    }
    assert_eq!(total, 30);
}

#[test]
fn test_sync_run_without_remote_keeps_local() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["sync", "run", "--json"]);
    assert_eq!(code, 0);
    let report = json(&stdout);
    assert_eq!(report["skipped"], false);
    assert_eq!(report["outcomes"]["modules"]["outcome"], "kept_local");
    assert_eq!(report["outcomes"]["modules"]["reason"], "not_configured");
}

#[test]
fn test_reset_requires_confirmation() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["progress", "reset"]);
    assert_eq!(code, 1);
    let (code, _, _) = run_cli(home.path(), &["progress", "reset", "--yes"]);
    assert_eq!(code, 0);
}

#[test]
fn test_achievements_json_lists_all_badges() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["achievements", "--json"]);
    assert_eq!(code, 0);
    let badges = json(&stdout);
    assert_eq!(badges.as_array().unwrap().len(), 12);
    assert_eq!(badges[0]["id"], "first_lesson");
    assert_eq!(badges[0]["unlocked"], false);
}
