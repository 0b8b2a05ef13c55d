//! End-to-end tests driving the `lw` binary.
//!
//! Every command runs in a fresh process, so these also cover restoring the
//! running clock and the open session between invocations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::sleep;
use std::time::Duration;

use tempfile::TempDir;

fn lw_binary() -> String {
    env!("CARGO_BIN_EXE_lw").to_string()
}

fn db_path(temp: &Path) -> PathBuf {
    temp.join("data").join("lw.db")
}

fn command(temp: &Path) -> Command {
    let mut cmd = Command::new(lw_binary());
    cmd.env("HOME", temp)
        .env("LW_DATABASE_PATH", db_path(temp))
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("RUST_LOG");
    cmd
}

fn lw(temp: &Path, args: &[&str]) -> String {
    let output = command(temp).args(args).output().expect("failed to run lw");
    assert_success(&output, args);
    String::from_utf8(output.stdout).unwrap()
}

fn lw_with_input(temp: &Path, args: &[&str], input: &str) -> String {
    let mut child = command(temp)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn lw");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_success(&output, args);
    String::from_utf8(output.stdout).unwrap()
}

fn assert_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "lw {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn history_json(temp: &Path) -> serde_json::Value {
    serde_json::from_str(&lw(temp, &["history", "--json"])).unwrap()
}

#[test]
fn test_lap_and_stop_across_processes() {
    let temp = TempDir::new().unwrap();

    let started = lw(temp.path(), &["start"]);
    assert!(started.starts_with("Started (session "), "{started}");

    sleep(Duration::from_millis(30));
    let lap = lw(temp.path(), &["lap"]);
    assert!(lap.starts_with("Lap 1  "), "{lap}");

    sleep(Duration::from_millis(30));
    let stopped = lw(temp.path(), &["stop"]);
    assert!(stopped.contains("Run recorded (2 laps)"), "{stopped}");

    let history = history_json(temp.path());
    let sessions = history.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    let runs = sessions[0]["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);

    let laps = runs[0]["laps"].as_array().unwrap();
    assert_eq!(laps.len(), 2);
    assert_eq!(laps[0]["label"], "End");
    assert_eq!(laps[1]["label"], "Lap 1");
    assert!(laps[0]["duration"].as_u64().unwrap() > laps[1]["duration"].as_u64().unwrap());
}

#[test]
fn test_status_follows_the_clock() {
    let temp = TempDir::new().unwrap();

    let idle = lw(temp.path(), &["status"]);
    assert!(idle.contains("State:    idle"), "{idle}");
    assert!(idle.contains("Session:  none"), "{idle}");

    lw(temp.path(), &["start"]);
    let running: serde_json::Value =
        serde_json::from_str(&lw(temp.path(), &["status", "--json"])).unwrap();
    assert_eq!(running["state"], "running");
    assert!(running["open_session_id"].is_string());

    sleep(Duration::from_millis(20));
    lw(temp.path(), &["stop"]);
    let paused: serde_json::Value =
        serde_json::from_str(&lw(temp.path(), &["status", "--json"])).unwrap();
    assert_eq!(paused["state"], "paused");
    assert_eq!(paused["open_session_runs"], 1);

    lw(temp.path(), &["end-session"]);
    let ended = lw(temp.path(), &["status"]);
    assert!(ended.contains("State:    idle"), "{ended}");
    assert!(ended.contains("History:  1 session, 1 run, 1 lap"), "{ended}");
}

#[test]
fn test_clear_asks_before_deleting() {
    let temp = TempDir::new().unwrap();

    lw(temp.path(), &["start"]);
    sleep(Duration::from_millis(20));
    lw(temp.path(), &["stop"]);

    let declined = lw_with_input(temp.path(), &["clear"], "n\n");
    assert!(declined.ends_with("Aborted\n"), "{declined}");
    assert_eq!(history_json(temp.path()).as_array().unwrap().len(), 1);

    let cleared = lw(temp.path(), &["clear", "--yes"]);
    assert_eq!(cleared, "History cleared\n");
    assert_eq!(history_json(temp.path()), serde_json::json!([]));
}

#[test]
fn test_corrupt_history_reads_as_empty() {
    let temp = TempDir::new().unwrap();
    let path = db_path(temp.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    {
        let mut store = lw_db::SqliteStore::open(&path).unwrap();
        store.set_value("lapwatch_history_v1", "{not json").unwrap();
    }

    assert_eq!(history_json(temp.path()), serde_json::json!([]));

    lw(temp.path(), &["start"]);
    sleep(Duration::from_millis(20));
    lw(temp.path(), &["stop"]);
    assert_eq!(history_json(temp.path()).as_array().unwrap().len(), 1);
}

#[test]
fn test_delete_unknown_session_fails() {
    let temp = TempDir::new().unwrap();

    let output = command(temp.path())
        .args(["delete-session", "missing", "--yes"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("session not found"));
}
