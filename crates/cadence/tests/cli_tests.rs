//! CLI integration tests.
//!
//! These tests run the cadence binary against histories saved in temporary
//! project directories.

use std::path::Path;
use std::process::{Command, Output};

use cadence_test_utils::{ItemBuilder, TempHistoryStore, TestProject};
use cadence_vcs::{persist, RevisionId, VcsConfig, VersionControl};
use serde_json::{json, Value};

fn cadence(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cadence"))
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute command")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Failed to parse JSON output")
}

/// Save a history with two commits on one branch and return their ids.
async fn seed_history(temp: &TempHistoryStore) -> (RevisionId, RevisionId) {
    let project = TestProject::shared();
    let mut vcs = VersionControl::new(project.clone(), VcsConfig::default());

    project.add(ItemBuilder::piano_track(1).aspect("notes", json!([60])).build());
    vcs.rebuild_diff_synchronously();
    let diff = vcs.diff();
    let first = vcs.commit(&diff.select_all(), "Add piano").unwrap();

    project.add(ItemBuilder::pattern(2).aspect("clips", json!([[0, 4]])).build());
    vcs.mark_changed();
    vcs.rebuild_diff_synchronously();
    let diff = vcs.diff();
    let second = vcs.commit(&diff.select_all(), "Add pattern").unwrap();

    persist::save(temp.store(), "default", &vcs).await.unwrap();
    (first.id(), second.id())
}

#[test]
fn test_version_command() {
    let temp = TempHistoryStore::new();
    let output = cadence(temp.path(), &["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cadence"));
}

#[test]
fn test_help_command() {
    let temp = TempHistoryStore::new();
    let output = cadence(temp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("stash"));
    assert!(stdout.contains("sync"));
}

/// Test that commands on a project without history fail with a hint.
#[test]
fn test_missing_history() {
    let temp = TempHistoryStore::new();
    let output = cadence(temp.path(), &["log"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cadence init"));
}

/// Test that init creates a root-only history exactly once.
#[test]
fn test_init_creates_history() {
    let temp = TempHistoryStore::new();

    let output = cadence(temp.path(), &["init"]);
    assert!(output.status.success());
    assert!(temp.path().join(".cadence/default/history.json").exists());

    let stats = stdout_json(&cadence(temp.path(), &["--json", "stats"]));
    assert_eq!(stats["revisions"], 1);
    assert_eq!(stats["deltas"], 0);

    let again = cadence(temp.path(), &["init"]);
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("already exists"));
}

/// Test that the log lists the head branch newest first.
#[tokio::test]
async fn test_log_lists_branch() {
    let temp = TempHistoryStore::new();
    let (first, second) = seed_history(&temp).await;

    let log = stdout_json(&cadence(temp.path(), &["--json", "log"]));
    let messages: Vec<&str> = log
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["Add pattern", "Add piano", "Project started"]);
    assert_eq!(log[0]["id"], json!(second));
    assert_eq!(log[1]["id"], json!(first));
}

/// Test that moving the head by id prefix rewrites the saved snapshot.
#[tokio::test]
async fn test_head_moves_and_persists() {
    let temp = TempHistoryStore::new();
    let (first, _) = seed_history(&temp).await;

    let prefix = first.short();
    let output = cadence(temp.path(), &["head", &prefix]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let snapshot = stdout_json(&cadence(temp.path(), &["--json", "snapshot"]));
    let items = snapshot["snapshot"].as_array().unwrap();
    assert_eq!(items.len(), 1);

    let document = persist::load_document(temp.store(), "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.head_revision_id, first);
}

/// Test that unknown revisions are rejected.
#[tokio::test]
async fn test_show_unknown_revision() {
    let temp = TempHistoryStore::new();
    seed_history(&temp).await;

    let output = cadence(temp.path(), &["show", &RevisionId::new().to_string()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

/// Test that marking a revision pushed moves it out of the push list.
#[tokio::test]
async fn test_sync_push_and_mark() {
    let temp = TempHistoryStore::new();
    let (first, second) = seed_history(&temp).await;

    let pending = stdout_json(&cadence(temp.path(), &["--json", "sync", "push"]));
    assert_eq!(pending.as_array().unwrap().len(), 3);

    let id = first.to_string();
    assert!(cadence(temp.path(), &["sync", "mark-pushed", &id]).status.success());

    let pending = stdout_json(&cadence(temp.path(), &["--json", "sync", "push"]));
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0], json!(second));

    let status = stdout_json(&cadence(temp.path(), &["--json", "sync", "status"]));
    assert_eq!(status["full_sync"], 1);
    assert_eq!(status["cached_revisions"], 1);
}

/// Test that a recorded remote listing replaces the cache.
#[tokio::test]
async fn test_sync_record_listing() {
    let temp = TempHistoryStore::new();
    let (first, second) = seed_history(&temp).await;

    let listing = temp.path().join("remote.json");
    std::fs::write(
        &listing,
        serde_json::to_string(&json!([
            { "id": first, "timestamp": 1_700_000_000_000_i64 },
            { "id": second, "timestamp": 1_700_000_100_000_i64 },
        ]))
        .unwrap(),
    )
    .unwrap();

    let output = cadence(temp.path(), &["sync", "record", listing.to_str().unwrap()]);
    assert!(output.status.success());

    let status = stdout_json(&cadence(temp.path(), &["--json", "sync", "status"]));
    assert_eq!(status["full_sync"], 2);
    assert_eq!(status["no_sync"], 1);
    assert_eq!(status["outdated"], false);
}

/// Test that an empty stash list prints a notice.
#[tokio::test]
async fn test_stash_list_empty() {
    let temp = TempHistoryStore::new();
    seed_history(&temp).await;

    let output = cadence(temp.path(), &["stash", "list"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No stashes."));
}
