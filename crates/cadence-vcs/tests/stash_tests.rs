//! Stash integration tests.
//!
//! Named stashes, the quick-stash slot and their round trips through the
//! live project.

use std::sync::Arc;

use cadence_test_utils::assertions::assert_diff_kinds;
use cadence_test_utils::{ItemBuilder, TestProject};
use cadence_vcs::{ChangeKind, VcsConfig, VcsError, VersionControl};
use serde_json::json;
use uuid::Uuid;

/// A project with two committed items, one edited, one deleted and one new.
fn dirty_project() -> (Arc<TestProject>, VersionControl) {
    let project = TestProject::shared();
    let mut vcs = VersionControl::new(project.clone(), VcsConfig::default());

    project.add(
        ItemBuilder::piano_track(1)
            .aspect("notes", json!([60]))
            .aspect("instrument", json!("piano"))
            .build(),
    );
    project.add(ItemBuilder::pattern(2).aspect("clips", json!([[0, 8]])).build());
    vcs.rebuild_diff_synchronously();
    let diff = vcs.diff();
    vcs.commit(&diff.select_all(), "Base").expect("Failed to commit");

    project.item(Uuid::from_u128(1)).unwrap().set("notes", json!([60, 67]));
    project.remove(Uuid::from_u128(2));
    project.add(ItemBuilder::automation_track(3).aspect("events", json!([0.25])).build());
    vcs.mark_changed();
    vcs.rebuild_diff_synchronously();
    (project, vcs)
}

fn expected_changes() -> Vec<(Uuid, ChangeKind)> {
    vec![
        (Uuid::from_u128(1), ChangeKind::Changed),
        (Uuid::from_u128(2), ChangeKind::Removed),
        (Uuid::from_u128(3), ChangeKind::Added),
    ]
}

/// Test that stashing everything and applying it back restores the project.
#[test]
fn test_stash_round_trip() {
    let (project, mut vcs) = dirty_project();
    let before = project.content();
    assert_diff_kinds(&vcs.diff(), &expected_changes());

    let diff = vcs.diff();
    let stash = vcs.stash(&diff.select_all(), "Work in progress", false).unwrap();
    assert_eq!(vcs.stashes().num_user_stashes(), 1);

    vcs.rebuild_diff_synchronously();
    assert!(vcs.diff().is_empty());
    assert_ne!(project.content(), before);

    vcs.apply_stash(stash.id(), false).unwrap();
    assert_eq!(project.content(), before);
    assert_eq!(vcs.stashes().num_user_stashes(), 0);

    vcs.rebuild_diff_synchronously();
    assert_diff_kinds(&vcs.diff(), &expected_changes());
}

/// Test that keep flags leave the live project and the stash list alone.
#[test]
fn test_stash_keep_flags() {
    let (project, mut vcs) = dirty_project();
    let before = project.content();

    let diff = vcs.diff();
    let first = diff.position(Uuid::from_u128(1)).unwrap();
    vcs.stash(&diff.select([first]), "Notes", true).unwrap();
    assert_eq!(project.content(), before);

    vcs.apply_stash_with_name("Notes", true).unwrap();
    assert_eq!(project.content(), before);
    assert_eq!(vcs.stashes().num_user_stashes(), 1);

    assert!(matches!(
        vcs.apply_stash_with_name("Drums", false),
        Err(VcsError::StashNotFound(name)) if name == "Drums"
    ));
}

/// Test that dropping a stash removes it without touching the project.
#[test]
fn test_drop_stash() {
    let (project, mut vcs) = dirty_project();
    let diff = vcs.diff();
    let stash = vcs.stash(&diff.select_all(), "Scratch", false).unwrap();
    let stashed = project.content();

    let dropped = vcs.drop_stash(stash.id()).unwrap();
    assert_eq!(dropped.id(), stash.id());
    assert_eq!(vcs.stashes().num_user_stashes(), 0);
    assert_eq!(project.content(), stashed);

    assert!(matches!(
        vcs.drop_stash(stash.id()),
        Err(VcsError::StashNotFound(_))
    ));
}

/// Test that a stash with a stale selection changes nothing.
#[test]
fn test_stash_with_stale_selection_fails_cleanly() {
    let (project, mut vcs) = dirty_project();
    let old = vcs.diff();
    vcs.rebuild_diff_synchronously();
    let before = project.content();

    let err = vcs.stash(&old.select_all(), "Stale", false).unwrap_err();
    assert!(matches!(err, VcsError::StaleSelection { .. }));
    assert_eq!(vcs.stashes().num_user_stashes(), 0);
    assert_eq!(project.content(), before);
}

/// Test the quick-stash slot: store, refuse a second store, restore.
#[test]
fn test_quick_stash_cycle() {
    let (project, mut vcs) = dirty_project();
    let before = project.content();
    let snapshot = vcs.head().snapshot();

    vcs.quick_stash_all().unwrap();
    assert!(vcs.has_quick_stash());
    vcs.rebuild_diff_synchronously();
    assert!(vcs.diff().is_empty());

    assert!(matches!(vcs.quick_stash_all(), Err(VcsError::QuickStashOccupied)));

    vcs.restore_quick_stash().unwrap();
    assert!(!vcs.has_quick_stash());
    assert_eq!(project.content(), before);
    assert_eq!(vcs.head().snapshot(), snapshot);

    vcs.rebuild_diff_synchronously();
    assert_diff_kinds(&vcs.diff(), &expected_changes());

    assert!(matches!(vcs.restore_quick_stash(), Err(VcsError::NoQuickStash)));
}

/// Test that a clean stage has nothing to quick-stash.
#[test]
fn test_quick_stash_requires_changes() {
    let project = TestProject::shared();
    let mut vcs = VersionControl::new(project.clone(), VcsConfig::default());
    vcs.rebuild_diff_synchronously();
    assert!(matches!(vcs.quick_stash_all(), Err(VcsError::NothingToStash)));
}

/// Test that toggling stashes a dirty stage and restores onto a clean one.
#[test]
fn test_toggle_quick_stash() {
    let (project, mut vcs) = dirty_project();
    let before = project.content();

    vcs.toggle_quick_stash().unwrap();
    assert!(vcs.has_quick_stash());

    vcs.rebuild_diff_synchronously();
    vcs.toggle_quick_stash().unwrap();
    assert!(!vcs.has_quick_stash());
    assert_eq!(project.content(), before);

    vcs.rebuild_diff_synchronously();
    vcs.reset_all_changes().unwrap();
    vcs.rebuild_diff_synchronously();
    assert!(matches!(vcs.toggle_quick_stash(), Err(VcsError::NothingToStash)));
}

/// Test that nothing is stashed or committed from a diff that has not been
/// fully computed.
#[test]
fn test_incomplete_diff_is_rejected() {
    let (project, mut vcs) = dirty_project();
    project.add(ItemBuilder::piano_track(4).build());
    vcs.mark_changed();
    let heading = vcs.heading_revision().id();
    vcs.move_head(heading).unwrap();
    let before = project.content();

    let partial = vcs.diff();
    assert!(!partial.is_complete());
    assert!(matches!(
        vcs.quick_stash_all(),
        Err(VcsError::IncompleteDiff { .. })
    ));
    assert!(!vcs.has_quick_stash());
    assert!(matches!(
        vcs.commit(&partial.select([0]), "Partial"),
        Err(VcsError::IncompleteDiff { .. })
    ));
    assert_eq!(project.content(), before);

    vcs.rebuild_diff_synchronously();
    vcs.quick_stash_all().unwrap();
    assert!(vcs.has_quick_stash());
}
