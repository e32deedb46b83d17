//! Assertion helpers for version-control tests.

use std::thread;
use std::time::{Duration, Instant};

use cadence_vcs::{ChangeKind, VersionControl, WorkingDiff};
use uuid::Uuid;

/// Poll `condition` until it holds or `timeout` elapses. Returns whether it
/// held.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// Wait for background diff work to settle on a complete, current diff.
pub fn wait_for_diff(vcs: &VersionControl, timeout: Duration) {
    let settled = wait_until(timeout, || {
        let head = vcs.head();
        !head.is_rebuilding_diff() && !head.is_diff_outdated() && head.diff().is_complete()
    });
    assert!(settled, "working diff did not settle within {:?}", timeout);
}

/// Assert a diff holds exactly these records, in any order.
pub fn assert_diff_kinds(diff: &WorkingDiff, expected: &[(Uuid, ChangeKind)]) {
    let mut actual: Vec<(Uuid, ChangeKind)> = diff
        .items()
        .iter()
        .map(|item| (item.uuid(), item.kind()))
        .collect();
    let mut expected = expected.to_vec();
    actual.sort_by_key(|(uuid, kind)| (*uuid, kind.as_str()));
    expected.sort_by_key(|(uuid, kind)| (*uuid, kind.as_str()));

    assert_eq!(
        actual, expected,
        "working diff records do not match.\nExpected: {:?}\nActual: {:?}",
        expected, actual
    );
}

/// Assert that two JSON values are equal, with a line diff of their pretty
/// forms on failure.
pub fn assert_json_equal(actual: &serde_json::Value, expected: &serde_json::Value) {
    if actual != expected {
        let actual = serde_json::to_string_pretty(actual).unwrap_or_default();
        let expected = serde_json::to_string_pretty(expected).unwrap_or_default();
        let diff = similar::TextDiff::from_lines(&expected, &actual);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{}{}", sign, change));
        }

        panic!("JSON values differ:\n{}", output);
    }
}
