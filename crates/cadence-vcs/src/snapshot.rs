//! Reconstructed project state.
//!
//! A [`Snapshot`] maps item identity to the net effect of every delta
//! applied along a root-to-revision path. [`Snapshot::apply`] is the only
//! state-transition function in the system.

use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::item::{ChangeKind, RevisionItem};
use crate::revision::Revision;

/// Item state at some revision, at most one entry per uuid.
///
/// Entries are ordered by uuid so that two replays of the same path are
/// identical, iteration order included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    items: BTreeMap<Uuid, RevisionItem>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a root-to-target path from scratch.
    pub fn replay(path: &[Arc<Revision>]) -> Self {
        let mut snapshot = Self::new();
        for revision in path {
            snapshot.apply_revision(revision);
        }
        snapshot
    }

    /// Apply one record:
    /// - `Added` inserts, overwriting any existing entry
    /// - `Removed` erases, a no-op when absent
    /// - `Changed` merges into the existing entry under its merge policy,
    ///   or is inserted as `Added` when there is none
    pub fn apply(&mut self, item: &RevisionItem) {
        match item.kind() {
            ChangeKind::Added => {
                self.items.insert(item.uuid(), item.clone());
            }
            ChangeKind::Removed => {
                self.items.remove(&item.uuid());
            }
            ChangeKind::Changed => {
                let merged = match self.items.get(&item.uuid()) {
                    Some(existing) => existing.merged_with(item),
                    None => item.as_added(),
                };
                self.items.insert(item.uuid(), merged);
            }
        }
    }

    pub fn apply_revision(&mut self, revision: &Revision) {
        for item in revision.items() {
            self.apply(item);
        }
    }

    pub fn get(&self, uuid: Uuid) -> Option<&RevisionItem> {
        self.items.get(&uuid)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.items.contains_key(&uuid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RevisionItem> {
        self.items.values()
    }

    pub fn uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items.keys().copied()
    }

    /// Build from persisted entries, trusted as already merged. Entries
    /// stored as `Changed` are read back as `Added`.
    pub fn from_items(items: impl IntoIterator<Item = RevisionItem>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| match item.kind() {
                    ChangeKind::Changed => (item.uuid(), item.as_added()),
                    _ => (item.uuid(), item),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Delta, DiffLogicType};
    use crate::revision::RevisionBuilder;
    use serde_json::json;

    fn record(kind: ChangeKind, n: u128, notes: serde_json::Value) -> RevisionItem {
        RevisionItem::new(
            kind,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(n),
            vec![Delta::new("notes", notes)],
        )
    }

    #[test]
    fn test_added_then_changed_keeps_added_status() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(&record(ChangeKind::Added, 1, json!([60])));
        snapshot.apply(&record(ChangeKind::Changed, 1, json!([60, 64])));

        let entry = snapshot.get(Uuid::from_u128(1)).unwrap();
        assert_eq!(entry.kind(), ChangeKind::Added);
        assert_eq!(entry.delta("notes").unwrap().data, json!([60, 64]));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_added_twice_overwrites() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(&record(ChangeKind::Added, 1, json!([60])));
        snapshot.apply(&record(ChangeKind::Added, 1, json!([72])));
        assert_eq!(
            snapshot.get(Uuid::from_u128(1)).unwrap().delta("notes").unwrap().data,
            json!([72])
        );
    }

    #[test]
    fn test_removed_is_idempotent() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(&record(ChangeKind::Added, 1, json!([60])));
        snapshot.apply(&record(ChangeKind::Added, 2, json!([62])));

        let removal = RevisionItem::removed(&record(ChangeKind::Added, 1, json!(null)));
        snapshot.apply(&removal);
        let once = snapshot.clone();
        snapshot.apply(&removal);
        assert_eq!(snapshot, once);
        assert!(!snapshot.contains(Uuid::from_u128(1)));

        let mut empty = Snapshot::new();
        empty.apply(&removal);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_changed_without_entry_is_inserted_as_added() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(&record(ChangeKind::Changed, 5, json!([1])));

        let entry = snapshot.get(Uuid::from_u128(5)).unwrap();
        assert_eq!(entry.kind(), ChangeKind::Added);
        assert_eq!(entry.delta("notes").unwrap().data, json!([1]));
    }

    #[test]
    fn test_persisted_changed_entries_read_back_as_added() {
        let snapshot = Snapshot::from_items([record(ChangeKind::Changed, 6, json!([2]))]);
        assert_eq!(
            snapshot.get(Uuid::from_u128(6)).unwrap().kind(),
            ChangeKind::Added
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let first = Arc::new(
            RevisionBuilder::new("one")
                .with_item(record(ChangeKind::Added, 3, json!([1])))
                .with_item(record(ChangeKind::Added, 1, json!([2])))
                .build(),
        );
        let second = Arc::new(
            RevisionBuilder::new("two")
                .with_item(record(ChangeKind::Changed, 3, json!([1, 2])))
                .with_item(RevisionItem::removed(&record(ChangeKind::Added, 1, json!(null))))
                .build(),
        );
        let path = vec![first, second];

        let a = Snapshot::replay(&path);
        let b = Snapshot::replay(&path);
        assert_eq!(a, b);
        assert_eq!(a.uuids().collect::<Vec<_>>(), vec![Uuid::from_u128(3)]);
    }
}
