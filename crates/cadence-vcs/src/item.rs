//! Delta records.
//!
//! A [`RevisionItem`] is one added/removed/changed record about a single
//! tracked item. Its payload is a list of [`Delta`]s, each holding the full
//! state of one aspect of the item ("notes", "path", "instrument", ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tracked::{Diff, TrackedItem};

/// What happened to a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Changed => "changed",
        }
    }
}

/// How a `Changed` record is folded into the accumulated state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Each incoming delta replaces the stored delta of the same kind;
    /// stored deltas of other kinds are kept.
    ComposeByDelta,
    /// The incoming delta list replaces the stored one wholesale.
    Replace,
}

/// Kind tag of a tracked item, selecting its diff and merge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffLogicType {
    ProjectInfo,
    ProjectTimeline,
    PianoTrack,
    AutomationTrack,
    Pattern,
}

impl DiffLogicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffLogicType::ProjectInfo => "project-info",
            DiffLogicType::ProjectTimeline => "project-timeline",
            DiffLogicType::PianoTrack => "piano-track",
            DiffLogicType::AutomationTrack => "automation-track",
            DiffLogicType::Pattern => "pattern",
        }
    }

    /// Pattern deltas carry the whole clip list, so they replace; every
    /// other kind records independent aspects.
    pub fn merge_policy(&self) -> MergePolicy {
        match self {
            DiffLogicType::Pattern => MergePolicy::Replace,
            DiffLogicType::ProjectInfo
            | DiffLogicType::ProjectTimeline
            | DiffLogicType::PianoTrack
            | DiffLogicType::AutomationTrack => MergePolicy::ComposeByDelta,
        }
    }

    /// Diff a live item's deltas against a recorded state.
    ///
    /// Under `ComposeByDelta` only the aspects whose data differs are
    /// emitted, plus a removal delta for each recorded aspect the live item
    /// no longer has. Under `Replace` any difference emits the full live
    /// list.
    pub fn create_diff(&self, live: &[Delta], state: &RevisionItem) -> Diff {
        let mut diff = Diff::new(*self);
        // A null live aspect counts as absent
        let differs = |delta: &Delta| match state.delta(&delta.kind) {
            Some(recorded) => recorded.data != delta.data,
            None => !delta.is_removal(),
        };

        match self.merge_policy() {
            MergePolicy::ComposeByDelta => {
                for delta in live.iter().filter(|d| differs(d)) {
                    diff.push(delta.clone());
                }
                for recorded in state.deltas() {
                    if !recorded.is_removal() && !live.iter().any(|d| d.kind == recorded.kind) {
                        diff.push(Delta::removal(recorded.kind.clone()));
                    }
                }
            }
            MergePolicy::Replace => {
                let changed =
                    live.len() != state.deltas().len() || live.iter().any(|d| differs(d));
                if changed {
                    for delta in live {
                        diff.push(delta.clone());
                    }
                }
            }
        }

        diff
    }
}

impl std::fmt::Display for DiffLogicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full state of one aspect of a tracked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Aspect name, unique within one item.
    pub kind: String,
    /// Human-readable summary shown in history views.
    #[serde(default)]
    pub description: String,
    /// Number of elementary changes summarized by this delta.
    #[serde(default)]
    pub num_changes: i64,
    /// Opaque serialized aspect state. `null` marks the aspect as removed.
    pub data: Value,
}

impl Delta {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        let kind = kind.into();
        Self {
            description: kind.clone(),
            kind,
            num_changes: 1,
            data,
        }
    }

    /// Delta recording that an aspect no longer exists on the item.
    pub fn removal(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            description: format!("{kind} removed"),
            kind,
            num_changes: 1,
            data: Value::Null,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.data.is_null()
    }

    pub fn with_description(mut self, description: impl Into<String>, num_changes: i64) -> Self {
        self.description = description.into();
        self.num_changes = num_changes;
        self
    }
}

/// A single delta record about one tracked item. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionItem {
    uuid: Uuid,
    #[serde(rename = "type")]
    kind: ChangeKind,
    logic_type: DiffLogicType,
    #[serde(default)]
    deltas: Vec<Delta>,
}

impl RevisionItem {
    pub fn new(kind: ChangeKind, logic_type: DiffLogicType, uuid: Uuid, deltas: Vec<Delta>) -> Self {
        Self {
            uuid,
            kind,
            logic_type,
            deltas,
        }
    }

    /// Record wrapping a diff produced by a live item.
    pub fn from_diff(kind: ChangeKind, uuid: Uuid, diff: Diff) -> Self {
        let logic_type = diff.logic_type();
        Self::new(kind, logic_type, uuid, diff.into_deltas())
    }

    /// `Added` record holding the full current state of a live item.
    pub fn added_from(item: &dyn TrackedItem) -> Self {
        Self::new(ChangeKind::Added, item.logic_type(), item.uuid(), item.deltas())
    }

    /// `Removed` record: identity only, no payload.
    pub fn removed(state: &RevisionItem) -> Self {
        Self::new(ChangeKind::Removed, state.logic_type, state.uuid, Vec::new())
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn logic_type(&self) -> DiffLogicType {
        self.logic_type
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn num_deltas(&self) -> usize {
        self.deltas.len()
    }

    /// Find the delta recorded for an aspect.
    pub fn delta(&self, kind: &str) -> Option<&Delta> {
        self.deltas.iter().find(|d| d.kind == kind)
    }

    /// Fold a `Changed` record into this accumulated state, keeping this
    /// record's kind. Removal deltas drop the aspect.
    pub fn merged_with(&self, changes: &RevisionItem) -> RevisionItem {
        let deltas = match self.logic_type.merge_policy() {
            MergePolicy::Replace => changes.present_deltas(),
            MergePolicy::ComposeByDelta => {
                let mut merged = self.deltas.clone();
                for incoming in &changes.deltas {
                    if incoming.is_removal() {
                        merged.retain(|d| d.kind != incoming.kind);
                        continue;
                    }
                    match merged.iter_mut().find(|d| d.kind == incoming.kind) {
                        Some(existing) => *existing = incoming.clone(),
                        None => merged.push(incoming.clone()),
                    }
                }
                merged
            }
        };

        RevisionItem::new(self.kind, self.logic_type, self.uuid, deltas)
    }

    /// This record as full item state: kind `Added`, removal deltas
    /// dropped.
    pub fn as_added(&self) -> RevisionItem {
        RevisionItem::new(
            ChangeKind::Added,
            self.logic_type,
            self.uuid,
            self.present_deltas(),
        )
    }

    fn present_deltas(&self) -> Vec<Delta> {
        self.deltas
            .iter()
            .filter(|d| !d.is_removal())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(deltas: Vec<Delta>) -> RevisionItem {
        RevisionItem::new(
            ChangeKind::Added,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(1),
            deltas,
        )
    }

    #[test]
    fn test_compose_replaces_only_matching_aspects() {
        let state = track(vec![
            Delta::new("notes", json!([60, 64])),
            Delta::new("path", json!("Piano")),
        ]);
        let changes = RevisionItem::new(
            ChangeKind::Changed,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(1),
            vec![Delta::new("notes", json!([60, 64, 67]))],
        );

        let merged = state.merged_with(&changes);
        assert_eq!(merged.kind(), ChangeKind::Added);
        assert_eq!(merged.delta("notes").unwrap().data, json!([60, 64, 67]));
        assert_eq!(merged.delta("path").unwrap().data, json!("Piano"));
    }

    #[test]
    fn test_replace_policy_drops_old_deltas() {
        let state = RevisionItem::new(
            ChangeKind::Added,
            DiffLogicType::Pattern,
            Uuid::from_u128(2),
            vec![Delta::new("clips", json!([0])), Delta::new("extra", json!(1))],
        );
        let changes = RevisionItem::new(
            ChangeKind::Changed,
            DiffLogicType::Pattern,
            Uuid::from_u128(2),
            vec![Delta::new("clips", json!([0, 16]))],
        );

        let merged = state.merged_with(&changes);
        assert_eq!(merged.num_deltas(), 1);
        assert!(merged.delta("extra").is_none());
    }

    #[test]
    fn test_compose_diff_reports_changed_aspects_only() {
        let state = track(vec![
            Delta::new("notes", json!([60])),
            Delta::new("path", json!("Piano")),
        ]);
        let live = vec![
            Delta::new("notes", json!([60, 62])),
            Delta::new("path", json!("Piano")),
        ];

        let diff = DiffLogicType::PianoTrack.create_diff(&live, &state);
        assert!(diff.has_any_changes());
        assert_eq!(diff.deltas().len(), 1);
        assert_eq!(diff.deltas()[0].kind, "notes");

        let unchanged = DiffLogicType::PianoTrack.create_diff(state.deltas(), &state);
        assert!(!unchanged.has_any_changes());
    }

    #[test]
    fn test_compose_diff_reports_removed_aspects() {
        let state = track(vec![
            Delta::new("notes", json!([60])),
            Delta::new("instrument", json!("piano")),
        ]);
        let live = vec![Delta::new("notes", json!([60]))];

        let diff = DiffLogicType::PianoTrack.create_diff(&live, &state);
        assert_eq!(diff.deltas().len(), 1);
        assert_eq!(diff.deltas()[0].kind, "instrument");
        assert!(diff.deltas()[0].is_removal());
    }

    #[test]
    fn test_removal_delta_drops_aspect_on_merge() {
        let state = track(vec![
            Delta::new("notes", json!([60])),
            Delta::new("instrument", json!("piano")),
        ]);
        let changes = RevisionItem::new(
            ChangeKind::Changed,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(1),
            vec![Delta::removal("instrument")],
        );

        let merged = state.merged_with(&changes);
        assert_eq!(merged.num_deltas(), 1);
        assert!(merged.delta("instrument").is_none());

        let live = vec![Delta::new("notes", json!([60]))];
        let diff = DiffLogicType::PianoTrack.create_diff(&live, &merged);
        assert!(!diff.has_any_changes());

        let live = vec![Delta::new("notes", json!([60])), Delta::new("instrument", Value::Null)];
        let diff = DiffLogicType::PianoTrack.create_diff(&live, &merged);
        assert!(!diff.has_any_changes());
    }

    #[test]
    fn test_as_added_keeps_present_aspects() {
        let changes = RevisionItem::new(
            ChangeKind::Changed,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(1),
            vec![Delta::new("notes", json!([60])), Delta::removal("instrument")],
        );

        let added = changes.as_added();
        assert_eq!(added.kind(), ChangeKind::Added);
        assert_eq!(added.uuid(), changes.uuid());
        assert_eq!(added.num_deltas(), 1);
        assert!(added.delta("notes").is_some());
    }

    #[test]
    fn test_replace_diff_emits_full_list_when_anything_differs() {
        let state = RevisionItem::new(
            ChangeKind::Added,
            DiffLogicType::Pattern,
            Uuid::from_u128(3),
            vec![Delta::new("clips", json!([0])), Delta::new("mute", json!(false))],
        );
        let live = vec![Delta::new("clips", json!([0])), Delta::new("mute", json!(true))];

        let diff = DiffLogicType::Pattern.create_diff(&live, &state);
        assert_eq!(diff.deltas().len(), 2);
    }

    #[test]
    fn test_removed_record_keeps_identity_only() {
        let state = track(vec![Delta::new("notes", json!([60]))]);
        let removed = RevisionItem::removed(&state);
        assert_eq!(removed.kind(), ChangeKind::Removed);
        assert_eq!(removed.uuid(), state.uuid());
        assert_eq!(removed.logic_type(), DiffLogicType::PianoTrack);
        assert_eq!(removed.num_deltas(), 0);
    }

    #[test]
    fn test_serialized_shape_uses_type_tag() {
        let item = track(vec![Delta::new("notes", json!([60]))]);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], json!("added"));
        assert_eq!(value["logic_type"], json!("piano-track"));

        let back: RevisionItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }
}
