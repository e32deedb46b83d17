//! Builder patterns for constructing test objects.

use cadence_vcs::{ChangeKind, Delta, DiffLogicType, RevisionItem};
use serde_json::Value;
use uuid::Uuid;

use crate::fixtures::TestItem;

/// Builder for tracked items and the records describing them.
///
/// # Example
///
/// ```rust
/// use cadence_test_utils::builders::ItemBuilder;
/// use serde_json::json;
///
/// let track = ItemBuilder::piano_track(1)
///     .aspect("notes", json!([60, 64, 67]))
///     .aspect("instrument", json!("piano"))
///     .build();
///
/// assert_eq!(track.get("instrument"), Some(json!("piano")));
/// ```
pub struct ItemBuilder {
    uuid: Uuid,
    logic_type: DiffLogicType,
    aspects: Vec<(String, Value)>,
}

impl ItemBuilder {
    pub fn new(logic_type: DiffLogicType, uuid: Uuid) -> Self {
        Self {
            uuid,
            logic_type,
            aspects: Vec::new(),
        }
    }

    /// A piano track with a readable, deterministic uuid.
    pub fn piano_track(seed: u128) -> Self {
        Self::new(DiffLogicType::PianoTrack, Uuid::from_u128(seed))
    }

    pub fn automation_track(seed: u128) -> Self {
        Self::new(DiffLogicType::AutomationTrack, Uuid::from_u128(seed))
    }

    pub fn pattern(seed: u128) -> Self {
        Self::new(DiffLogicType::Pattern, Uuid::from_u128(seed))
    }

    pub fn aspect(mut self, kind: impl Into<String>, data: Value) -> Self {
        self.aspects.push((kind.into(), data));
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn build(self) -> TestItem {
        let item = TestItem::new(self.uuid, self.logic_type);
        for (kind, data) in self.aspects {
            item.set(&kind, data);
        }
        item
    }

    /// A revision record of the given kind carrying the built aspects.
    pub fn record(self, kind: ChangeKind) -> RevisionItem {
        let deltas = self
            .aspects
            .into_iter()
            .map(|(aspect, data)| Delta::new(aspect, data))
            .collect();
        RevisionItem::new(kind, self.logic_type, self.uuid, deltas)
    }
}
