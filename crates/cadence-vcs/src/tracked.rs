//! The capability surface the version-control core consumes from the
//! project model.
//!
//! Live model objects (tracks, patterns, project metadata) implement
//! [`TrackedItem`]; the project that owns them implements
//! [`TrackedItemsSource`]. The core never learns what a note or a clip is.

use std::sync::Arc;
use uuid::Uuid;

use crate::item::{Delta, DiffLogicType, RevisionItem};

/// A structural diff between a live item and a recorded state.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    logic_type: DiffLogicType,
    deltas: Vec<Delta>,
}

impl Diff {
    pub fn new(logic_type: DiffLogicType) -> Self {
        Self {
            logic_type,
            deltas: Vec::new(),
        }
    }

    pub fn with_delta(mut self, delta: Delta) -> Self {
        self.deltas.push(delta);
        self
    }

    pub fn push(&mut self, delta: Delta) {
        self.deltas.push(delta);
    }

    pub fn logic_type(&self) -> DiffLogicType {
        self.logic_type
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn has_any_changes(&self) -> bool {
        !self.deltas.is_empty()
    }

    pub fn into_deltas(self) -> Vec<Delta> {
        self.deltas
    }
}

/// A live model object under version control.
///
/// Implementations are shared between the editing thread and the diff
/// worker, so state changes go through interior mutability.
pub trait TrackedItem: Send + Sync {
    /// Stable identity across the whole history.
    fn uuid(&self) -> Uuid;

    /// Kind tag selecting the diff and merge strategy.
    fn logic_type(&self) -> DiffLogicType;

    /// Full current state, one delta per aspect.
    fn deltas(&self) -> Vec<Delta>;

    /// Diff the current state against a recorded one.
    fn create_diff(&self, state: &RevisionItem) -> Diff {
        self.logic_type().create_diff(&self.deltas(), state)
    }

    /// Restore the item to a recorded state.
    ///
    /// An `Added` state is a full state and replaces everything. A `Changed`
    /// state follows the item's [`MergePolicy`](crate::MergePolicy): replace
    /// policies overwrite the whole item, compose policies overwrite only the
    /// recorded aspects and drop aspects carried by a removal delta.
    fn reset_state_to(&self, state: &RevisionItem);
}

/// The project-side collection of tracked items.
pub trait TrackedItemsSource: Send + Sync {
    fn num_tracked_items(&self) -> usize;

    /// Item at `index`, or `None` if the collection shrank meanwhile.
    fn tracked_item(&self, index: usize) -> Option<Arc<dyn TrackedItem>>;

    /// Create a live item of the given kind, seeded from a recorded state.
    fn init_tracked_item(&self, logic_type: DiffLogicType, uuid: Uuid, state: &RevisionItem);

    /// Delete a live item. Returns false if nothing was deleted.
    fn delete_tracked_item(&self, uuid: Uuid) -> bool;

    /// Called before a bulk reset so the project can mute its own
    /// change notifications.
    fn on_before_reset_state(&self) {}

    /// Called after a bulk reset.
    fn on_reset_state(&self) {}

    /// All items at this moment.
    fn tracked_items(&self) -> Vec<Arc<dyn TrackedItem>> {
        (0..self.num_tracked_items())
            .filter_map(|i| self.tracked_item(i))
            .collect()
    }

    fn find_tracked_item(&self, uuid: Uuid) -> Option<Arc<dyn TrackedItem>> {
        (0..self.num_tracked_items())
            .filter_map(|i| self.tracked_item(i))
            .find(|item| item.uuid() == uuid)
    }
}
