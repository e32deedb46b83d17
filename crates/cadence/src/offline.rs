//! Tracked-items source used when a history is opened without its project.

use std::sync::Arc;

use cadence_vcs::{DiffLogicType, RevisionItem, TrackedItem, TrackedItemsSource};
use tracing::debug;
use uuid::Uuid;

/// A project with no live items.
///
/// Opening a history against it lets the CLI read and move the persisted
/// head without touching project data. Writes from version control are
/// dropped.
#[derive(Debug, Default)]
pub struct OfflineProject;

impl OfflineProject {
    pub fn shared() -> Arc<dyn TrackedItemsSource> {
        Arc::new(Self)
    }
}

impl TrackedItemsSource for OfflineProject {
    fn num_tracked_items(&self) -> usize {
        0
    }

    fn tracked_item(&self, _index: usize) -> Option<Arc<dyn TrackedItem>> {
        None
    }

    fn init_tracked_item(&self, logic_type: DiffLogicType, uuid: Uuid, _state: &RevisionItem) {
        debug!(%uuid, logic_type = logic_type.as_str(), "offline project ignores item init");
    }

    fn delete_tracked_item(&self, _uuid: Uuid) -> bool {
        false
    }
}
