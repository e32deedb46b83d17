//! Change notifications.
//!
//! Everything observable about version control (diff state, snapshot
//! replacement, history changes) is announced on a broadcast channel. The
//! events carry no state of their own; subscribers re-query the façade.
//!
//! # Example
//!
//! ```ignore
//! let mut rx = vcs.subscribe();
//! while let Ok(event) = rx.blocking_recv() {
//!     if event == VcsEvent::DiffRebuildFinished { .. } { redraw_stage(); }
//! }
//! ```

use crate::revision::RevisionId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// A version-control notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VcsEvent {
    DiffOutdated,
    DiffRebuildStarted,
    DiffRebuildFinished { generation: u64 },
    DiffRebuildCancelled,
    SnapshotReplaced,
    Committed { revision_id: RevisionId },
    ChangesReset,
    Stashed,
    StashApplied,
    CherryPicked,
    HistoryChanged,
    SyncCacheUpdated,
}

impl VcsEvent {
    /// Event type name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            VcsEvent::DiffOutdated => "diff.outdated",
            VcsEvent::DiffRebuildStarted => "diff.rebuild.started",
            VcsEvent::DiffRebuildFinished { .. } => "diff.rebuild.finished",
            VcsEvent::DiffRebuildCancelled => "diff.rebuild.cancelled",
            VcsEvent::SnapshotReplaced => "snapshot.replaced",
            VcsEvent::Committed { .. } => "history.committed",
            VcsEvent::ChangesReset => "changes.reset",
            VcsEvent::Stashed => "stash.created",
            VcsEvent::StashApplied => "stash.applied",
            VcsEvent::CherryPicked => "history.cherry_picked",
            VcsEvent::HistoryChanged => "history.changed",
            VcsEvent::SyncCacheUpdated => "sync.cache_updated",
        }
    }
}

/// Cloneable handle to the notification channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VcsEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Broadcast an event. Having no subscribers is fine.
    pub fn emit(&self, event: VcsEvent) {
        tracing::trace!(event = event.event_type(), "vcs event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VcsEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
