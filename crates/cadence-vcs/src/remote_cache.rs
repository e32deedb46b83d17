//! Cache of what the remote sync service is known to hold.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::revision::{Revision, RevisionId};

/// Revision header as reported by the sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRevision {
    pub id: RevisionId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// How much of a revision the remote side has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Local only.
    NoSync,
    /// Header fetched from remote, deltas not yet pulled.
    ShallowCopy,
    /// Present on both sides.
    FullSync,
}

#[derive(Debug, Default)]
struct CacheState {
    fetched: HashMap<RevisionId, i64>,
    last_sync: Option<DateTime<Utc>>,
}

/// Remote revision ids with their timestamps and the time of the last sync.
#[derive(Debug, Default)]
pub struct RemoteCache {
    state: RwLock<CacheState>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        revisions: impl IntoIterator<Item = RemoteRevision>,
        last_sync: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            state: RwLock::new(CacheState {
                fetched: revisions.into_iter().map(|r| (r.id, r.timestamp)).collect(),
                last_sync,
            }),
        }
    }

    pub fn has_revision_tracked(&self, id: RevisionId) -> bool {
        self.read(|state| state.fetched.contains_key(&id))
    }

    /// Replace the cache with the full remote listing.
    pub fn update_for_remote_revisions(&self, revisions: &[RemoteRevision]) {
        self.write(|state| {
            state.fetched = revisions.iter().map(|r| (r.id, r.timestamp)).collect();
            state.last_sync = Some(Utc::now());
        });
    }

    /// Record that a local revision was pushed.
    pub fn update_for_local_revision(&self, revision: &Revision) {
        self.write(|state| {
            state
                .fetched
                .insert(revision.id(), revision.timestamp().timestamp_millis());
            state.last_sync = Some(Utc::now());
        });
    }

    pub fn is_outdated(&self, ttl: Duration) -> bool {
        self.is_outdated_at(Utc::now(), ttl)
    }

    /// An empty cache is never outdated; otherwise it is once the last sync
    /// is older than `ttl`.
    pub fn is_outdated_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.read(|state| {
            if state.fetched.is_empty() {
                return false;
            }
            match state.last_sync {
                Some(last) => now - last > ttl,
                None => true,
            }
        })
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.read(|state| state.last_sync)
    }

    pub fn len(&self) -> usize {
        self.read(|state| state.fetched.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entries sorted by timestamp, then id.
    pub fn revisions(&self) -> Vec<RemoteRevision> {
        let mut revisions: Vec<RemoteRevision> = self.read(|state| {
            state
                .fetched
                .iter()
                .map(|(id, timestamp)| RemoteRevision {
                    id: *id,
                    timestamp: *timestamp,
                })
                .collect()
        });
        revisions.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        revisions
    }

    /// Forget the fetched revisions. The sync time is kept.
    pub fn reset(&self) {
        self.write(|state| state.fetched.clear());
    }

    fn read<R>(&self, f: impl FnOnce(&CacheState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}
