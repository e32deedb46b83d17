//! Revisions: immutable commit nodes and their builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::item::RevisionItem;

/// Unique identifier of a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(Uuid);

impl RevisionId {
    /// Create a new random revision id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a revision id from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First eight characters, for log lines and history views.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed revision.
///
/// Revisions are immutable; the tree shares them through `Arc`. The only
/// way to alter a committed revision is to swap in a new value with the
/// same id, which [`RevisionTree`](crate::tree::RevisionTree) does for
/// amends and shallow-copy hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    id: RevisionId,
    message: String,
    timestamp: DateTime<Utc>,
    items: Vec<RevisionItem>,
    shallow: bool,
}

impl Revision {
    /// Rebuild a revision from persisted parts.
    pub fn from_parts(
        id: RevisionId,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        items: Vec<RevisionItem>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
            timestamp,
            items,
            shallow: false,
        }
    }

    /// Header-only revision fetched from a remote, pending hydration.
    pub fn shallow(id: RevisionId, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            message: message.into(),
            timestamp,
            items: Vec::new(),
            shallow: true,
        }
    }

    pub fn id(&self) -> RevisionId {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn items(&self) -> &[RevisionItem] {
        &self.items
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn is_shallow_copy(&self) -> bool {
        self.shallow
    }

    /// Total number of deltas over all items.
    pub fn num_deltas(&self) -> usize {
        self.items.iter().map(RevisionItem::num_deltas).sum()
    }

    pub(crate) fn amended(&self, item: RevisionItem) -> Self {
        let mut amended = self.clone();
        amended.items.push(item);
        amended
    }

    pub(crate) fn hydrated(&self, items: Vec<RevisionItem>) -> Self {
        Self {
            items,
            shallow: false,
            ..self.clone()
        }
    }
}

/// A revision under construction.
#[derive(Debug, Clone, Default)]
pub struct RevisionBuilder {
    id: Option<RevisionId>,
    message: String,
    timestamp: Option<DateTime<Utc>>,
    items: Vec<RevisionItem>,
}

impl RevisionBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Use a fixed id instead of a random one.
    pub fn with_id(mut self, id: RevisionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_item(mut self, item: RevisionItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn add_item(&mut self, item: RevisionItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[RevisionItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finalize the revision. Timestamp defaults to now.
    pub fn build(self) -> Revision {
        Revision {
            id: self.id.unwrap_or_default(),
            message: self.message,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            items: self.items,
            shallow: false,
        }
    }
}
