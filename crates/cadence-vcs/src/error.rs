//! Error types for the version-control crate.

use thiserror::Error;

use crate::revision::RevisionId;

/// Version-control errors. A failed operation leaves history, head and
/// stashes untouched.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Nothing was selected.
    #[error("empty selection")]
    EmptySelection,

    /// The selection was captured against an older working diff.
    #[error("stale selection: captured at diff generation {expected}, current is {actual}")]
    StaleSelection { expected: u64, actual: u64 },

    /// The working diff is still being computed or its pass was cancelled.
    #[error("working diff for generation {generation} is incomplete")]
    IncompleteDiff { generation: u64 },

    /// A selected index does not exist in the working diff.
    #[error("selection index {index} out of range for diff of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// No revision with this id in the history.
    #[error("revision not found: {0}")]
    RevisionNotFound(RevisionId),

    /// A revision with this id is already in the history.
    #[error("duplicate revision: {0}")]
    DuplicateRevision(RevisionId),

    /// The revision has neither items nor children.
    #[error("revision is empty: {0}")]
    EmptyRevision(RevisionId),

    /// The quick stash slot is already taken.
    #[error("quick stash is occupied")]
    QuickStashOccupied,

    /// The quick stash slot is empty.
    #[error("no quick stash")]
    NoQuickStash,

    /// The working diff has no changes to stash.
    #[error("nothing to stash")]
    NothingToStash,

    /// No user stash matches.
    #[error("stash not found: {0}")]
    StashNotFound(String),

    /// A persisted history could not be turned back into a tree.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] cadence_storage::StorageError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An override carried an unparsable value.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Result type for version-control operations.
pub type VcsResult<T> = Result<T, VcsError>;
