//! Embedded version control for structured project data.
//!
//! Live model objects expose themselves through [`TrackedItemsSource`] and
//! [`TrackedItem`]. Version control keeps a tree of immutable revisions,
//! reconstructs the project state at any revision as a [`Snapshot`], and
//! computes the working diff of the live project against it on a background
//! worker.
//!
//! # Example
//!
//! ```ignore
//! let mut vcs = VersionControl::new(project.clone(), VcsConfig::default());
//! vcs.rebuild_diff_synchronously();
//! let diff = vcs.diff();
//! vcs.commit(&diff.select_all(), "Add drums")?;
//! ```

pub mod bus;
pub mod config;
pub mod document;
pub mod error;
pub mod head;
pub mod item;
pub mod persist;
pub mod remote_cache;
pub mod revision;
pub mod snapshot;
pub mod stash;
pub mod tracked;
pub mod tree;
pub mod version_control;

pub use bus::{EventBus, VcsEvent};
pub use config::VcsConfig;
pub use document::{VcsDocument, DIFF_FORMAT_VERSION};
pub use error::{ConfigError, VcsError, VcsResult};
pub use head::{DiffSelection, Head, WorkingDiff};
pub use item::{ChangeKind, Delta, DiffLogicType, MergePolicy, RevisionItem};
pub use remote_cache::{RemoteCache, RemoteRevision, SyncState};
pub use revision::{Revision, RevisionBuilder, RevisionId};
pub use snapshot::Snapshot;
pub use stash::StashesRepository;
pub use tracked::{Diff, TrackedItem, TrackedItemsSource};
pub use tree::{HistoryStats, RevisionTree};
pub use version_control::VersionControl;
