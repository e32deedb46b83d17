//! Testing utilities, fixtures, and builders for cadence.
//!
//! - **Fixtures**: an in-memory tracked-items project and a temporary
//!   history store
//! - **Builders**: fluent construction of tracked items and revision records
//! - **Assertions**: helpers for working diffs and background rebuilds
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use cadence_test_utils::{builders::ItemBuilder, fixtures::TestProject};
//!
//! let project = TestProject::shared();
//! let track = project.add(ItemBuilder::piano_track(1).aspect("notes", json!([60])).build());
//! let mut vcs = VersionControl::new(project.clone(), VcsConfig::default());
//! vcs.rebuild_diff_synchronously();
//! assert_eq!(vcs.diff().len(), 1);
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

// Re-export commonly used items
pub use builders::ItemBuilder;
pub use fixtures::{TempHistoryStore, TestItem, TestProject};
