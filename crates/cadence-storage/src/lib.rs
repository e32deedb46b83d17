//! Document persistence for cadence.
//!
//! Project histories are persisted as JSON documents addressed by a project
//! id and a document name (`history`, for instance). Two backends exist:
//! - JSON files on disk, one file per document
//! - In-memory storage (for testing)

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonDocumentStore;
pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Name of the document holding a project's version-control history.
pub const HISTORY_DOCUMENT: &str = "history";

/// A store of JSON documents grouped by project.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document. Returns `None` if it was never saved.
    async fn load<T: DeserializeOwned + Send>(
        &self,
        project_id: &str,
        document: &str,
    ) -> StorageResult<Option<T>>;

    /// Save a document, replacing any previous version.
    async fn save<T: Serialize + Send + Sync>(
        &self,
        project_id: &str,
        document: &str,
        value: &T,
    ) -> StorageResult<()>;

    /// Remove a document. Removing a missing document is not an error.
    async fn remove(&self, project_id: &str, document: &str) -> StorageResult<()>;

    /// Names of all documents saved for a project.
    async fn documents(&self, project_id: &str) -> StorageResult<Vec<String>>;

    /// Check if a document exists.
    async fn exists(&self, project_id: &str, document: &str) -> StorageResult<bool>;
}

/// Reject ids that would escape the store's namespace.
pub(crate) fn validate_component(kind: &str, value: &str) -> StorageResult<()> {
    if value.is_empty()
        || value.contains('/')
        || value.contains('\\')
        || value == "."
        || value == ".."
    {
        return Err(StorageError::invalid_key(format!("invalid {kind}: {value:?}")));
    }
    Ok(())
}
