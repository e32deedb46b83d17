//! JSON file-based document storage.
//!
//! Each document is a separate file: project `prj_1`, document `history`
//! -> `<base>/prj_1/history.json`.

use crate::{validate_component, DocumentStore, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// JSON file-based document store.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    base_path: PathBuf,
}

impl JsonDocumentStore {
    /// Create a new store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Store kept next to a project file, in `<project_dir>/.cadence`.
    pub fn for_project_dir(project_dir: &Path) -> Self {
        Self::new(project_dir.join(".cadence"))
    }

    /// Root directory of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn document_path(&self, project_id: &str, document: &str) -> StorageResult<PathBuf> {
        validate_component("project id", project_id)?;
        validate_component("document name", document)?;
        Ok(self
            .base_path
            .join(project_id)
            .join(format!("{document}.json")))
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn load<T: DeserializeOwned + Send>(
        &self,
        project_id: &str,
        document: &str,
    ) -> StorageResult<Option<T>> {
        let path = self.document_path(project_id, document)?;
        debug!(path = %path.display(), "Loading document");

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save<T: Serialize + Send + Sync>(
        &self,
        project_id: &str,
        document: &str,
        value: &T,
    ) -> StorageResult<()> {
        let path = self.document_path(project_id, document)?;
        debug!(path = %path.display(), "Saving document");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;

        // Write to a sibling temp file, then rename over the old version
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn remove(&self, project_id: &str, document: &str) -> StorageResult<()> {
        let path = self.document_path(project_id, document)?;
        debug!(path = %path.display(), "Removing document");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn documents(&self, project_id: &str) -> StorageResult<Vec<String>> {
        validate_component("project id", project_id)?;
        let dir = self.base_path.join(project_id);

        let mut names = Vec::new();
        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        names.sort();
        Ok(names)
    }

    async fn exists(&self, project_id: &str, document: &str) -> StorageResult<bool> {
        let path = self.document_path(project_id, document)?;
        Ok(fs::try_exists(&path).await?)
    }
}
