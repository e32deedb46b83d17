//! In-memory document storage for testing.

use crate::{validate_component, DocumentStore, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory document store. Documents are kept as serialized JSON so that
/// loading exercises the same serde round trip as the file backend.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<(String, String), String>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(project_id: &str, document: &str) -> StorageResult<(String, String)> {
        validate_component("project id", project_id)?;
        validate_component("document name", document)?;
        Ok((project_id.to_string(), document.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load<T: DeserializeOwned + Send>(
        &self,
        project_id: &str,
        document: &str,
    ) -> StorageResult<Option<T>> {
        let key = Self::key(project_id, document)?;
        let documents = self
            .documents
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        match documents.get(&key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize + Send + Sync>(
        &self,
        project_id: &str,
        document: &str,
        value: &T,
    ) -> StorageResult<()> {
        let key = Self::key(project_id, document)?;
        let json = serde_json::to_string(value)?;

        self.documents
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?
            .insert(key, json);
        Ok(())
    }

    async fn remove(&self, project_id: &str, document: &str) -> StorageResult<()> {
        let key = Self::key(project_id, document)?;
        self.documents
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?
            .remove(&key);
        Ok(())
    }

    async fn documents(&self, project_id: &str) -> StorageResult<Vec<String>> {
        validate_component("project id", project_id)?;
        let documents = self
            .documents
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        Ok(documents
            .keys()
            .filter(|(project, _)| project == project_id)
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn exists(&self, project_id: &str, document: &str) -> StorageResult<bool> {
        let key = Self::key(project_id, document)?;
        let documents = self
            .documents
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(documents.contains_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryDocumentStore::new();

        store.save("prj_1", "history", &vec![1, 2, 3]).await.unwrap();
        let loaded: Option<Vec<u32>> = store.load("prj_1", "history").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
        assert!(store.exists("prj_1", "history").await.unwrap());
        assert!(!store.exists("prj_2", "history").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_overwrite_and_remove() {
        let store = MemoryDocumentStore::new();

        store.save("prj_1", "history", &"first").await.unwrap();
        store.save("prj_1", "history", &"second").await.unwrap();
        let loaded: Option<String> = store.load("prj_1", "history").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("second"));

        store.remove("prj_1", "history").await.unwrap();
        store.remove("prj_1", "history").await.unwrap();
        assert!(store.documents("prj_1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_lists_per_project() {
        let store = MemoryDocumentStore::new();
        store.save("prj_1", "history", &1).await.unwrap();
        store.save("prj_1", "layout", &2).await.unwrap();
        store.save("prj_2", "history", &3).await.unwrap();

        assert_eq!(store.documents("prj_1").await.unwrap(), vec!["history", "layout"]);
    }

    #[tokio::test]
    async fn test_memory_store_type_mismatch_is_json_error() {
        let store = MemoryDocumentStore::new();
        store.save("prj_1", "history", &"text").await.unwrap();

        let result: StorageResult<Option<u64>> = store.load("prj_1", "history").await;
        assert!(matches!(result, Err(StorageError::Json(_))));
    }
}
