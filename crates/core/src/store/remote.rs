//! Remote document stores.
//!
//! [`FileRemoteStore`] mirrors the remote service as one JSON file per
//! document (`<store_dir>/<document_id>.json`), so the sync pipeline can run
//! end to end without network access.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{atomic_write_async, RemoteStore};
use crate::errors::StoreError;
use crate::models::{Profile, RemoteDocument};

/// Description given to documents created by a push.
const DOCUMENT_DESCRIPTION: &str = "profilesync profiles";

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// A directory of remote documents.
#[derive(Debug, Clone)]
pub struct FileRemoteStore {
    dir: PathBuf,
}

impl FileRemoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{document_id}.json"))
    }

    async fn write_document(&self, document: &RemoteDocument) -> Result<(), StoreError> {
        let path = self.document_path(&document.id);
        let body = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::decode(path.display().to_string(), e))?;
        atomic_write_async(&path, &body).await
    }
}

#[async_trait]
impl RemoteStore for FileRemoteStore {
    async fn fetch(&self, document_id: &str) -> Result<RemoteDocument, StoreError> {
        let path = self.document_path(document_id);
        debug!(path = %path.display(), "fetching remote document");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::DocumentNotFound(document_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map_err(|e| StoreError::decode(path.display().to_string(), e))
    }

    async fn push_profile(&self, document_id: &str, profile: &Profile) -> Result<(), StoreError> {
        let mut document = match self.fetch(document_id).await {
            Ok(document) => document,
            Err(StoreError::DocumentNotFound(_)) => {
                info!(document_id, "creating remote document");
                RemoteDocument::new(document_id, Some(DOCUMENT_DESCRIPTION.to_string()))
            }
            Err(e) => return Err(e),
        };

        document.put_profile(profile)?;
        self.write_document(&document).await?;
        info!(document_id, profile = %profile.profile_name, "remote profile pushed");
        Ok(())
    }

    async fn delete_profile(&self, document_id: &str, name: &str) -> Result<(), StoreError> {
        let mut document = self.fetch(document_id).await?;
        document.remove_profile(name)?;
        self.write_document(&document).await?;
        info!(document_id, profile = name, "remote profile deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`RemoteStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<HashMap<String, RemoteDocument>>,
    pushes: Mutex<usize>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document without counting it as a push.
    pub async fn insert(&self, document: RemoteDocument) {
        self.documents
            .lock()
            .await
            .insert(document.id.clone(), document);
    }

    /// Current copy of a document.
    pub async fn get(&self, document_id: &str) -> Option<RemoteDocument> {
        self.documents.lock().await.get(document_id).cloned()
    }

    /// Number of `push_profile` calls so far.
    pub async fn push_count(&self) -> usize {
        *self.pushes.lock().await
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(&self, document_id: &str) -> Result<RemoteDocument, StoreError> {
        self.get(document_id)
            .await
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))
    }

    async fn push_profile(&self, document_id: &str, profile: &Profile) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        let document = documents.entry(document_id.to_string()).or_insert_with(|| {
            RemoteDocument::new(document_id, Some(DOCUMENT_DESCRIPTION.to_string()))
        });
        document.put_profile(profile)?;
        *self.pushes.lock().await += 1;
        Ok(())
    }

    async fn delete_profile(&self, document_id: &str, name: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))?
            .remove_profile(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ConfigTree;

    fn profile(name: &str) -> Profile {
        Profile::new(name, ConfigTree::new(), vec!["ext.one".into()], 10)
    }

    #[tokio::test]
    async fn test_fetch_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(dir.path());
        let result = store.fetch("nope").await;
        assert!(matches!(result, Err(StoreError::DocumentNotFound(ref id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_push_creates_then_updates_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(dir.path());

        store.push_profile("doc", &profile("work")).await.unwrap();
        store.push_profile("doc", &profile("home")).await.unwrap();

        let document = store.fetch("doc").await.unwrap();
        assert_eq!(document.description.as_deref(), Some(DOCUMENT_DESCRIPTION));
        assert_eq!(document.profile_names(), vec!["home", "work"]);
        assert_eq!(document.profile("work").unwrap(), profile("work"));
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(dir.path());
        assert!(matches!(
            store.delete_profile("doc", "work").await,
            Err(StoreError::DocumentNotFound(_))
        ));

        store.push_profile("doc", &profile("work")).await.unwrap();
        store.push_profile("doc", &profile("home")).await.unwrap();
        store.delete_profile("doc", "work").await.unwrap();

        assert_eq!(store.fetch("doc").await.unwrap().profile_names(), vec!["home"]);
        assert!(matches!(
            store.delete_profile("doc", "work").await,
            Err(StoreError::ProfileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.json"), "not json").unwrap();
        let store = FileRemoteStore::new(dir.path());
        assert!(matches!(store.fetch("doc").await, Err(StoreError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_memory_store_counts_pushes() {
        let store = MemoryRemoteStore::new();
        assert!(store.fetch("doc").await.is_err());

        store.push_profile("doc", &profile("work")).await.unwrap();
        assert_eq!(store.push_count().await, 1);
        assert_eq!(
            store.fetch("doc").await.unwrap().profile("work").unwrap(),
            profile("work")
        );

        store.delete_profile("doc", "work").await.unwrap();
        assert!(store.get("doc").await.unwrap().profile_names().is_empty());
    }
}
