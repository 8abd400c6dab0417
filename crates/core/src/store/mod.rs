//! Snapshot providers and persistence sinks.
//!
//! The sync engine reads and writes profiles only through [`LocalStore`] and
//! [`RemoteStore`]. File-backed implementations serve the CLI; in-memory
//! implementations serve tests and embedding callers.

pub mod local;
pub mod remote;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{Profile, RemoteDocument};

pub use local::{FileLocalStore, MemoryLocalStore};
pub use remote::{FileRemoteStore, MemoryRemoteStore};

/// Local editor state.
pub trait LocalStore: Send + Sync {
    /// Read the current local profile. The settings and extension list
    /// reflect the editor's live state; `name` labels the result.
    fn read_profile(&self, name: &str) -> Result<Profile, StoreError>;

    /// Apply `profile` to the local editor state.
    fn write_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Name of the profile last written to this machine, if any.
    fn active_profile(&self) -> Result<Option<String>, StoreError>;
}

/// Remote document service keyed by opaque document ids.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a document with every file body available.
    async fn fetch(&self, document_id: &str) -> Result<RemoteDocument, StoreError>;

    /// Store `profile` in the document, creating the document if needed.
    async fn push_profile(&self, document_id: &str, profile: &Profile) -> Result<(), StoreError>;

    /// Remove the named profile from the document.
    async fn delete_profile(&self, document_id: &str, name: &str) -> Result<(), StoreError>;
}

/// Temporary sibling used for atomic replacement: `.{name}.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profilesync".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write `content` to a temporary sibling, then rename it over `path`.
///
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let temp = temp_path(path);
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

/// Async counterpart of [`atomic_write`].
pub async fn atomic_write_async(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let temp = temp_path(path);
    tokio::fs::write(&temp, content).await?;
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}
