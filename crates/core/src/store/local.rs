//! Local profile stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{atomic_write, LocalStore};
use crate::config::LocalConfig;
use crate::errors::StoreError;
use crate::models::{decode_object, Profile, ProfileSettings};

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Reads the editor's `settings.json` and extension list from disk, and keeps
/// profile metadata in a separate record file.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    settings_path: PathBuf,
    extensions_path: PathBuf,
    record_path: PathBuf,
}

impl FileLocalStore {
    pub fn new(
        settings_path: impl Into<PathBuf>,
        extensions_path: impl Into<PathBuf>,
        record_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings_path: settings_path.into(),
            extensions_path: extensions_path.into(),
            record_path: record_path.into(),
        }
    }

    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(
            config.settings_path.clone(),
            config.extensions_path.clone(),
            config.record_path.clone(),
        )
    }

    fn read_extensions(&self) -> Result<Vec<String>, StoreError> {
        if !self.extensions_path.exists() {
            debug!(path = %self.extensions_path.display(), "no extension list, assuming none");
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.extensions_path)?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::decode(self.extensions_path.display().to_string(), e))
    }

    fn read_record(&self) -> Result<Option<Profile>, StoreError> {
        if !self.record_path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.record_path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::decode(self.record_path.display().to_string(), e))
    }
}

/// Modification time of `path` in epoch milliseconds.
fn modified_millis(path: &Path) -> Result<i64, StoreError> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified).timestamp_millis())
}

fn to_pretty_json<T: serde::Serialize>(name: &Path, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|e| StoreError::decode(name.display().to_string(), e))
}

impl LocalStore for FileLocalStore {
    fn read_profile(&self, name: &str) -> Result<Profile, StoreError> {
        debug!(path = %self.settings_path.display(), "reading local settings");
        let text = std::fs::read_to_string(&self.settings_path)?;
        let settings = decode_object(&self.settings_path.display().to_string(), &text)?;
        let settings_modified = modified_millis(&self.settings_path)?;
        let extensions = self.read_extensions()?;

        let profile = match self.read_record()? {
            Some(record) if record.profile_name == name => Profile {
                modified_at: record.modified_at.max(settings_modified),
                settings: ProfileSettings::Inline(settings),
                extensions,
                ..record
            },
            _ => Profile::new(name, settings, extensions, settings_modified),
        };

        debug!(
            profile = %profile.profile_name,
            extensions = profile.extensions.len(),
            modified_at = profile.modified_at,
            "local profile loaded"
        );
        Ok(profile)
    }

    fn write_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let settings = profile.settings_tree()?;
        atomic_write(&self.settings_path, &to_pretty_json(&self.settings_path, &settings)?)?;
        atomic_write(
            &self.extensions_path,
            &to_pretty_json(&self.extensions_path, &profile.extensions)?,
        )?;

        let record = Profile {
            settings: ProfileSettings::Inline(settings),
            ..profile.clone()
        };
        atomic_write(&self.record_path, &to_pretty_json(&self.record_path, &record)?)?;

        info!(profile = %profile.profile_name, "local profile written");
        Ok(())
    }

    fn active_profile(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_record()?.map(|record| record.profile_name))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`LocalStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    profiles: Mutex<HashMap<String, Profile>>,
    active: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `profile`.
    pub fn with_profile(profile: Profile) -> Self {
        let store = Self::default();
        store.insert(profile);
        store
    }

    /// Insert or replace a profile without counting it as a write.
    pub fn insert(&self, profile: Profile) {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(profile.profile_name.clone(), profile);
        }
    }

    /// Current copy of a profile.
    pub fn get(&self, name: &str) -> Option<Profile> {
        self.profiles.lock().ok()?.get(name).cloned()
    }

    /// Number of `write_profile` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl LocalStore for MemoryLocalStore {
    fn read_profile(&self, name: &str) -> Result<Profile, StoreError> {
        self.get(name).ok_or_else(|| StoreError::ProfileNotFound {
            document: "local".into(),
            profile: name.to_string(),
        })
    }

    fn write_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.insert(profile.clone());
        if let Ok(mut active) = self.active.lock() {
            *active = Some(profile.profile_name.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }

    fn active_profile(&self) -> Result<Option<String>, StoreError> {
        Ok(self.active.lock().ok().and_then(|active| active.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ConfigTree;
    use serde_json::{json, Value};

    fn obj(value: Value) -> ConfigTree {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn store_in(dir: &Path) -> FileLocalStore {
        FileLocalStore::new(
            dir.join("settings.json"),
            dir.join("extensions.json"),
            dir.join("state").join("profile.json"),
        )
    }

    #[test]
    fn test_read_without_record_or_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"editor.tabSize": 2}"#).unwrap();

        let profile = store_in(dir.path()).read_profile("default").unwrap();
        assert_eq!(profile.profile_name, "default");
        assert!(profile.extensions.is_empty());
        assert!(profile.modified_at > 0);
        assert_eq!(
            Value::Object(profile.settings_tree().unwrap()),
            json!({"editor.tabSize": 2})
        );
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = store_in(dir.path()).read_profile("default");
        assert!(matches!(result, Err(StoreError::IoError(_))));
    }

    #[test]
    fn test_invalid_settings_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let result = store_in(dir.path()).read_profile("default");
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[test]
    fn test_write_then_read_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut profile = Profile::new(
            "work",
            obj(json!({"theme": "dark"})),
            vec!["rust-lang.rust-analyzer".into()],
            1_000,
        );
        profile.tags = vec!["default".into()];
        // Far in the future so the settings file mtime never wins.
        profile.modified_at = 4_000_000_000_000;
        store.write_profile(&profile).unwrap();

        let read = store.read_profile("work").unwrap();
        assert_eq!(read.tags, vec!["default"]);
        assert_eq!(read.created_at, 1_000);
        assert_eq!(read.modified_at, 4_000_000_000_000);
        assert_eq!(read.extensions, vec!["rust-lang.rust-analyzer"]);
        assert_eq!(read.settings_tree().unwrap(), obj(json!({"theme": "dark"})));
    }

    #[test]
    fn test_record_for_other_profile_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut profile = Profile::new("work", ConfigTree::new(), vec![], 1);
        profile.tags = vec!["t".into()];
        store.write_profile(&profile).unwrap();

        let read = store.read_profile("home").unwrap();
        assert_eq!(read.profile_name, "home");
        assert!(read.tags.is_empty());
    }

    #[test]
    fn test_active_profile_follows_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.active_profile().unwrap(), None);

        store
            .write_profile(&Profile::new("work", ConfigTree::new(), vec![], 1))
            .unwrap();
        assert_eq!(store.active_profile().unwrap().as_deref(), Some("work"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryLocalStore::with_profile(Profile::new("p", ConfigTree::new(), vec![], 0));
        assert!(store.read_profile("p").is_ok());
        assert!(matches!(
            store.read_profile("q"),
            Err(StoreError::ProfileNotFound { .. })
        ));

        store
            .write_profile(&Profile::new("q", ConfigTree::new(), vec![], 0))
            .unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(store.get("q").is_some());
        assert_eq!(store.active_profile().unwrap().as_deref(), Some("q"));
    }
}
