//! Domain model types: editor profiles and the remote document that stores them.
//!
//! A [`Profile`] bundles a settings tree and an installed-extension list.
//! Remotely, profiles live as `<name>.json` files inside a gist-like
//! [`RemoteDocument`]; file bodies are JSON text that is decoded on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;
use crate::tree::ConfigTree;

/// Key of the settings subtree in a profile snapshot tree.
pub const SETTINGS_KEY: &str = "settings";
/// Key of the extension list in a profile snapshot tree.
pub const EXTENSIONS_KEY: &str = "extensions";

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Settings as stored in a profile: either inline or as encoded JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileSettings {
    Encoded(String),
    Inline(ConfigTree),
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self::Inline(ConfigTree::new())
    }
}

/// A named editor configuration: settings plus installed extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last modification time, epoch milliseconds.
    #[serde(default)]
    pub modified_at: i64,
    #[serde(default)]
    pub settings: ProfileSettings,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl Profile {
    /// Create a profile with inline settings, stamped `now_ms`.
    pub fn new(
        name: impl Into<String>,
        settings: ConfigTree,
        extensions: Vec<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            profile_name: name.into(),
            default: false,
            tags: Vec::new(),
            created_at: now_ms,
            modified_at: now_ms,
            settings: ProfileSettings::Inline(settings),
            extensions,
        }
    }

    /// Decode the settings into a tree.
    pub fn settings_tree(&self) -> Result<ConfigTree, StoreError> {
        match &self.settings {
            ProfileSettings::Inline(tree) => Ok(tree.clone()),
            ProfileSettings::Encoded(text) => decode_object(&self.profile_name, text),
        }
    }

    /// Snapshot tree reconciled by the sync engine:
    /// `{ "settings": {...}, "extensions": [...] }`.
    pub fn to_tree(&self) -> Result<ConfigTree, StoreError> {
        let mut tree = ConfigTree::new();
        tree.insert(SETTINGS_KEY.into(), Value::Object(self.settings_tree()?));
        tree.insert(
            EXTENSIONS_KEY.into(),
            Value::Array(self.extensions.iter().cloned().map(Value::String).collect()),
        );
        Ok(tree)
    }

    /// Rebuild a profile from a snapshot tree, keeping this profile's
    /// metadata. Settings are always stored inline afterwards.
    ///
    /// Missing keys mean empty settings or no extensions.
    pub fn with_tree(&self, tree: &ConfigTree) -> Result<Profile, String> {
        let settings = match tree.get(SETTINGS_KEY) {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(format!("'{SETTINGS_KEY}' must be an object, found {other}"));
            }
            None => ConfigTree::new(),
        };

        let extensions = match tree.get(EXTENSIONS_KEY) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| format!("extension id must be a string, found {item}"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(format!("'{EXTENSIONS_KEY}' must be an array, found {other}"));
            }
            None => Vec::new(),
        };

        Ok(Profile {
            settings: ProfileSettings::Inline(settings),
            extensions,
            ..self.clone()
        })
    }
}

/// Decode JSON text that must hold an object.
pub fn decode_object(name: &str, text: &str) -> Result<ConfigTree, StoreError> {
    match serde_json::from_str::<Value>(text).map_err(|e| StoreError::decode(name, e))? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(name.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Remote document
// ---------------------------------------------------------------------------

/// One named file inside a [`RemoteDocument`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File body. The service may omit it for large files.
    #[serde(default)]
    pub content: Option<String>,
    /// Set when the service cut the body short.
    #[serde(default)]
    pub truncated: bool,
}

/// A gist-like remote record holding named files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFile>,
}

/// File name under which a profile is stored.
pub fn profile_file_name(profile: &str) -> String {
    format!("{profile}.json")
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            description,
            files: BTreeMap::new(),
        }
    }

    /// Names of the profiles stored in this document, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.files
            .keys()
            .filter_map(|name| name.strip_suffix(".json"))
            .map(str::to_string)
            .collect()
    }

    /// Decode the named profile.
    pub fn profile(&self, name: &str) -> Result<Profile, StoreError> {
        let file_name = profile_file_name(name);
        let file = self
            .files
            .get(&file_name)
            .ok_or_else(|| StoreError::ProfileNotFound {
                document: self.id.clone(),
                profile: name.to_string(),
            })?;

        let content = match (&file.content, file.truncated) {
            (Some(content), false) => content,
            _ => return Err(StoreError::ContentUnavailable(file_name)),
        };

        serde_json::from_str(content).map_err(|e| StoreError::decode(file_name, e))
    }

    /// Store `profile` as `<name>.json`, replacing any previous version.
    pub fn put_profile(&mut self, profile: &Profile) -> Result<(), StoreError> {
        let file_name = profile_file_name(&profile.profile_name);
        let content =
            serde_json::to_string_pretty(profile).map_err(|e| StoreError::decode(&file_name, e))?;
        self.files.insert(
            file_name,
            RemoteFile {
                content: Some(content),
                truncated: false,
            },
        );
        Ok(())
    }

    /// Remove the named profile's file.
    pub fn remove_profile(&mut self, name: &str) -> Result<(), StoreError> {
        match self.files.remove(&profile_file_name(name)) {
            Some(_) => Ok(()),
            None => Err(StoreError::ProfileNotFound {
                document: self.id.clone(),
                profile: name.to_string(),
            }),
        }
    }
}
