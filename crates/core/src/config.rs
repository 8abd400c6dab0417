//! TOML-based configuration for profilesync.
//!
//! Paths default to the platform config and data directories (`dirs`), so a
//! minimal file only needs `[remote] document_id`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::Strategy;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Reconciliation behaviour.
    #[serde(default)]
    pub sync: SyncSection,

    /// Where the local editor keeps its settings.
    #[serde(default)]
    pub local: LocalConfig,

    /// Remote document store settings.
    pub remote: RemoteConfig,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// How conflicts are resolved when no strategy is given on the command line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategySetting {
    PreferLocal,
    PreferRemote,
    PreferNewer,
    Manual,
    /// Prompt for a strategy each time.
    #[default]
    Ask,
}

impl StrategySetting {
    /// The fixed strategy, or `None` when the user is asked.
    pub fn fixed(&self) -> Option<Strategy> {
        match self {
            Self::PreferLocal => Some(Strategy::PreferLocal),
            Self::PreferRemote => Some(Strategy::PreferRemote),
            Self::PreferNewer => Some(Strategy::PreferNewer),
            Self::Manual => Some(Strategy::Manual),
            Self::Ask => None,
        }
    }
}

impl std::fmt::Display for StrategySetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fixed() {
            Some(strategy) => write!(f, "{strategy}"),
            None => write!(f, "ask"),
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Profile to reconcile (default `default`).
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Conflict resolution strategy.
    #[serde(default)]
    pub strategy: StrategySetting,

    /// Glob patterns over dotted paths (e.g. `settings.window.*`) whose
    /// conflicts always keep the local value.
    #[serde(default)]
    pub ignored_paths: Vec<String>,

    /// Use the profile's `modifiedAt` when a conflict has no `_timestamp`.
    #[serde(default = "default_true")]
    pub timestamp_fallback: bool,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_profile() -> String {
    "default".into()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            strategy: StrategySetting::default(),
            ignored_paths: Vec::new(),
            timestamp_fallback: default_true(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

/// Local editor settings locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// The editor's `settings.json`.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// JSON array of installed extension ids.
    #[serde(default = "default_extensions_path")]
    pub extensions_path: PathBuf,

    /// Local profile record (name, tags, timestamps) kept between runs.
    #[serde(default = "default_record_path")]
    pub record_path: PathBuf,
}

fn default_user_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("Cursor")
        .join("User")
}
fn default_settings_path() -> PathBuf {
    default_user_dir().join("settings.json")
}
fn default_extensions_path() -> PathBuf {
    default_user_dir().join("extensions.json")
}
fn default_record_path() -> PathBuf {
    default_data_dir().join("profile.json")
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            extensions_path: default_extensions_path(),
            record_path: default_record_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// Remote document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Identifier of the document holding the profiles.
    pub document_id: String,

    /// Directory mirroring the remote documents.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("profilesync")
}
fn default_store_dir() -> PathBuf {
    default_data_dir().join("remote")
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load a [`SyncConfig`] from a TOML file at the given path.
    ///
    /// This does **not** validate values -- call
    /// [`validate`](Self::validate) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.profile.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.profile".into(),
                detail: "profile name must not be empty".into(),
            });
        }
        if self.sync.profile.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "sync.profile".into(),
                detail: "profile name must not contain '/'".into(),
            });
        }
        if self.remote.document_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote.document_id".into(),
                detail: "document id must not be empty".into(),
            });
        }
        if let Some(pattern) = self.sync.ignored_paths.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "sync.ignored_paths".into(),
                detail: format!("empty pattern '{pattern}'"),
            });
        }
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.sync.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "sync.log_level".into(),
                detail: format!("unknown level '{}'", self.sync.log_level),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Commented starter configuration written by `profilesync init`.
    pub fn default_toml() -> String {
        format!(
            r#"# profilesync configuration

[sync]
# Profile to reconcile.
profile = "default"
# prefer_local | prefer_remote | prefer_newer | manual | ask
strategy = "ask"
# Dotted-path globs whose conflicts always keep the local value.
ignored_paths = ["settings.window.zoomLevel"]
# Use the profile's modifiedAt when a conflict has no _timestamp.
timestamp_fallback = true
log_level = "info"

[local]
settings_path = '{settings}'
extensions_path = '{extensions}'
record_path = '{record}'

[remote]
document_id = "CHANGE_ME"
store_dir = '{store}'
"#,
            settings = default_settings_path().display(),
            extensions = default_extensions_path().display(),
            record = default_record_path().display(),
            store = default_store_dir().display(),
        )
    }
}
