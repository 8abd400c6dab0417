//! Error types for the profilesync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Conflict resolution has no error type: a cancelled or unselected
//! resolution is reported as [`crate::conflict::Resolution::Aborted`].

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from reading or writing local and remote profile stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote document with the given id does not exist.
    #[error("remote document not found: {0}")]
    DocumentNotFound(String),

    /// The document exists but holds no file for the requested profile.
    #[error("profile '{profile}' not found in document '{document}'")]
    ProfileNotFound {
        document: String,
        profile: String,
    },

    /// The remote file body was truncated or omitted by the service.
    #[error("content of '{0}' is unavailable (truncated or omitted)")]
    ContentUnavailable(String),

    /// A settings or profile payload was not valid JSON.
    #[error("failed to decode '{name}': {detail}")]
    Decode {
        name: String,
        detail: String,
    },

    /// A settings payload decoded to something other than a JSON object.
    #[error("settings in '{0}' are not a JSON object")]
    NotAnObject(String),

    /// Generic I/O wrapper.
    #[error("store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreError {
    /// Build a [`StoreError::Decode`] from a `serde_json` error.
    pub fn decode(name: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Decode {
            name: name.into(),
            detail: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync engine errors
// ---------------------------------------------------------------------------

/// Errors from the reconciliation pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another reconciliation is already running on this engine.
    #[error("reconciliation already in progress for profile '{profile}'")]
    AlreadyRunning {
        profile: String,
    },

    /// Reading the local snapshot failed.
    #[error("failed to read local profile: {0}")]
    LocalRead(#[source] StoreError),

    /// Fetching or decoding the remote snapshot failed.
    #[error("failed to read remote profile: {0}")]
    RemoteRead(#[source] StoreError),

    /// The merged tree could not be turned back into a profile.
    #[error("merged snapshot is malformed: {0}")]
    MalformedMerge(String),

    /// A profile with this name already exists remotely.
    #[error("profile '{profile}' already exists")]
    ProfileExists {
        profile: String,
    },

    /// The profile is the one this machine is using.
    #[error("profile '{profile}' is active on this machine; switch to another profile first")]
    ActiveProfile {
        profile: String,
    },

    /// Writing a profile to one side failed.
    #[error("failed to write profile to {target}: {source}")]
    Persist {
        target: &'static str,
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
