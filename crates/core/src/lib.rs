//! profilesync core library.
//!
//! This crate provides the building blocks for reconciling an editor profile
//! between the local machine and a remote document: configuration, snapshot
//! trees, conflict detection and resolution, profile stores, and the sync
//! engine that ties them together.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod models;
pub mod prompt;
pub mod store;
pub mod sync_engine;
pub mod tree;

// Re-exports for convenience.
pub use config::SyncConfig;
pub use conflict::{
    set_nested_value, AbortReason, Conflict, ConflictDetector, ConflictKind, ConflictResolver,
    Resolution, Strategy,
};
pub use models::{Profile, RemoteDocument};
pub use prompt::{Prompter, ScriptedPrompter};
pub use sync_engine::{Outcome, ReconcileReport, SyncEngine};
pub use tree::ConfigTree;
