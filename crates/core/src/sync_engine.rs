//! Profile reconciliation engine.
//!
//! The [`SyncEngine`] runs one reconciliation per call:
//!
//! 1. Read the local profile and fetch the remote one.
//! 2. Detect conflicts between the two snapshot trees.
//! 3. Resolve them with the configured strategy (or ask which one to use).
//! 4. Persist the merged profile locally, then push it remotely.
//!
//! A resolution that is cancelled writes nothing. A lock flag prevents
//! overlapping runs on the same engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{StrategySetting, SyncConfig, SyncSection};
use crate::conflict::{AbortReason, Conflict, ConflictDetector, ConflictResolver, Resolution, Strategy};
use crate::errors::{StoreError, SyncError};
use crate::models::Profile;
use crate::prompt::Prompter;
use crate::store::{FileLocalStore, FileRemoteStore, LocalStore, RemoteStore};
use crate::tree::{tree_eq, ConfigTree};

/// Tag added to profiles created as the default.
const DEFAULT_TAG: &str = "default";

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How a reconciliation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Local and remote were already identical.
    InSync,
    /// The remote had no copy of the profile; the local one was pushed.
    Published,
    /// Conflicts were resolved and the merge persisted.
    Merged {
        /// Conflicts resolved by the strategy.
        applied: usize,
        local_written: bool,
        remote_written: bool,
    },
    /// Resolution did not complete; nothing was written.
    Aborted { reason: AbortReason },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InSync => write!(f, "in_sync"),
            Self::Published => write!(f, "published"),
            Self::Merged { .. } => write!(f, "merged"),
            Self::Aborted { .. } => write!(f, "aborted"),
        }
    }
}

/// Summary of one reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub id: Uuid,
    pub profile: String,
    /// Every conflict detected, including ignored ones.
    pub conflicts: Vec<Conflict>,
    /// Conflicts on ignored paths (kept local, left remote).
    pub ignored: usize,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Both sides of a profile, read but not yet compared.
#[derive(Debug, Clone)]
pub struct SnapshotPair {
    pub local: Profile,
    pub remote: Profile,
    pub local_tree: ConfigTree,
    pub remote_tree: ConfigTree,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates detect → resolve → persist for one document of profiles.
pub struct SyncEngine {
    document_id: String,
    options: SyncSection,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    prompter: Arc<dyn Prompter>,
    /// Set while a reconciliation runs.
    running: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        document_id: impl Into<String>,
        options: SyncSection,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            options,
            local,
            remote,
            prompter,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build an engine over the file-backed stores named in `config`.
    pub fn from_config(config: &SyncConfig, prompter: Arc<dyn Prompter>) -> Self {
        info!(document_id = %config.remote.document_id, "initializing sync engine");
        Self::new(
            config.remote.document_id.clone(),
            config.sync.clone(),
            Arc::new(FileLocalStore::from_config(&config.local)),
            Arc::new(FileRemoteStore::new(config.remote.store_dir.clone())),
            prompter,
        )
    }

    /// Replace the configured strategy.
    pub fn with_strategy(mut self, strategy: StrategySetting) -> Self {
        self.options.strategy = strategy;
        self
    }

    pub fn options(&self) -> &SyncSection {
        &self.options
    }

    /// Check if a reconciliation is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Names of the profiles stored remotely.
    pub async fn list_profiles(&self) -> Result<Vec<String>, SyncError> {
        let document = self
            .remote
            .fetch(&self.document_id)
            .await
            .map_err(SyncError::RemoteRead)?;
        Ok(document.profile_names())
    }

    /// Read both sides of `profile_name`.
    pub async fn snapshots(&self, profile_name: &str) -> Result<SnapshotPair, SyncError> {
        let local = self.read_local(profile_name)?;
        let remote = self
            .read_remote(profile_name)
            .await
            .map_err(SyncError::RemoteRead)?;
        Self::pair(local, remote)
    }

    /// Detect conflicts without resolving or writing anything.
    pub async fn diff(&self, profile_name: &str) -> Result<Vec<Conflict>, SyncError> {
        let pair = self.snapshots(profile_name).await?;
        Ok(self.detect(&pair))
    }

    // -----------------------------------------------------------------------
    // Profile management
    // -----------------------------------------------------------------------

    /// Name of the profile this machine last applied, if any.
    pub fn active_profile(&self) -> Result<Option<String>, SyncError> {
        self.local.active_profile().map_err(SyncError::LocalRead)
    }

    /// Publish the current local settings and extensions as a new profile.
    ///
    /// Fails with [`SyncError::ProfileExists`] when the remote document
    /// already holds `name`. The new profile becomes the active one locally.
    pub async fn create_profile(
        &self,
        name: &str,
        set_default: bool,
        tags: Vec<String>,
    ) -> Result<Profile, SyncError> {
        let existing = match self.remote.fetch(&self.document_id).await {
            Ok(document) => document.profile_names(),
            Err(StoreError::DocumentNotFound(_)) => Vec::new(),
            Err(e) => return Err(SyncError::RemoteRead(e)),
        };
        if existing.iter().any(|existing| existing == name) {
            return Err(SyncError::ProfileExists {
                profile: name.to_string(),
            });
        }

        let source = self
            .active_profile()?
            .unwrap_or_else(|| self.options.profile.clone());
        let current = self.read_local(&source)?;
        let settings = current.settings_tree().map_err(SyncError::LocalRead)?;

        let mut profile = Profile::new(
            name,
            settings,
            current.extensions,
            Utc::now().timestamp_millis(),
        );
        profile.default = set_default;
        profile.tags = tags;
        if set_default && !profile.tags.iter().any(|tag| tag == DEFAULT_TAG) {
            profile.tags.push(DEFAULT_TAG.to_string());
        }

        self.write_local(&profile)?;
        self.push_remote(&profile).await?;
        info!(profile = name, from = %source, "profile created");
        Ok(profile)
    }

    /// Apply the remote profile `name` to this machine and make it active.
    pub async fn switch_profile(&self, name: &str) -> Result<Profile, SyncError> {
        let profile = self
            .read_remote(name)
            .await
            .map_err(SyncError::RemoteRead)?;
        self.write_local(&profile)?;
        info!(profile = name, "switched profile");
        Ok(profile)
    }

    /// Remove the profile `name` from the remote document.
    ///
    /// The profile active on this machine cannot be deleted.
    pub async fn delete_profile(&self, name: &str) -> Result<(), SyncError> {
        if self.active_profile()?.as_deref() == Some(name) {
            return Err(SyncError::ActiveProfile {
                profile: name.to_string(),
            });
        }
        self.remote
            .delete_profile(&self.document_id, name)
            .await
            .map_err(|source| SyncError::Persist {
                target: "remote",
                source,
            })?;
        info!(profile = name, "profile deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Main entry point
    // -----------------------------------------------------------------------

    /// Reconcile `profile_name` between the local and remote stores.
    ///
    /// Cancellation is reported in [`ReconcileReport::outcome`], not as an
    /// error; errors are reserved for store failures.
    pub async fn reconcile(&self, profile_name: &str) -> Result<ReconcileReport, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning {
                profile: profile_name.to_string(),
            });
        }
        let _guard = SyncLockGuard(self.running.clone());

        let id = Uuid::new_v4();
        let span = info_span!("reconcile", %id, profile = profile_name);
        let started_at = Utc::now();

        let (conflicts, ignored, outcome) =
            self.do_reconcile(profile_name).instrument(span).await?;

        let report = ReconcileReport {
            id,
            profile: profile_name.to_string(),
            conflicts,
            ignored,
            outcome,
            started_at,
            completed_at: Utc::now(),
        };
        info!(
            %id,
            profile = profile_name,
            conflicts = report.conflicts.len(),
            outcome = %report.outcome,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn do_reconcile(
        &self,
        profile_name: &str,
    ) -> Result<(Vec<Conflict>, usize, Outcome), SyncError> {
        let local = self.read_local(profile_name)?;

        let remote = match self.read_remote(profile_name).await {
            Ok(remote) => remote,
            Err(StoreError::DocumentNotFound(_)) | Err(StoreError::ProfileNotFound { .. }) => {
                info!("no remote copy, publishing local profile");
                self.push_remote(&local).await?;
                return Ok((Vec::new(), 0, Outcome::Published));
            }
            Err(e) => return Err(SyncError::RemoteRead(e)),
        };

        let pair = Self::pair(local, remote)?;
        let conflicts = self.detect(&pair);
        if conflicts.is_empty() {
            return Ok((conflicts, 0, Outcome::InSync));
        }

        let (ignored, active): (Vec<Conflict>, Vec<Conflict>) =
            conflicts.iter().cloned().partition(|c| self.is_ignored(c));
        if !ignored.is_empty() {
            debug!(count = ignored.len(), "conflicts on ignored paths keep their local value");
        }

        let resolution = match self.options.strategy.fixed() {
            Some(strategy) => {
                ConflictResolver::resolve_with(&pair.local_tree, &active, strategy, self.prompter.as_ref())
                    .await
            }
            None => {
                ConflictResolver::resolve_interactive(&pair.local_tree, &active, self.prompter.as_ref())
                    .await
            }
        };

        let merged_local = match resolution {
            Resolution::Resolved(tree) => tree,
            Resolution::Aborted(reason) => {
                warn!(%reason, "reconciliation aborted, nothing written");
                let ignored_count = ignored.len();
                return Ok((conflicts, ignored_count, Outcome::Aborted { reason }));
            }
        };

        // Ignored paths keep each side's own value.
        let merged_remote =
            match ConflictResolver::resolve_onto(&merged_local, &ignored, Strategy::PreferRemote) {
                Resolution::Resolved(tree) => tree,
                Resolution::Aborted(reason) => {
                    return Ok((conflicts, ignored.len(), Outcome::Aborted { reason }));
                }
            };

        let now = Utc::now().timestamp_millis();
        let local_written = !tree_eq(&merged_local, &pair.local_tree);
        let remote_written = !tree_eq(&merged_remote, &pair.remote_tree);

        if local_written {
            let profile = Self::rebuild(&pair.local, &merged_local, now)?;
            self.write_local(&profile)?;
        }
        if remote_written {
            let profile = Self::rebuild(&pair.remote, &merged_remote, now)?;
            self.push_remote(&profile).await?;
        }

        let outcome = Outcome::Merged {
            applied: active.len(),
            local_written,
            remote_written,
        };
        Ok((conflicts, ignored.len(), outcome))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn read_local(&self, profile_name: &str) -> Result<Profile, SyncError> {
        self.local
            .read_profile(profile_name)
            .map_err(SyncError::LocalRead)
    }

    async fn read_remote(&self, profile_name: &str) -> Result<Profile, StoreError> {
        self.remote
            .fetch(&self.document_id)
            .await?
            .profile(profile_name)
    }

    fn write_local(&self, profile: &Profile) -> Result<(), SyncError> {
        self.local
            .write_profile(profile)
            .map_err(|source| SyncError::Persist {
                target: "local",
                source,
            })
    }

    async fn push_remote(&self, profile: &Profile) -> Result<(), SyncError> {
        self.remote
            .push_profile(&self.document_id, profile)
            .await
            .map_err(|source| SyncError::Persist {
                target: "remote",
                source,
            })
    }

    fn pair(local: Profile, remote: Profile) -> Result<SnapshotPair, SyncError> {
        let local_tree = local.to_tree().map_err(SyncError::LocalRead)?;
        let remote_tree = remote.to_tree().map_err(SyncError::RemoteRead)?;
        Ok(SnapshotPair {
            local,
            remote,
            local_tree,
            remote_tree,
        })
    }

    fn detect(&self, pair: &SnapshotPair) -> Vec<Conflict> {
        let mut conflicts = ConflictDetector::detect(&pair.local_tree, &pair.remote_tree);
        if self.options.timestamp_fallback {
            for conflict in &mut conflicts {
                conflict.fill_missing_timestamps(
                    Some(pair.local.modified_at),
                    Some(pair.remote.modified_at),
                );
            }
        }
        conflicts
    }

    fn is_ignored(&self, conflict: &Conflict) -> bool {
        let path = conflict.dotted_path();
        self.options
            .ignored_paths
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path))
    }

    fn rebuild(template: &Profile, tree: &ConfigTree, now: i64) -> Result<Profile, SyncError> {
        let mut profile = template.with_tree(tree).map_err(SyncError::MalformedMerge)?;
        profile.modified_at = now;
        Ok(profile)
    }
}

/// RAII guard that clears the running flag when dropped.
struct SyncLockGuard(Arc<AtomicBool>);

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
