//! End-to-end tests for profile reconciliation.
//!
//! These tests exercise the real `SyncEngine` with:
//! - A file-backed local store (settings, extensions, profile record)
//! - A file-backed remote store (one JSON document per id)
//! - Scripted prompts standing in for an interactive terminal
//!
//! Everything lives in a temporary directory; no network I/O.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use profilesync_core::config::{LocalConfig, RemoteConfig, StrategySetting, SyncConfig, SyncSection};
use profilesync_core::models::{Profile, RemoteDocument};
use profilesync_core::prompt::ScriptedPrompter;
use profilesync_core::store::{FileRemoteStore, RemoteStore};
use profilesync_core::sync_engine::{Outcome, SyncEngine};
use profilesync_core::{AbortReason, ConfigTree};

// ===========================================================================
// Helpers
// ===========================================================================

const DOC: &str = "e2e-doc";

fn obj(value: Value) -> ConfigTree {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn make_config(dir: &Path, strategy: StrategySetting, ignored: &[&str]) -> SyncConfig {
    SyncConfig {
        sync: SyncSection {
            strategy,
            ignored_paths: ignored.iter().map(|s| s.to_string()).collect(),
            ..SyncSection::default()
        },
        local: LocalConfig {
            settings_path: dir.join("User").join("settings.json"),
            extensions_path: dir.join("User").join("extensions.json"),
            record_path: dir.join("state").join("profile.json"),
        },
        remote: RemoteConfig {
            document_id: DOC.into(),
            store_dir: dir.join("remote"),
        },
    }
}

fn write_local(config: &SyncConfig, settings: Value, extensions: &[&str]) {
    std::fs::create_dir_all(config.local.settings_path.parent().unwrap()).unwrap();
    std::fs::write(&config.local.settings_path, settings.to_string()).unwrap();
    std::fs::write(
        &config.local.extensions_path,
        serde_json::to_string(extensions).unwrap(),
    )
    .unwrap();
}

fn read_local_settings(config: &SyncConfig) -> Value {
    let text = std::fs::read_to_string(&config.local.settings_path).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Seed the remote document with a profile stored as encoded settings text,
/// the way the hosted service keeps it.
fn seed_remote(config: &SyncConfig, settings: Value, extensions: &[&str], modified_at: i64) {
    let mut profile = Profile::new(
        "default",
        ConfigTree::new(),
        extensions.iter().map(|s| s.to_string()).collect(),
        modified_at,
    );
    profile.settings = profilesync_core::models::ProfileSettings::Encoded(settings.to_string());

    let mut document = RemoteDocument::new(DOC, Some("seeded".into()));
    document.put_profile(&profile).unwrap();
    let path = config.remote.store_dir.join(format!("{DOC}.json"));
    std::fs::create_dir_all(&config.remote.store_dir).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
}

async fn remote_settings(config: &SyncConfig) -> ConfigTree {
    FileRemoteStore::new(config.remote.store_dir.clone())
        .fetch(DOC)
        .await
        .unwrap()
        .profile("default")
        .unwrap()
        .settings_tree()
        .unwrap()
}

fn engine(config: &SyncConfig, answers: Vec<Option<usize>>) -> SyncEngine {
    SyncEngine::from_config(config, Arc::new(ScriptedPrompter::new(answers)))
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_first_sync_publishes_then_second_is_in_sync() {
    let tmp = TempDir::new().unwrap();
    let config = make_config(tmp.path(), StrategySetting::Ask, &[]);
    write_local(&config, json!({"editor.fontSize": 14}), &["rust-lang.rust-analyzer"]);

    let engine = engine(&config, vec![]);
    let first = engine.reconcile("default").await.unwrap();
    assert_eq!(first.outcome, Outcome::Published);
    assert_eq!(
        remote_settings(&config).await,
        obj(json!({"editor.fontSize": 14}))
    );

    let second = engine.reconcile("default").await.unwrap();
    assert_eq!(second.outcome, Outcome::InSync);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_prefer_remote_updates_local_files() {
    let tmp = TempDir::new().unwrap();
    let config = make_config(tmp.path(), StrategySetting::PreferRemote, &[]);
    write_local(
        &config,
        json!({"editor": {"fontSize": 12, "tabSize": 4}, "theme": "light"}),
        &["a.one"],
    );
    seed_remote(
        &config,
        json!({"editor": {"fontSize": 16, "tabSize": 4}, "theme": "dark"}),
        &["a.one", "b.two"],
        1,
    );

    let report = engine(&config, vec![]).reconcile("default").await.unwrap();
    assert_eq!(report.conflicts.len(), 3);
    assert!(matches!(
        report.outcome,
        Outcome::Merged { applied: 3, local_written: true, remote_written: false }
    ));

    assert_eq!(
        read_local_settings(&config),
        json!({"editor": {"fontSize": 16, "tabSize": 4}, "theme": "dark"})
    );
    let extensions: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&config.local.extensions_path).unwrap())
            .unwrap();
    assert_eq!(extensions, vec!["a.one", "b.two"]);
}

#[tokio::test]
async fn test_interactive_manual_mixes_sides() {
    let tmp = TempDir::new().unwrap();
    let config = make_config(tmp.path(), StrategySetting::Ask, &[]);
    write_local(&config, json!({"a": 1, "b": 1}), &[]);
    seed_remote(&config, json!({"a": 2, "b": 2}), &[], 1);

    // Strategy prompt picks Manual (index 3), then remote for `a`, local for `b`.
    let report = engine(&config, vec![Some(3), Some(1), Some(0)])
        .reconcile("default")
        .await
        .unwrap();
    assert!(matches!(report.outcome, Outcome::Merged { applied: 2, .. }));

    assert_eq!(read_local_settings(&config), json!({"a": 2, "b": 1}));
    assert_eq!(remote_settings(&config).await, obj(json!({"a": 2, "b": 1})));
}

#[tokio::test]
async fn test_cancelled_manual_leaves_both_sides_untouched() {
    let tmp = TempDir::new().unwrap();
    let config = make_config(tmp.path(), StrategySetting::Manual, &[]);
    write_local(&config, json!({"a": 1, "b": 1}), &[]);
    seed_remote(&config, json!({"a": 2, "b": 2}), &[], 1);

    let report = engine(&config, vec![Some(1), None])
        .reconcile("default")
        .await
        .unwrap();
    assert_eq!(
        report.outcome,
        Outcome::Aborted {
            reason: AbortReason::ManualCancelled {
                index: 1,
                path: "settings.b".into()
            }
        }
    );

    assert_eq!(read_local_settings(&config), json!({"a": 1, "b": 1}));
    assert_eq!(remote_settings(&config).await, obj(json!({"a": 2, "b": 2})));
    assert!(!config.local.record_path.exists());
}

#[tokio::test]
async fn test_ignored_glob_keeps_window_settings_per_device() {
    let tmp = TempDir::new().unwrap();
    let config = make_config(tmp.path(), StrategySetting::PreferLocal, &["settings.window.*"]);
    write_local(&config, json!({"window": {"zoomLevel": 1}, "theme": "light"}), &[]);
    seed_remote(&config, json!({"window": {"zoomLevel": 3}, "theme": "dark"}), &[], 1);

    let report = engine(&config, vec![]).reconcile("default").await.unwrap();
    assert_eq!(report.ignored, 1);

    assert_eq!(
        remote_settings(&config).await,
        obj(json!({"window": {"zoomLevel": 3}, "theme": "light"}))
    );
    assert_eq!(
        read_local_settings(&config),
        json!({"window": {"zoomLevel": 1}, "theme": "light"})
    );
}
