//! Conflict detection logic.
//!
//! Given a local and a remote [`ConfigTree`], the detector walks both trees
//! in step and reports every leaf whose values differ. Objects present on
//! both sides are recursed into; everything else (scalars, arrays, null, a
//! missing key, or an object facing a non-object) is compared as a whole.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::tree::{format_path, json_eq, object_timestamp, type_name, ConfigTree};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Categorisation of a conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both sides hold a value of the same JSON type.
    Modified,
    /// Both sides hold a value but of different JSON types.
    TypeMismatch,
    /// Only the local side has the key.
    LocalOnly,
    /// Only the remote side has the key.
    RemoteOnly,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Modified => write!(f, "modified"),
            Self::TypeMismatch => write!(f, "type_mismatch"),
            Self::LocalOnly => write!(f, "local_only"),
            Self::RemoteOnly => write!(f, "remote_only"),
        }
    }
}

/// A single point of divergence between the local and remote trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Keys from the root down to the divergent value.
    pub path: Vec<String>,
    /// Local value, `None` when the key is missing locally.
    pub local_value: Option<Value>,
    /// Remote value, `None` when the key is missing remotely.
    pub remote_value: Option<Value>,
    /// `_timestamp` of the local parent object, if any.
    pub local_timestamp: Option<i64>,
    /// `_timestamp` of the remote parent object, if any.
    pub remote_timestamp: Option<i64>,
    /// How the two values differ.
    pub kind: ConflictKind,
}

impl Conflict {
    /// Build a conflict, deriving its [`ConflictKind`] from the two values.
    pub fn new(path: Vec<String>, local_value: Option<Value>, remote_value: Option<Value>) -> Self {
        let kind = classify(local_value.as_ref(), remote_value.as_ref());
        Self {
            path,
            local_value,
            remote_value,
            local_timestamp: None,
            remote_timestamp: None,
            kind,
        }
    }

    /// Attach parent timestamps.
    pub fn with_timestamps(mut self, local: Option<i64>, remote: Option<i64>) -> Self {
        self.local_timestamp = local;
        self.remote_timestamp = remote;
        self
    }

    /// Dotted form of the path.
    pub fn dotted_path(&self) -> String {
        format_path(&self.path)
    }

    /// Fill in missing timestamps from snapshot-level defaults.
    ///
    /// Timestamps already taken from a `_timestamp` field are kept.
    pub fn fill_missing_timestamps(&mut self, local: Option<i64>, remote: Option<i64>) {
        if self.local_timestamp.is_none() {
            self.local_timestamp = local;
        }
        if self.remote_timestamp.is_none() {
            self.remote_timestamp = remote;
        }
    }
}

fn classify(local: Option<&Value>, remote: Option<&Value>) -> ConflictKind {
    match (local, remote) {
        (Some(l), Some(r)) if type_name(l) == type_name(r) => ConflictKind::Modified,
        (Some(_), Some(_)) => ConflictKind::TypeMismatch,
        (Some(_), None) => ConflictKind::LocalOnly,
        // (None, None) cannot diverge; report it as remote-only for totality.
        (None, _) => ConflictKind::RemoteOnly,
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Stateless conflict detector that compares two configuration trees.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Compare `local` and `remote` and return every divergent leaf.
    ///
    /// Keys are visited in lexical order of the union of both sides, depth
    /// first, so identical inputs always produce an identical list. The list
    /// is empty exactly when the two trees are deeply equal.
    pub fn detect(local: &ConfigTree, remote: &ConfigTree) -> Vec<Conflict> {
        info!(
            local_keys = local.len(),
            remote_keys = remote.len(),
            "detecting conflicts"
        );

        let mut conflicts = Vec::new();
        let mut path = Vec::new();
        walk(local, remote, &mut path, &mut conflicts);

        info!(count = conflicts.len(), "conflict detection complete");
        conflicts
    }
}

fn walk(
    local: &ConfigTree,
    remote: &ConfigTree,
    path: &mut Vec<String>,
    conflicts: &mut Vec<Conflict>,
) {
    let keys: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();

    for key in keys {
        let local_value = local.get(key);
        let remote_value = remote.get(key);
        path.push(key.clone());

        match (local_value, remote_value) {
            (Some(Value::Object(l)), Some(Value::Object(r))) => walk(l, r, path, conflicts),
            (Some(l), Some(r)) if json_eq(l, r) => {}
            (l, r) => {
                let conflict = Conflict::new(path.clone(), l.cloned(), r.cloned())
                    .with_timestamps(object_timestamp(local), object_timestamp(remote));
                debug!(
                    path = %conflict.dotted_path(),
                    kind = %conflict.kind,
                    "conflict detected"
                );
                conflicts.push(conflict);
            }
        }

        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> ConfigTree {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn paths(conflicts: &[Conflict]) -> Vec<String> {
        conflicts.iter().map(Conflict::dotted_path).collect()
    }

    #[test]
    fn test_identical_trees_have_no_conflicts() {
        let tree = obj(json!({
            "editor": {"fontSize": 14, "rulers": [80, 120]},
            "theme": "dark",
            "nothing": null
        }));
        assert!(ConflictDetector::detect(&tree, &tree).is_empty());
    }

    #[test]
    fn test_empty_trees() {
        assert!(ConflictDetector::detect(&ConfigTree::new(), &ConfigTree::new()).is_empty());
    }

    #[test]
    fn test_nested_path() {
        let local = obj(json!({"a": {"b": {"c": 1}}}));
        let remote = obj(json!({"a": {"b": {"c": 2}}}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].path, vec!["a", "b", "c"]);
        assert_eq!(conflicts[0].local_value, Some(json!(1)));
        assert_eq!(conflicts[0].remote_value, Some(json!(2)));
        assert_eq!(conflicts[0].kind, ConflictKind::Modified);
    }

    #[test]
    fn test_type_mismatch_is_not_recursed() {
        let local = obj(json!({"a": {"x": 1}}));
        let remote = obj(json!({"a": 5}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].path, vec!["a"]);
        assert_eq!(conflicts[0].local_value, Some(json!({"x": 1})));
        assert_eq!(conflicts[0].remote_value, Some(json!(5)));
        assert_eq!(conflicts[0].kind, ConflictKind::TypeMismatch);
    }

    #[test]
    fn test_null_against_object() {
        let local = obj(json!({"a": null}));
        let remote = obj(json!({"a": {"b": 1}}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(paths(&conflicts), vec!["a"]);
        assert_eq!(conflicts[0].local_value, Some(Value::Null));
        assert_eq!(conflicts[0].kind, ConflictKind::TypeMismatch);
    }

    #[test]
    fn test_missing_keys() {
        let local = obj(json!({"only_local": true}));
        let remote = obj(json!({"only_remote": [1]}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(paths(&conflicts), vec!["only_local", "only_remote"]);
        assert_eq!(conflicts[0].remote_value, None);
        assert_eq!(conflicts[0].kind, ConflictKind::LocalOnly);
        assert_eq!(conflicts[1].local_value, None);
        assert_eq!(conflicts[1].kind, ConflictKind::RemoteOnly);
    }

    #[test]
    fn test_arrays_are_atomic() {
        let local = obj(json!({"list": [1, {"x": 1}, 3]}));
        let remote = obj(json!({"list": [1, {"x": 2}, 3]}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(paths(&conflicts), vec!["list"]);
        assert_eq!(conflicts[0].local_value, Some(json!([1, {"x": 1}, 3])));

        let reordered = obj(json!({"list": [3, {"x": 1}, 1]}));
        assert_eq!(ConflictDetector::detect(&local, &reordered).len(), 1);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let local = obj(json!({"editor": {"fontSize": 14}, "list": [1, {"x": 2}]}));
        let remote: ConfigTree =
            serde_json::from_str(r#"{"editor": {"fontSize": 14.0}, "list": [1, {"x": 2.0}]}"#)
                .unwrap();
        assert!(ConflictDetector::detect(&local, &remote).is_empty());

        let remote = obj(json!({"editor": {"fontSize": 14.5}, "list": [1, {"x": 2}]}));
        assert_eq!(
            paths(&ConflictDetector::detect(&local, &remote)),
            vec!["editor.fontSize"]
        );
    }

    #[test]
    fn test_null_is_not_missing() {
        let local = obj(json!({"a": null}));
        let conflicts = ConflictDetector::detect(&local, &ConfigTree::new());

        assert_eq!(paths(&conflicts), vec!["a"]);
        assert_eq!(conflicts[0].local_value, Some(Value::Null));
        assert_eq!(conflicts[0].remote_value, None);
        assert_eq!(conflicts[0].kind, ConflictKind::LocalOnly);
    }

    #[test]
    fn test_order_is_lexical_and_depth_first() {
        let local = obj(json!({"z": 1, "b": {"y": 1, "a": 1}, "a": 1}));
        let remote = obj(json!({"a": 2, "b": {"a": 2, "y": 2}, "z": 2, "m": 0}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        assert_eq!(paths(&conflicts), vec!["a", "b.a", "b.y", "m", "z"]);
        assert_eq!(conflicts, ConflictDetector::detect(&local, &remote));
    }

    #[test]
    fn test_symmetry_swaps_values() {
        let a = obj(json!({"x": 1, "n": {"k": "v"}, "only_a": true}));
        let b = obj(json!({"x": 2, "n": {"k": "w"}, "only_b": false}));

        let ab = ConflictDetector::detect(&a, &b);
        let ba = ConflictDetector::detect(&b, &a);

        assert_eq!(paths(&ab), paths(&ba));
        for (forward, backward) in ab.iter().zip(&ba) {
            assert_eq!(forward.local_value, backward.remote_value);
            assert_eq!(forward.remote_value, backward.local_value);
        }
    }

    #[test]
    fn test_parent_timestamps_are_attached() {
        let local = obj(json!({"editor": {"_timestamp": 200, "tabSize": 2}}));
        let remote = obj(json!({"editor": {"tabSize": 4}, "_timestamp": 999}));
        let conflicts = ConflictDetector::detect(&local, &remote);

        // `_timestamp` fields are ordinary keys and diverge too.
        assert_eq!(paths(&conflicts), vec!["_timestamp", "editor._timestamp", "editor.tabSize"]);

        let tab = &conflicts[2];
        assert_eq!(tab.local_timestamp, Some(200));
        assert_eq!(tab.remote_timestamp, None);

        let root = &conflicts[0];
        assert_eq!(root.local_timestamp, None);
        assert_eq!(root.remote_timestamp, Some(999));
    }

    #[test]
    fn test_fill_missing_timestamps_keeps_existing() {
        let mut conflict = Conflict::new(vec!["a".into()], Some(json!(1)), Some(json!(2)))
            .with_timestamps(Some(5), None);
        conflict.fill_missing_timestamps(Some(100), Some(200));
        assert_eq!(conflict.local_timestamp, Some(5));
        assert_eq!(conflict.remote_timestamp, Some(200));
    }
}
