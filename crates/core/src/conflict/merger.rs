//! Merge-apply utilities.
//!
//! Every resolution strategy writes its chosen values through a
//! [`MergeAccumulator`]. The accumulator owns a private tree allocated per
//! resolution call, so input snapshots are never mutated and concurrent
//! resolutions never share state.

use serde_json::{Map, Value};
use tracing::trace;

use crate::tree::{format_path, ConfigTree};

/// Assign `value` at `path`, creating missing intermediate objects.
///
/// An intermediate key that holds a non-object value is replaced by an empty
/// object so the walk can continue. An empty path is a no-op.
pub fn set_nested_value(tree: &mut ConfigTree, path: &[String], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = tree;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(next) => current = next,
            None => return,
        }
    }

    current.insert(leaf.clone(), value);
}

/// Remove the leaf at `path`, returning the removed value.
///
/// Missing intermediates mean there is nothing to remove. Parent objects are
/// left in place even if they become empty.
pub fn remove_nested_value(tree: &mut ConfigTree, path: &[String]) -> Option<Value> {
    let (leaf, parents) = path.split_last()?;

    let mut current = tree;
    for key in parents {
        current = current.get_mut(key)?.as_object_mut()?;
    }
    current.remove(leaf)
}

/// Look up the value at `path`.
pub fn get_nested_value<'a>(tree: &'a ConfigTree, path: &[String]) -> Option<&'a Value> {
    let (leaf, parents) = path.split_last()?;

    let mut current = tree;
    for key in parents {
        current = current.get(key)?.as_object()?;
    }
    current.get(leaf)
}

/// Private result tree for a single resolution call.
#[derive(Debug, Default)]
pub struct MergeAccumulator {
    tree: ConfigTree,
    applied: usize,
}

impl MergeAccumulator {
    /// Start from an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start from a copy of `base`.
    pub fn from_base(base: &ConfigTree) -> Self {
        Self {
            tree: base.clone(),
            applied: 0,
        }
    }

    /// Write the chosen value at `path`. `None` means the chosen side does
    /// not have the key, so it is removed from the result.
    pub fn apply(&mut self, path: &[String], value: Option<&Value>) {
        trace!(path = %format_path(path), present = value.is_some(), "applying merge value");
        match value {
            Some(v) => set_nested_value(&mut self.tree, path, v.clone()),
            None => {
                remove_nested_value(&mut self.tree, path);
            }
        }
        self.applied += 1;
    }

    /// Number of values applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Consume the accumulator and return the merged tree.
    pub fn into_tree(self) -> ConfigTree {
        self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn obj(value: Value) -> ConfigTree {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut tree = ConfigTree::new();
        set_nested_value(&mut tree, &path(&["a", "b", "c"]), json!(1));
        assert_eq!(Value::Object(tree), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_keeps_siblings() {
        let mut tree = obj(json!({"a": {"keep": true, "b": 1}}));
        set_nested_value(&mut tree, &path(&["a", "b"]), json!(2));
        assert_eq!(Value::Object(tree), json!({"a": {"keep": true, "b": 2}}));
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let mut tree = obj(json!({"a": 5}));
        set_nested_value(&mut tree, &path(&["a", "b"]), json!("x"));
        assert_eq!(Value::Object(tree), json!({"a": {"b": "x"}}));
    }

    #[test]
    fn test_set_empty_path_is_noop() {
        let mut tree = obj(json!({"a": 1}));
        set_nested_value(&mut tree, &[], json!(2));
        assert_eq!(Value::Object(tree), json!({"a": 1}));
    }

    #[test]
    fn test_remove_and_get() {
        let mut tree = obj(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(get_nested_value(&tree, &path(&["a", "c"])), Some(&json!(2)));
        assert_eq!(remove_nested_value(&mut tree, &path(&["a", "b"])), Some(json!(1)));
        assert_eq!(remove_nested_value(&mut tree, &path(&["x", "y"])), None);
        assert_eq!(Value::Object(tree), json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_accumulator_does_not_touch_base() {
        let base = obj(json!({"a": 1, "b": 2}));
        let mut acc = MergeAccumulator::from_base(&base);
        acc.apply(&path(&["a"]), Some(&json!(10)));
        acc.apply(&path(&["b"]), None);
        assert_eq!(acc.applied(), 2);

        assert_eq!(Value::Object(acc.into_tree()), json!({"a": 10}));
        assert_eq!(Value::Object(base), json!({"a": 1, "b": 2}));
    }
}
