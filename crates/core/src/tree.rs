//! The configuration tree shape shared by the detector and the resolver.
//!
//! A [`ConfigTree`] is a JSON object: string keys mapping to
//! `serde_json::Value`, which is already a tagged union of null, bool,
//! number, string, array and nested object. Recursion matches on
//! `Value::Object` instead of probing types at runtime.

use serde_json::{Map, Value};

/// A nested key/value configuration snapshot.
pub type ConfigTree = Map<String, Value>;

/// Field name carrying a per-object modification timestamp (epoch millis).
pub const TIMESTAMP_KEY: &str = "_timestamp";

/// Render a key path in dotted form, e.g. `editor.fontSize`.
///
/// The empty path renders as `<root>`.
pub fn format_path(path: &[String]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.join(".")
}

/// Short JSON type name of a value, used for classification and display.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deep structural equality with numbers compared by value, so `14` and
/// `14.0` are equal. Arrays compare element-wise in order.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => tree_eq(x, y),
        _ => a == b,
    }
}

/// [`json_eq`] over two trees.
pub fn tree_eq(a: &ConfigTree, b: &ConfigTree) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| json_eq(value, other)))
}

/// Read the `_timestamp` field of an object, if present and numeric.
///
/// Integral values are taken as-is; fractional millisecond values are
/// truncated.
pub fn object_timestamp(object: &ConfigTree) -> Option<i64> {
    let value = object.get(TIMESTAMP_KEY)?;
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
        .or_else(|| value.as_f64().map(|v| v as i64))
}

/// Compact single-line rendering of an optional value for prompts and logs.
///
/// A missing value renders as `<unset>`.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| v.to_string()),
        None => "<unset>".to_string(),
    }
}
