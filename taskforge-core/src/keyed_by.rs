//! Keyed-by resolution
//!
//! Configuration values may be written as a conditional tree:
//!
//! ```text
//! worker:
//!   push:
//!     by-project:
//!       mozilla-central: true
//!       try*: false
//!       default: false
//! ```
//!
//! Resolution collapses such a tree into the alternative selected by the
//! value of the named parameter. Exact keys win over glob patterns, glob
//! patterns are tried in mapping order, and `default` is the fallback.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::path::FieldPath;
use crate::error::{Result, TaskgraphError};
use crate::parameters::Parameters;

const DEFAULT_KEY: &str = "default";

/// Values a keyed-by block can be matched against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedByValues {
    values: BTreeMap<String, String>,
}

impl KeyedByValues {
    /// Create an empty set of values
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, &value.into());
        self
    }

    /// Add a value; mappings, lists and nulls are ignored
    pub fn insert(&mut self, name: impl Into<String>, value: &Value) {
        if let Some(key) = key_string(value) {
            self.values.insert(name.into(), key);
        }
    }

    /// Values of every parameter in the store
    pub fn from_params(params: &Parameters) -> Self {
        let mut values = Self::new();
        for (name, value) in params.iter() {
            values.insert(name, value);
        }
        values
    }

    /// Overlay scalar entries of a mapping (typically a task's attributes)
    pub fn extend_from_map(&mut self, map: &Map<String, Value>) {
        for (name, value) in map {
            self.insert(name.as_str(), value);
        }
    }

    /// Get the string form of a value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// String form used for matching scalar values against alternative keys
fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// If `value` is a keyed-by block, return the parameter name and alternatives
pub fn keyed_by_param(value: &Value) -> Option<(&str, &Map<String, Value>)> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    let (key, alternatives) = map.iter().next()?;
    let param = key.strip_prefix("by-")?;
    Some((param, alternatives.as_object()?))
}

/// Pick the alternative for `key`: exact match, then first glob, then default
fn select_alternative<'a>(
    alternatives: &'a Map<String, Value>,
    key: Option<&str>,
) -> Option<&'a Value> {
    if let Some(key) = key {
        if let Some(value) = alternatives.get(key) {
            return Some(value);
        }
        for (candidate, value) in alternatives {
            if candidate == DEFAULT_KEY {
                continue;
            }
            if let Ok(pattern) = glob::Pattern::new(candidate) {
                if pattern.matches(key) {
                    return Some(value);
                }
            }
        }
    }
    alternatives.get(DEFAULT_KEY)
}

/// Collapse a possibly keyed-by value
///
/// Nested keyed-by blocks are resolved until the value is no longer one.
/// A value that is not keyed-by is returned unchanged.
///
/// # Arguments
/// * `value` - The field value
/// * `field` - Dotted path of the field, for error messages
/// * `item_name` - Name of the item being resolved, for error messages
/// * `lookup` - Returns the value of a parameter by name
///
/// # Errors
/// Returns `KeyedByMatchFailed` when no alternative matches and there is no
/// `default`.
pub fn evaluate_keyed_by<F>(value: Value, field: &str, item_name: &str, lookup: F) -> Result<Value>
where
    F: Fn(&str) -> Option<String>,
{
    let mut value = value;
    loop {
        let next = match keyed_by_param(&value) {
            None => return Ok(value),
            Some((param, alternatives)) => {
                let key = lookup(param);
                match select_alternative(alternatives, key.as_deref()) {
                    Some(chosen) => {
                        debug!(
                            "Resolved '{}' of '{}' by-{}={}",
                            field,
                            item_name,
                            param,
                            key.as_deref().unwrap_or("<missing>")
                        );
                        chosen.clone()
                    }
                    None => {
                        return Err(TaskgraphError::KeyedByMatchFailed {
                            item: item_name.to_string(),
                            field: field.to_string(),
                            keyed_by: param.to_string(),
                            value: key.unwrap_or_else(|| "<missing>".to_string()),
                        });
                    }
                }
            }
        };
        value = next;
    }
}

/// Resolve the keyed-by field at `path` within `container`, in place
///
/// A missing field (or missing intermediate) leaves the container untouched.
/// When an intermediate value is a list, every mapping in it is resolved.
/// Parameter values come from `values` first, then from scalar fields of the
/// mapping that directly holds the field.
///
/// # Errors
/// Returns `KeyedByMatchFailed` when an alternative cannot be selected
pub fn resolve_keyed_by(
    container: &mut Map<String, Value>,
    path: &FieldPath,
    item_name: &str,
    values: &KeyedByValues,
) -> Result<()> {
    resolve_segments(container, path.segments(), path, item_name, values)
}

fn resolve_segments(
    container: &mut Map<String, Value>,
    segments: &[String],
    path: &FieldPath,
    item_name: &str,
    values: &KeyedByValues,
) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };

    if !rest.is_empty() {
        return match container.get_mut(first) {
            Some(Value::Object(inner)) => resolve_segments(inner, rest, path, item_name, values),
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(inner) = item {
                        resolve_segments(inner, rest, path, item_name, values)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        };
    }

    let resolved = {
        let Some(value) = container.get(first) else {
            return Ok(());
        };
        if keyed_by_param(value).is_none() {
            return Ok(());
        }
        let holder: &Map<String, Value> = container;
        evaluate_keyed_by(value.clone(), &path.to_string(), item_name, |name| {
            values
                .get(name)
                .map(str::to_string)
                .or_else(|| holder.get(name).and_then(key_string))
        })?
    };
    container.insert(first.clone(), resolved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn container(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn push_task() -> Map<String, Value> {
        container(json!({
            "name": "push-apk",
            "worker": {
                "push": { "by-project": { "mozilla-central": "yes", "default": "no" } }
            }
        }))
    }

    #[test]
    fn test_exact_match() {
        let mut task = push_task();
        let path = FieldPath::parse("worker.push").unwrap();
        let values = KeyedByValues::new().with("project", "mozilla-central");

        resolve_keyed_by(&mut task, &path, "push-apk", &values).unwrap();
        assert_eq!(task["worker"]["push"], json!("yes"));
    }

    #[test]
    fn test_default_match() {
        let mut task = push_task();
        let path = FieldPath::parse("worker.push").unwrap();
        let values = KeyedByValues::new().with("project", "maple");

        resolve_keyed_by(&mut task, &path, "push-apk", &values).unwrap();
        assert_eq!(task["worker"]["push"], json!("no"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut task = push_task();
        let path = FieldPath::parse("worker.push").unwrap();
        let values = KeyedByValues::new().with("project", "mozilla-central");

        resolve_keyed_by(&mut task, &path, "push-apk", &values).unwrap();
        let once = task.clone();
        resolve_keyed_by(&mut task, &path, "push-apk", &KeyedByValues::new()).unwrap();
        assert_eq!(task, once);
    }

    #[test]
    fn test_exact_beats_glob_and_first_glob_wins() {
        let alternatives = json!({
            "by-platform": {
                "linux*": "glob-one",
                "linux64*": "glob-two",
                "linux64-asan": "exact",
                "default": "fallback"
            }
        });

        let lookup = |platform: &'static str| move |_: &str| Some(platform.to_string());
        let exact =
            evaluate_keyed_by(alternatives.clone(), "f", "t", lookup("linux64-asan")).unwrap();
        assert_eq!(exact, json!("exact"));

        let glob =
            evaluate_keyed_by(alternatives.clone(), "f", "t", lookup("linux64-tsan")).unwrap();
        assert_eq!(glob, json!("glob-one"));

        let fallback = evaluate_keyed_by(alternatives, "f", "t", lookup("macosx")).unwrap();
        assert_eq!(fallback, json!("fallback"));
    }

    #[test]
    fn test_nested_resolution() {
        let value = json!({
            "by-release-level": {
                "production": {
                    "by-project": { "mozilla-release": "ship", "default": "hold" }
                },
                "staging": "dry-run"
            }
        });
        let values = KeyedByValues::new()
            .with("release-level", "production")
            .with("project", "mozilla-release");

        let resolved =
            evaluate_keyed_by(value, "f", "t", |n| values.get(n).map(str::to_string)).unwrap();
        assert_eq!(resolved, json!("ship"));
    }

    #[test]
    fn test_no_match_fails() {
        let mut task = container(json!({
            "scopes": { "by-level": { "3": ["secret:prod"], "1": ["secret:try"] } }
        }));
        let path = FieldPath::parse("scopes").unwrap();
        let values = KeyedByValues::new().with("level", "2");

        let err = resolve_keyed_by(&mut task, &path, "sign", &values).unwrap_err();
        match err {
            TaskgraphError::KeyedByMatchFailed {
                item,
                field,
                keyed_by,
                value,
            } => {
                assert_eq!(item, "sign");
                assert_eq!(field, "scopes");
                assert_eq!(keyed_by, "level");
                assert_eq!(value, "2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_numeric_values_match_string_keys() {
        let mut task = container(json!({
            "scopes": { "by-level": { "3": ["secret:prod"], "default": [] } }
        }));
        let path = FieldPath::parse("scopes").unwrap();
        let values = KeyedByValues::new().with("level", 3);

        resolve_keyed_by(&mut task, &path, "sign", &values).unwrap();
        assert_eq!(task["scopes"], json!(["secret:prod"]));
    }

    #[test]
    fn test_missing_value_uses_default_or_fails() {
        let mut task = push_task();
        let path = FieldPath::parse("worker.push").unwrap();
        resolve_keyed_by(&mut task, &path, "push-apk", &KeyedByValues::new()).unwrap();
        assert_eq!(task["worker"]["push"], json!("no"));

        let mut task = container(json!({ "x": { "by-project": { "central": 1 } } }));
        let path = FieldPath::parse("x").unwrap();
        let err = resolve_keyed_by(&mut task, &path, "t", &KeyedByValues::new()).unwrap_err();
        assert!(err.to_string().contains("<missing>"));
    }

    #[test]
    fn test_container_fields_supply_values() {
        let mut task = container(json!({
            "platform": "android",
            "worker-type": { "by-platform": { "android": "b-linux", "default": "b-win" } }
        }));
        let path = FieldPath::parse("worker-type").unwrap();
        resolve_keyed_by(&mut task, &path, "t", &KeyedByValues::new()).unwrap();
        assert_eq!(task["worker-type"], json!("b-linux"));
    }

    #[test]
    fn test_lists_are_fanned_out() {
        let mut task = container(json!({
            "fetches": [
                { "toolchain": { "by-platform": { "linux": "clang", "default": "gcc" } } },
                { "toolchain": "rust" }
            ]
        }));
        let path = FieldPath::parse("fetches.toolchain").unwrap();
        let values = KeyedByValues::new().with("platform", "linux");

        resolve_keyed_by(&mut task, &path, "t", &values).unwrap();
        assert_eq!(task["fetches"][0]["toolchain"], json!("clang"));
        assert_eq!(task["fetches"][1]["toolchain"], json!("rust"));
    }

    #[test]
    fn test_missing_path_is_untouched() {
        let mut task = push_task();
        let before = task.clone();
        let path = FieldPath::parse("run.command").unwrap();
        resolve_keyed_by(&mut task, &path, "t", &KeyedByValues::new()).unwrap();
        assert_eq!(task, before);
    }

    #[test]
    fn test_multi_key_mapping_is_not_keyed_by() {
        let value = json!({ "by-project": { "a": 1 }, "other": 2 });
        let resolved = evaluate_keyed_by(value.clone(), "f", "t", |_| None).unwrap();
        assert_eq!(resolved, value);
    }
}
