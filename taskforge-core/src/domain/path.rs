//! Compiled dotted field paths
//!
//! Transforms address nested fields with dotted strings such as
//! `worker.env.HOOK_PROJECT`. A [`FieldPath`] is parsed once and then used to
//! read and write a task's field tree.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaskgraphError};

/// A dotted path into a nested mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    ///
    /// # Errors
    /// Returns `InvalidPath` if the path is empty or has an empty segment
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(TaskgraphError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment
    pub fn leaf(&self) -> &str {
        // parse() guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Read the value at this path
    ///
    /// Returns `None` when any segment is missing or an intermediate value is
    /// not a mapping.
    pub fn get<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = root;
        for segment in parents {
            current = current.get(segment)?.as_object()?;
        }
        current.get(last)
    }

    /// Mutable access to the value at this path
    pub fn get_mut<'a>(&self, root: &'a mut Map<String, Value>) -> Option<&'a mut Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = root;
        for segment in parents {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.get_mut(last)
    }

    /// Write a value at this path, creating intermediate mappings
    ///
    /// # Errors
    /// Returns `InvalidPath` if an intermediate value exists but is not a
    /// mapping.
    pub fn set(&self, root: &mut Map<String, Value>, value: Value) -> Result<()> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(TaskgraphError::InvalidPath(self.to_string()));
        };
        let mut current = root;
        for segment in parents {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry
                .as_object_mut()
                .ok_or_else(|| TaskgraphError::InvalidPath(self.to_string()))?;
        }
        current.insert(last.clone(), value);
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = TaskgraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Map<String, Value> {
        json!({
            "worker": { "env": { "HOOK_PROJECT": "autoland" }, "push": false },
            "name": "x"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_parse() {
        let path = FieldPath::parse("worker.env.HOOK_PROJECT").unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.leaf(), "HOOK_PROJECT");
        assert_eq!(path.to_string(), "worker.env.HOOK_PROJECT");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("worker..push").is_err());
        assert!(FieldPath::parse(".push").is_err());
    }

    #[test]
    fn test_get() {
        let root = tree();
        let path: FieldPath = "worker.env.HOOK_PROJECT".parse().unwrap();
        assert_eq!(path.get(&root), Some(&json!("autoland")));

        let missing: FieldPath = "worker.env.MISSING".parse().unwrap();
        assert_eq!(missing.get(&root), None);

        // Intermediate is a scalar
        let through_scalar: FieldPath = "name.inner".parse().unwrap();
        assert_eq!(through_scalar.get(&root), None);
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut root = tree();
        let path: FieldPath = "treeherder.symbol".parse().unwrap();
        path.set(&mut root, json!("B")).unwrap();
        assert_eq!(root["treeherder"]["symbol"], json!("B"));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut root = tree();
        let path: FieldPath = "name.inner".parse().unwrap();
        assert!(path.set(&mut root, json!(1)).is_err());
    }
}
