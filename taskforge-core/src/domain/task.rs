//! Task record domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::FieldPath;
use crate::error::{Result, TaskgraphError};

/// One unit of work flowing through a transform sequence
///
/// Only `name` is typed. Every other key (`attributes`, `treeherder`,
/// `worker`, `dependencies`, ...) lives in `fields` and is carried through
/// transforms that do not act on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TaskRecord {
    /// Create an empty record with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Map::new(),
        }
    }

    /// Build a record from a JSON value
    ///
    /// # Errors
    /// Returns `InvalidField` if the value is not a mapping or `name` is not
    /// a string.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            TaskgraphError::invalid_field("<unnamed>", "<record>", e.to_string())
        })
    }

    /// Convert the record back into a JSON mapping
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Label of the record within a kind
    ///
    /// An explicit `label` field wins; otherwise the label is
    /// `"{kind}-{name}"`, or just the kind for unnamed records.
    pub fn label(&self, kind: &str) -> String {
        if let Some(label) = self.fields.get("label").and_then(Value::as_str) {
            return label.to_string();
        }
        match &self.name {
            Some(name) => format!("{}-{}", kind, name),
            None => kind.to_string(),
        }
    }

    /// Get a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a top-level field
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Read a nested field
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        path.get(&self.fields)
    }

    /// Write a nested field, creating intermediate mappings
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        path.set(&mut self.fields, value)
    }

    /// The `attributes` mapping, if present
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.fields.get("attributes").and_then(Value::as_object)
    }

    /// A single attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes().and_then(|attrs| attrs.get(key))
    }

    /// Mutable `attributes` mapping, created when absent
    pub fn attributes_mut(&mut self) -> Result<&mut Map<String, Value>> {
        self.object_mut("attributes")
    }

    /// The `treeherder` mapping, if present
    pub fn treeherder(&self) -> Option<&Map<String, Value>> {
        self.fields.get("treeherder").and_then(Value::as_object)
    }

    /// Mutable `treeherder` mapping, created when absent
    pub fn treeherder_mut(&mut self) -> Result<&mut Map<String, Value>> {
        self.object_mut("treeherder")
    }

    /// Label stored in `primary-dependency`
    pub fn primary_dependency(&self) -> Option<&str> {
        self.fields.get("primary-dependency").and_then(Value::as_str)
    }

    /// Labels listed in `dependent-tasks`, in order
    ///
    /// Accepts either a mapping (values are labels) or a list of labels.
    pub fn dependent_tasks(&self) -> Vec<&str> {
        match self.fields.get("dependent-tasks") {
            Some(Value::Object(map)) => map.values().filter_map(Value::as_str).collect(),
            Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Labels listed in `soft-dependencies`
    pub fn soft_dependencies(&self) -> Vec<&str> {
        self.fields
            .get("soft-dependencies")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Append a label to `soft-dependencies` unless already present
    ///
    /// # Errors
    /// Returns `InvalidField` if `soft-dependencies` exists but is not a list
    pub fn add_soft_dependency(&mut self, label: &str) -> Result<()> {
        let task = self.display_name().to_string();
        let entry = self
            .fields
            .entry("soft-dependencies")
            .or_insert_with(|| Value::Array(Vec::new()));
        let list = entry.as_array_mut().ok_or_else(|| {
            TaskgraphError::invalid_field(task, "soft-dependencies", "is not a list")
        })?;
        if !list.iter().any(|v| v.as_str() == Some(label)) {
            list.push(Value::String(label.to_string()));
        }
        Ok(())
    }

    /// Mutable top-level mapping, created when absent
    ///
    /// # Errors
    /// Returns `InvalidField` if the field exists but is not a mapping
    pub fn object_mut(&mut self, key: &str) -> Result<&mut Map<String, Value>> {
        let task = self.display_name().to_string();
        self.fields
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| TaskgraphError::invalid_field(task, key, "is not a mapping"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_unknown_fields() {
        let value = json!({
            "name": "build",
            "attributes": { "build-type": "opt" },
            "custom": [1, 2, 3]
        });
        let record = TaskRecord::from_value(value.clone()).unwrap();
        assert_eq!(record.name.as_deref(), Some("build"));
        assert_eq!(record.get("custom"), Some(&json!([1, 2, 3])));
        assert_eq!(record.to_value(), value);
    }

    #[test]
    fn test_unnamed_record() {
        let record = TaskRecord::from_value(json!({ "two": 1 })).unwrap();
        assert_eq!(record.name, None);
        assert_eq!(record.display_name(), "<unnamed>");
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(TaskRecord::from_value(json!([1, 2])).is_err());
        assert!(TaskRecord::from_value(json!({ "name": 3 })).is_err());
    }

    #[test]
    fn test_label() {
        let mut record = TaskRecord::named("linux64");
        assert_eq!(record.label("build"), "build-linux64");

        record.set("label", json!("custom-label"));
        assert_eq!(record.label("build"), "custom-label");
    }

    #[test]
    fn test_attributes_mut_creates_mapping() {
        let mut record = TaskRecord::named("t");
        record
            .attributes_mut()
            .unwrap()
            .insert("build-type".to_string(), json!("debug"));
        assert_eq!(record.attribute("build-type"), Some(&json!("debug")));
    }

    #[test]
    fn test_object_mut_rejects_scalars() {
        let mut record = TaskRecord::named("t");
        record.set("treeherder", json!("oops"));
        assert!(record.treeherder_mut().is_err());
    }

    #[test]
    fn test_dependent_tasks_shapes() {
        let record = TaskRecord::from_value(json!({
            "name": "t",
            "dependent-tasks": { "build": "build-linux", "test": "test-linux" }
        }))
        .unwrap();
        assert_eq!(record.dependent_tasks(), vec!["build-linux", "test-linux"]);

        let record = TaskRecord::from_value(json!({
            "name": "t",
            "dependent-tasks": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(record.dependent_tasks(), vec!["a", "b"]);
    }

    #[test]
    fn test_add_soft_dependency_dedups() {
        let mut record = TaskRecord::named("t");
        record.add_soft_dependency("u1").unwrap();
        record.add_soft_dependency("u1").unwrap();
        record.add_soft_dependency("u3").unwrap();
        assert_eq!(record.soft_dependencies(), vec!["u1", "u3"]);
    }
}
