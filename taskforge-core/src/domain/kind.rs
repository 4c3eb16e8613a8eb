//! Kind domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transform named by a kind, with its options
///
/// Kind files list transforms either by bare name or as a mapping with a
/// `name` key; every other key of the mapping is an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub name: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl TransformSpec {
    /// A transform without options
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
        }
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Parse a bare name or a `{ name = ..., ... }` mapping
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::named(name.clone())),
            Value::Object(map) => {
                let name = map.get("name")?.as_str()?.to_string();
                let options = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "name")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Some(Self { name, options })
            }
            _ => None,
        }
    }
}

/// Kind metadata extracted from a kind definition
///
/// Everything except the tasks themselves; used for listing kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindMetadata {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "kind-dependencies")]
    pub kind_dependencies: Vec<String>,
    pub transforms: Vec<TransformSpec>,
    pub task_count: usize,
}
