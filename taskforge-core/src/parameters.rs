//! Parameter store
//!
//! Named values supplied by the caller (project, level, release-type, ...)
//! and read by transforms. The store is writable while it is being assembled
//! and read-only once the pipeline locks it.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, TaskgraphError};

pub const PROJECT: &str = "project";
pub const BRANCH: &str = "branch";
pub const LEVEL: &str = "level";
pub const RELEASE_LEVEL: &str = "release-level";
pub const RELEASE_TYPE: &str = "release-type";
pub const HEAD_REPOSITORY: &str = "head-repository";
pub const HEAD_REV: &str = "head-rev";
pub const HEAD_REVISION: &str = "head-revision";
pub const TASKS_FOR: &str = "tasks_for";
pub const BUILD_TYPE: &str = "build-type";
pub const PLATFORM: &str = "platform";
pub const BUILD_DATE: &str = "build_date";

/// Parameter names with a fixed meaning
pub const RECOGNIZED: &[&str] = &[
    PROJECT,
    BRANCH,
    LEVEL,
    RELEASE_LEVEL,
    RELEASE_TYPE,
    HEAD_REPOSITORY,
    HEAD_REV,
    HEAD_REVISION,
    TASKS_FOR,
    BUILD_TYPE,
    PLATFORM,
];

/// Immutable mapping of parameter names to values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, Value>,
    locked: bool,
}

impl Parameters {
    /// Create an unlocked store from name/value pairs
    pub fn new<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            locked: false,
        }
    }

    /// Create a store from a JSON mapping
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the value is not a mapping
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(TaskgraphError::InvalidParameter {
                name: "<root>".to_string(),
                reason: format!("expected a mapping, got {}", other),
            }),
        }
    }

    /// Fill defaults for names the caller did not supply
    pub fn with_defaults(mut self) -> Self {
        let defaults = [
            (LEVEL, Value::String("3".to_string())),
            (RELEASE_LEVEL, Value::String("production".to_string())),
            (TASKS_FOR, Value::String("hg-push".to_string())),
            (
                BUILD_DATE,
                Value::from(chrono::Utc::now().timestamp()),
            ),
        ];
        for (name, value) in defaults {
            self.values.entry(name.to_string()).or_insert(value);
        }
        self
    }

    /// Get a parameter
    ///
    /// # Errors
    /// Returns `MissingParameter` if the name was never set
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| TaskgraphError::missing_parameter(name))
    }

    /// Get a string parameter
    ///
    /// # Errors
    /// Returns `MissingParameter` if absent, `InvalidParameter` if not a string
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| TaskgraphError::InvalidParameter {
                name: name.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    /// Check whether a parameter is set
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a parameter
    ///
    /// # Errors
    /// Returns `ReadOnly` once the store has been locked
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        if self.locked {
            return Err(TaskgraphError::ReadOnly {
                what: "parameters".to_string(),
            });
        }
        self.values.insert(name.into(), value);
        Ok(())
    }

    /// Forbid further mutation
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Whether the store has been locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The `level` parameter as an integer
    ///
    /// # Errors
    /// Returns `MissingParameter` or `InvalidParameter`
    pub fn level(&self) -> Result<u8> {
        let invalid = |reason: &str| TaskgraphError::InvalidParameter {
            name: LEVEL.to_string(),
            reason: reason.to_string(),
        };
        let level = match self.get(LEVEL)? {
            Value::Number(n) => n.as_u64().ok_or_else(|| invalid("not an integer"))?,
            Value::String(s) => s.parse::<u64>().map_err(|_| invalid("not an integer"))?,
            _ => return Err(invalid("not an integer")),
        };
        if !(1..=3).contains(&level) {
            return Err(invalid("must be between 1 and 3"));
        }
        Ok(level as u8)
    }

    /// Validate parameters with a constrained domain
    ///
    /// Only parameters that are present are checked.
    pub fn check(&self) -> Result<()> {
        if self.contains(LEVEL) {
            self.level()?;
        }
        if self.contains(RELEASE_LEVEL) {
            let level = self.get_str(RELEASE_LEVEL)?;
            if level != "staging" && level != "production" {
                return Err(TaskgraphError::InvalidParameter {
                    name: RELEASE_LEVEL.to_string(),
                    reason: format!("'{}' is not one of staging, production", level),
                });
            }
        }
        Ok(())
    }

    /// Iterate over all parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All parameter names in order
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The parameters as a JSON mapping
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}
