//! Kind-level task defaults

use serde_json::{Map, Value};

use super::{map_option, reject_unknown_options};
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::transform::{TaskStream, Transform, TransformConfig};

/// Deep-merges a set of defaults into every record
///
/// Mappings merge key by key, lists are concatenated with the defaults
/// first, and any other value set on the record wins. A keyed-by block is
/// treated as a single value and never merged into.
#[derive(Debug, Clone, Default)]
pub struct TaskDefaults {
    defaults: Map<String, Value>,
}

impl TaskDefaults {
    pub const NAME: &'static str = "task-defaults";

    /// A `name` entry in `defaults` is ignored
    pub fn new(defaults: Map<String, Value>) -> Self {
        let defaults = defaults
            .into_iter()
            .filter(|(key, _)| key != "name")
            .collect();
        Self { defaults }
    }

    /// Options: `defaults` (mapping)
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &["defaults"])?;
        let defaults = map_option(Self::NAME, options, "defaults")?
            .cloned()
            .unwrap_or_default();
        Ok(Self::new(defaults))
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    fn apply(&self, mut task: TaskRecord) -> TaskRecord {
        let fields = std::mem::take(&mut task.fields);
        task.fields = merge_maps(&self.defaults, fields);
        task
    }
}

/// Merge `defaults` under `record`
pub fn merge_defaults(defaults: &Value, record: Value) -> Value {
    match (defaults, record) {
        (Value::Object(d), Value::Object(r)) if !is_keyed_by(d) && !is_keyed_by(&r) => {
            Value::Object(merge_maps(d, r))
        }
        (Value::Array(d), Value::Array(r)) => {
            let mut merged = d.clone();
            merged.extend(r);
            Value::Array(merged)
        }
        (_, record) => record,
    }
}

fn is_keyed_by(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.keys().all(|k| k.starts_with("by-"))
}

fn merge_maps(defaults: &Map<String, Value>, mut record: Map<String, Value>) -> Map<String, Value> {
    for (key, default) in defaults {
        match record.get_mut(key) {
            Some(value) => {
                let own = std::mem::take(value);
                *value = merge_defaults(default, own);
            }
            None => {
                record.insert(key.clone(), default.clone());
            }
        }
    }
    record
}

impl Transform for TaskDefaults {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        _config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.map(move |task| task.map(|task| self.apply(task))))
    }
}
