//! Upstream task inspection
//!
//! Kinds see the finished tasks of the kinds they declare in
//! `kind-dependencies`. This module holds those tasks and the helpers
//! transforms use to inherit metadata from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::symbol::{NO_GROUP, replace_group};

/// A finished task produced by an earlier kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamTask {
    pub label: String,
    pub kind: String,
    pub attributes: Map<String, Value>,
    /// Materialised task definition (`extra.treeherder`, `payload`, ...)
    pub task: Map<String, Value>,
    pub record: TaskRecord,
}

impl UpstreamTask {
    /// Wrap a finished record of `kind`
    ///
    /// The label is taken from the record, `attributes.kind` is set to the
    /// producing kind and `task` is the record's `task` mapping, if any.
    pub fn from_record(kind: &str, record: TaskRecord) -> Self {
        let mut attributes = record.attributes().cloned().unwrap_or_default();
        attributes.insert("kind".to_string(), Value::String(kind.to_string()));
        let task = record
            .get("task")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            label: record.label(kind),
            kind: kind.to_string(),
            attributes,
            task,
            record,
        }
    }

    /// The task's name within its kind
    pub fn name(&self) -> &str {
        self.record.name.as_deref().unwrap_or(&self.label)
    }

    /// A single attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// `task.extra`, if present
    pub fn extra(&self) -> Option<&Map<String, Value>> {
        self.task.get("extra").and_then(Value::as_object)
    }

    /// `task.extra.treeherder`, if present
    pub fn extra_treeherder(&self) -> Option<&Map<String, Value>> {
        self.extra()
            .and_then(|extra| extra.get("treeherder"))
            .and_then(Value::as_object)
    }

    /// Treeherder platform of the task
    ///
    /// `task.extra.treeherder-platform` when set, otherwise
    /// `machine.platform/collection` from `task.extra.treeherder`.
    pub fn treeherder_platform(&self) -> Option<String> {
        if let Some(platform) = self
            .extra()
            .and_then(|extra| extra.get("treeherder-platform"))
            .and_then(Value::as_str)
        {
            return Some(platform.to_string());
        }
        let treeherder = self.extra_treeherder()?;
        let machine = treeherder
            .get("machine")
            .and_then(|m| m.get("platform"))
            .and_then(Value::as_str)?;
        let collection = treeherder
            .get("collection")
            .and_then(Value::as_object)
            .and_then(|c| c.keys().next())?;
        Some(format!("{}/{}", machine, collection))
    }
}

/// Finished tasks of the kinds a kind depends on, keyed by label
#[derive(Debug, Clone, Default)]
pub struct KindDependencies {
    kind: String,
    kinds: Vec<String>,
    tasks: IndexMap<String, UpstreamTask>,
}

impl KindDependencies {
    /// Create an empty set for `kind`, which declares `kinds` as dependencies
    pub fn new(kind: impl Into<String>, kinds: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            kinds,
            tasks: IndexMap::new(),
        }
    }

    /// Add a finished task; later tasks with the same label replace earlier ones
    pub fn insert(&mut self, task: UpstreamTask) {
        self.tasks.insert(task.label.clone(), task);
    }

    /// Declared kind-dependencies
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    /// Tasks produced by `kind`, in production order
    ///
    /// # Errors
    /// Returns `UnknownKindDependency` if `kind` is not a declared
    /// kind-dependency. An empty kind name yields no tasks.
    pub fn tasks_of_kind(&self, kind: &str) -> Result<Vec<&UpstreamTask>> {
        if kind.is_empty() {
            return Ok(Vec::new());
        }
        if !self.kinds.iter().any(|k| k == kind) {
            return Err(TaskgraphError::UnknownKindDependency {
                kind: self.kind.clone(),
                requested: kind.to_string(),
            });
        }
        Ok(self.tasks.values().filter(|t| t.kind == kind).collect())
    }

    /// Look up a task by label
    pub fn get(&self, label: &str) -> Option<&UpstreamTask> {
        self.tasks.get(label)
    }

    /// Look up a task by label on behalf of `task`
    ///
    /// # Errors
    /// Returns `UnknownDependency` if no upstream task has the label
    pub fn require(&self, task: &TaskRecord, label: &str) -> Result<&UpstreamTask> {
        self.get(label)
            .ok_or_else(|| TaskgraphError::UnknownDependency {
                task: task.display_name().to_string(),
                label: label.to_string(),
            })
    }

    /// The primary upstream task of a record
    ///
    /// `primary-dependency` wins; otherwise the first entry of
    /// `dependent-tasks`. Returns `None` when the record names neither.
    ///
    /// # Errors
    /// Returns `UnknownDependency` if the named label is not an upstream task
    pub fn primary_for(&self, task: &TaskRecord) -> Result<Option<&UpstreamTask>> {
        let label = match task.primary_dependency() {
            Some(label) => label,
            None => match task.dependent_tasks().first().copied() {
                Some(label) => label,
                None => return Ok(None),
            },
        };
        self.require(task, label).map(Some)
    }

    /// Iterate over all upstream tasks in production order
    pub fn iter(&self) -> impl Iterator<Item = &UpstreamTask> {
        self.tasks.values()
    }

    /// All labels in production order
    pub fn labels(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Number of upstream tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether there are no upstream tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Treeherder mapping a downstream task inherits from its upstream
///
/// Starts from the downstream's own `treeherder`; `platform`, `tier` and
/// `kind` are filled only when missing. `symbol` becomes the downstream's
/// member symbol grouped under the upstream's `groupSymbol` (`"?"` when the
/// upstream has none).
pub fn inherit_treeherder(downstream: &TaskRecord, upstream: &UpstreamTask) -> Map<String, Value> {
    let mut treeherder = downstream.treeherder().cloned().unwrap_or_default();
    let upstream_th = upstream.extra_treeherder();

    if !treeherder.contains_key("platform") {
        if let Some(platform) = upstream.treeherder_platform() {
            treeherder.insert("platform".to_string(), Value::String(platform));
        }
    }
    if !treeherder.contains_key("tier") {
        let tier = upstream_th
            .and_then(|th| th.get("tier"))
            .cloned()
            .unwrap_or(Value::from(1));
        treeherder.insert("tier".to_string(), tier);
    }
    treeherder
        .entry("kind")
        .or_insert_with(|| Value::String("build".to_string()));

    let group = upstream_th
        .and_then(|th| th.get("groupSymbol"))
        .and_then(Value::as_str)
        .unwrap_or(NO_GROUP);
    if let Some(symbol) = treeherder.get("symbol").and_then(Value::as_str) {
        let regrouped = replace_group(symbol, group);
        treeherder.insert("symbol".to_string(), Value::String(regrouped));
    }

    treeherder
}
