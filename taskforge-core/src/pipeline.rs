//! Pipeline runner
//!
//! Builds every kind in dependency order. Each kind's tasks are fed through
//! its transform sequence with a [`TransformConfig`] that exposes only the
//! finished tasks of the kinds it declares as dependencies.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::dependencies::{KindDependencies, UpstreamTask};
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::parameters::Parameters;
use crate::transform::{TransformConfig, TransformSequence};

/// A kind ready to be built
pub struct Kind {
    pub name: String,
    pub description: Option<String>,
    pub kind_dependencies: Vec<String>,
    pub tasks: Vec<TaskRecord>,
    pub transforms: TransformSequence,
}

impl Kind {
    /// Create a kind with no dependencies, tasks or transforms
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            transforms: TransformSequence::new(name.clone()),
            name,
            description: None,
            kind_dependencies: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind_dependencies = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<TaskRecord>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_transforms(mut self, transforms: TransformSequence) -> Self {
        self.transforms = transforms;
        self
    }
}

/// Finished tasks of every kind, keyed by label in production order
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: IndexMap<String, UpstreamTask>,
}

impl TaskGraph {
    /// Add a finished task
    ///
    /// # Errors
    /// Returns `NameCollision` if the label is already taken
    pub fn insert(&mut self, task: UpstreamTask) -> Result<()> {
        if self.tasks.contains_key(&task.label) {
            return Err(TaskgraphError::NameCollision { name: task.label });
        }
        self.tasks.insert(task.label.clone(), task);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&UpstreamTask> {
        self.tasks.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpstreamTask> {
        self.tasks.values()
    }

    /// Tasks produced by `kind`, in production order
    pub fn tasks_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a UpstreamTask> {
        self.tasks.values().filter(move |t| t.kind == kind)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The graph as a JSON mapping of label to task
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .tasks
            .iter()
            .map(|(label, task)| {
                (
                    label.clone(),
                    json!({
                        "kind": task.kind,
                        "label": task.label,
                        "attributes": task.attributes,
                        "task": task.task,
                    }),
                )
            })
            .collect();
        Value::Object(map)
    }
}

/// Drives kinds through their transform sequences
pub struct Pipeline {
    params: Parameters,
    kinds: Vec<Kind>,
}

impl Pipeline {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            kinds: Vec::new(),
        }
    }

    /// Add a kind
    ///
    /// # Errors
    /// Returns `NameCollision` if a kind with the same name exists
    pub fn add_kind(&mut self, kind: Kind) -> Result<&mut Self> {
        if self.kinds.iter().any(|k| k.name == kind.name) {
            return Err(TaskgraphError::NameCollision { name: kind.name });
        }
        self.kinds.push(kind);
        Ok(self)
    }

    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    pub fn kind(&self, name: &str) -> Option<&Kind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Kind names in dependency order
    ///
    /// Among kinds whose dependencies are satisfied, the one added first is
    /// built first.
    ///
    /// # Errors
    /// Returns `UnknownKind` when a kind depends on an undefined kind and
    /// `CyclicKinds` when the dependencies cannot be ordered.
    pub fn kind_order(&self) -> Result<Vec<String>> {
        for kind in &self.kinds {
            for dep in &kind.kind_dependencies {
                if self.kind(dep).is_none() {
                    return Err(TaskgraphError::UnknownKind {
                        kind: kind.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut sorted: Vec<String> = Vec::new();
        let mut done: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Kind> = self.kinds.iter().collect();

        while !pending.is_empty() {
            let ready = pending.iter().position(|kind| {
                kind.kind_dependencies
                    .iter()
                    .all(|dep| done.contains(dep.as_str()))
            });
            let Some(index) = ready else {
                return Err(TaskgraphError::CyclicKinds {
                    kinds: pending.iter().map(|k| k.name.clone()).collect(),
                });
            };
            let kind = pending.remove(index);
            done.insert(kind.name.as_str());
            sorted.push(kind.name.clone());
        }

        Ok(sorted)
    }

    /// Build the whole graph
    ///
    /// # Errors
    /// Any error raised while ordering kinds, checking parameters or running
    /// a transform. The first failing task aborts the run.
    pub fn run(&self) -> Result<TaskGraph> {
        let order = self.kind_order()?;

        let mut params = self.params.clone();
        params.check()?;
        params.lock();
        let params = Arc::new(params);

        let mut graph = TaskGraph::default();
        for name in &order {
            let Some(kind) = self.kind(name) else {
                continue;
            };
            let produced = self.build_kind(kind, &params, &graph)?;
            info!("Built {} tasks for kind '{}'", produced.len(), kind.name);
            for record in produced {
                graph.insert(UpstreamTask::from_record(&kind.name, record))?;
            }
        }

        Ok(graph)
    }

    fn build_kind(
        &self,
        kind: &Kind,
        params: &Arc<Parameters>,
        graph: &TaskGraph,
    ) -> Result<Vec<TaskRecord>> {
        let mut deps = KindDependencies::new(kind.name.clone(), kind.kind_dependencies.clone());
        for dep in &kind.kind_dependencies {
            for task in graph.tasks_of_kind(dep) {
                deps.insert(task.clone());
            }
        }
        debug!(
            "Kind '{}' sees {} upstream tasks from {:?}",
            kind.name,
            deps.len(),
            kind.kind_dependencies
        );

        let config = TransformConfig::new(Arc::clone(params), kind.name.clone(), Arc::new(deps));
        let produced = kind
            .transforms
            .apply(&config, kind.tasks.iter().cloned())
            .collect::<Result<Vec<_>>>();
        produced
    }
}
