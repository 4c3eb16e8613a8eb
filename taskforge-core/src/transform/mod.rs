//! Transforms
//!
//! A transform turns a stream of task records into another stream. It pulls
//! records from its input lazily and may rewrite, drop or split them.
//! Transforms hold no state between pipeline invocations; everything they
//! read comes from the [`TransformConfig`] of the kind being built.

mod sequence;

pub use sequence::TransformSequence;

use std::sync::Arc;

use crate::dependencies::KindDependencies;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::parameters::Parameters;

/// Lazy stream of task records
pub type TaskStream<'a> = Box<dyn Iterator<Item = Result<TaskRecord>> + 'a>;

/// Read-only context handed to every transform of a kind
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub params: Arc<Parameters>,
    pub kind: String,
    pub kind_dependencies_tasks: Arc<KindDependencies>,
}

impl TransformConfig {
    /// Create a config for `kind`
    pub fn new(
        params: Arc<Parameters>,
        kind: impl Into<String>,
        kind_dependencies_tasks: Arc<KindDependencies>,
    ) -> Self {
        Self {
            params,
            kind: kind.into(),
            kind_dependencies_tasks,
        }
    }

    /// A config with no upstream tasks
    pub fn standalone(params: Parameters, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let deps = KindDependencies::new(kind.clone(), Vec::new());
        Self::new(Arc::new(params), kind, Arc::new(deps))
    }
}

/// Apply `f` to one record, attributing its errors to the record
pub fn for_record<T>(task: TaskRecord, f: impl FnOnce(TaskRecord) -> Result<T>) -> Result<T> {
    let name = task.display_name().to_string();
    f(task).map_err(|e| e.for_task(&name))
}

/// A named pipeline stage
pub trait Transform: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Transform a stream of records
    ///
    /// Errors already present in `tasks` must be passed through unchanged.
    fn transform<'a>(&'a self, config: &'a TransformConfig, tasks: TaskStream<'a>)
    -> TaskStream<'a>;
}

type MapFn = dyn Fn(&TransformConfig, TaskRecord) -> Result<TaskRecord> + Send + Sync;
type FilterFn = dyn Fn(&TransformConfig, &TaskRecord) -> Result<bool> + Send + Sync;
type FlatMapFn = dyn Fn(&TransformConfig, TaskRecord) -> Result<Vec<TaskRecord>> + Send + Sync;

/// One record in, one record out
pub struct MapTransform {
    name: String,
    f: Box<MapFn>,
}

impl MapTransform {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransformConfig, TaskRecord) -> Result<TaskRecord> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl Transform for MapTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.map(move |task| {
            task.and_then(|task| for_record(task, |task| (self.f)(config, task)))
        }))
    }
}

/// Keep or drop each record
pub struct FilterTransform {
    name: String,
    f: Box<FilterFn>,
}

impl FilterTransform {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransformConfig, &TaskRecord) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl Transform for FilterTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.filter_map(move |task| match task {
            Ok(task) => match (self.f)(config, &task) {
                Ok(true) => Some(Ok(task)),
                Ok(false) => None,
                Err(e) => Some(Err(e.for_task(task.display_name()))),
            },
            Err(e) => Some(Err(e)),
        }))
    }
}

/// One record in, any number out
pub struct FlatMapTransform {
    name: String,
    f: Box<FlatMapFn>,
}

impl FlatMapTransform {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransformConfig, TaskRecord) -> Result<Vec<TaskRecord>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl Transform for FlatMapTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.flat_map(move |task| {
            let produced = task.and_then(|t| for_record(t, |t| (self.f)(config, t)));
            match produced {
                Ok(records) => records.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        }))
    }
}
