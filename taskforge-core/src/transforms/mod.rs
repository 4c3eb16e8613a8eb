//! Built-in transforms
//!
//! Every transform here is a plain struct implementing
//! [`Transform`](crate::transform::Transform). Each exposes `NAME`, the
//! kebab-case name kind files use to refer to it, and `from_options`, which
//! builds it from the options given alongside that name.

pub mod attributes;
pub mod build_task;
pub mod fxrecord;
pub mod from_deps;
pub mod resolve_keys;
pub mod run_on_releases;
pub mod soft_dependencies;
pub mod task_defaults;
pub mod treeherder;
pub mod validate;

pub use attributes::CopyAttributesFromDependency;
pub use build_task::BuildTask;
pub use from_deps::FromDeps;
pub use fxrecord::FxrecordInherit;
pub use resolve_keys::ResolveKeys;
pub use run_on_releases::RunOnReleases;
pub use soft_dependencies::AddSoftDependencies;
pub use task_defaults::TaskDefaults;
pub use treeherder::TreeherderFromDependency;
pub use validate::ValidateSchema;

use serde_json::{Map, Value};

use crate::error::{Result, TaskgraphError};

fn invalid_option(transform: &str, option: &str, reason: &str) -> TaskgraphError {
    TaskgraphError::InvalidOption {
        transform: transform.to_string(),
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

/// Read an optional list-of-strings option
pub(crate) fn string_list_option(
    transform: &str,
    options: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>> {
    let Some(value) = options.get(key) else {
        return Ok(None);
    };
    let list = value
        .as_array()
        .ok_or_else(|| invalid_option(transform, key, "must be a list of strings"))?;
    list.iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid_option(transform, key, "must be a list of strings"))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Read an optional boolean option
pub(crate) fn bool_option(
    transform: &str,
    options: &Map<String, Value>,
    key: &str,
) -> Result<Option<bool>> {
    match options.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid_option(transform, key, "must be a boolean")),
    }
}

/// Read an optional mapping option
pub(crate) fn map_option<'a>(
    transform: &str,
    options: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    match options.get(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(invalid_option(transform, key, "must be a mapping")),
    }
}

/// Fail on option keys a transform does not understand
pub(crate) fn reject_unknown_options(
    transform: &str,
    options: &Map<String, Value>,
    known: &[&str],
) -> Result<()> {
    match options.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(invalid_option(transform, key, "is not recognized")),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use serde_json::Value;

    use crate::dependencies::{KindDependencies, UpstreamTask};
    use crate::domain::task::TaskRecord;
    use crate::error::Result;
    use crate::parameters::Parameters;
    use crate::transform::{Transform, TransformConfig};

    /// Config for `kind` whose upstream tasks are `(kind, record)` pairs
    pub fn config_with_upstream(
        params: Parameters,
        kind: &str,
        upstream: Vec<(&str, Value)>,
    ) -> TransformConfig {
        let mut kinds: Vec<String> = Vec::new();
        for (k, _) in &upstream {
            if !kinds.iter().any(|known| known == k) {
                kinds.push(k.to_string());
            }
        }
        let mut deps = KindDependencies::new(kind, kinds);
        for (k, record) in upstream {
            let record = TaskRecord::from_value(record).unwrap();
            deps.insert(UpstreamTask::from_record(k, record));
        }
        TransformConfig::new(Arc::new(params), kind, Arc::new(deps))
    }

    /// Run records through a transform and collect the result
    pub fn run(
        t: &dyn Transform,
        config: &TransformConfig,
        tasks: Vec<Value>,
    ) -> Result<Vec<TaskRecord>> {
        let records: Vec<Result<TaskRecord>> = tasks
            .into_iter()
            .map(|v| Ok(TaskRecord::from_value(v).unwrap()))
            .collect();
        let out = t.transform(config, Box::new(records.into_iter())).collect();
        out
    }
}
