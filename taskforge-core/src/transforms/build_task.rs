//! Materialisation of the final task definition
//!
//! Downstream kinds read an upstream's `task` mapping (its `extra.treeherder`
//! block, its `payload`) rather than the description it was built from. This
//! transform produces that mapping from the description fields.

use serde_json::{Map, Value, json};

use super::reject_unknown_options;
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::symbol::{NO_GROUP, split_symbol};
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

/// Builds the `task` mapping of each record
#[derive(Debug, Default)]
pub struct BuildTask;

impl BuildTask {
    pub const NAME: &'static str = "build-task";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }

    fn apply(config: &TransformConfig, mut task: TaskRecord) -> Result<TaskRecord> {
        let label = task.label(&config.kind);

        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(label.clone()));
        if let Some(description) = task.get("description") {
            metadata.insert("description".to_string(), description.clone());
        }

        let mut definition = Map::new();
        definition.insert("metadata".to_string(), Value::Object(metadata));
        definition.insert("dependencies".to_string(), dependency_labels(&task)?);
        definition.insert("scopes".to_string(), list_field(&task, "scopes")?);
        definition.insert("routes".to_string(), list_field(&task, "routes")?);
        definition.insert(
            "payload".to_string(),
            task.get("worker").cloned().unwrap_or_else(|| json!({})),
        );
        definition.insert(
            "tags".to_string(),
            json!({ "kind": config.kind, "label": label }),
        );
        if let Some(treeherder) = task.treeherder() {
            definition.insert("extra".to_string(), Value::Object(treeherder_extra(treeherder)));
        }

        task.set("task", Value::Object(definition));
        Ok(task)
    }
}

/// Labels of `dependencies`, which may be a mapping or a list
fn dependency_labels(task: &TaskRecord) -> Result<Value> {
    let labels: Vec<Value> = match task.get("dependencies") {
        None => Vec::new(),
        Some(Value::Object(map)) => map.values().cloned().collect(),
        Some(Value::Array(list)) => list.clone(),
        Some(_) => {
            return Err(TaskgraphError::invalid_field(
                task.display_name(),
                "dependencies",
                "is neither a mapping nor a list",
            ));
        }
    };
    Ok(Value::Array(labels))
}

fn list_field(task: &TaskRecord, key: &str) -> Result<Value> {
    match task.get(key) {
        None => Ok(Value::Array(Vec::new())),
        Some(value @ Value::Array(_)) => Ok(value.clone()),
        Some(_) => Err(TaskgraphError::invalid_field(
            task.display_name(),
            key,
            "is not a list",
        )),
    }
}

/// `extra` block for a description-level `treeherder` mapping
fn treeherder_extra(treeherder: &Map<String, Value>) -> Map<String, Value> {
    let mut th = Map::new();
    if let Some(symbol) = treeherder.get("symbol").and_then(Value::as_str) {
        let (group, member) = split_symbol(symbol);
        if group != NO_GROUP {
            th.insert("groupSymbol".to_string(), Value::String(group));
        }
        th.insert("symbol".to_string(), Value::String(member));
    }
    th.insert(
        "tier".to_string(),
        treeherder.get("tier").cloned().unwrap_or_else(|| json!(1)),
    );
    if let Some(kind) = treeherder.get("kind") {
        th.insert("jobKind".to_string(), kind.clone());
    }

    let mut extra = Map::new();
    if let Some(platform) = treeherder.get("platform").and_then(Value::as_str) {
        let (machine, collection) = platform.split_once('/').unwrap_or((platform, "opt"));
        th.insert("machine".to_string(), json!({ "platform": machine }));
        let mut collections = Map::new();
        collections.insert(collection.to_string(), Value::Bool(true));
        th.insert("collection".to_string(), Value::Object(collections));
        extra.insert(
            "treeherder-platform".to_string(),
            Value::String(platform.to_string()),
        );
    }
    extra.insert("treeherder".to_string(), Value::Object(th));
    extra
}

impl Transform for BuildTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.map(move |task| {
            task.and_then(|task| for_record(task, |task| Self::apply(config, task)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::UpstreamTask;
    use crate::parameters::Parameters;
    use crate::transforms::testing::run;

    fn config() -> TransformConfig {
        TransformConfig::standalone(Parameters::default(), "build")
    }

    #[test]
    fn test_builds_task_definition() {
        let out = run(
            &BuildTask,
            &config(),
            vec![json!({
                "name": "linux64/opt",
                "description": "Linux64 Opt",
                "dependencies": { "toolchain": "toolchain-linux64-clang" },
                "scopes": ["secrets:get:project/build"],
                "worker": { "max-run-time": 3600 },
                "treeherder": { "symbol": "B(b)", "platform": "linux64/opt", "tier": 2 }
            })],
        )
        .unwrap();
        let task = &out[0].fields["task"];

        assert_eq!(task["metadata"]["name"], json!("build-linux64/opt"));
        assert_eq!(task["metadata"]["description"], json!("Linux64 Opt"));
        assert_eq!(task["dependencies"], json!(["toolchain-linux64-clang"]));
        assert_eq!(task["scopes"], json!(["secrets:get:project/build"]));
        assert_eq!(task["routes"], json!([]));
        assert_eq!(task["payload"], json!({ "max-run-time": 3600 }));
        assert_eq!(task["extra"]["treeherder-platform"], json!("linux64/opt"));
        assert_eq!(task["extra"]["treeherder"]["groupSymbol"], json!("B"));
        assert_eq!(task["extra"]["treeherder"]["symbol"], json!("b"));
        assert_eq!(task["extra"]["treeherder"]["tier"], json!(2));
        assert_eq!(
            task["extra"]["treeherder"]["machine"],
            json!({ "platform": "linux64" })
        );
    }

    #[test]
    fn test_upstream_reads_built_task() {
        let out = run(
            &BuildTask,
            &config(),
            vec![json!({
                "name": "win64/debug",
                "treeherder": { "symbol": "B", "platform": "windows11-64/debug" }
            })],
        )
        .unwrap();
        let upstream = UpstreamTask::from_record("build", out[0].clone());
        assert_eq!(
            upstream.treeherder_platform().as_deref(),
            Some("windows11-64/debug")
        );
        assert!(upstream.extra_treeherder().unwrap().get("groupSymbol").is_none());
    }

    #[test]
    fn test_rejects_malformed_scopes() {
        let err = run(
            &BuildTask,
            &config(),
            vec![json!({ "name": "a", "scopes": "queue:create-task" })],
        )
        .unwrap_err();
        assert!(matches!(err, TaskgraphError::InvalidField { field, .. } if field == "scopes"));
    }
}
