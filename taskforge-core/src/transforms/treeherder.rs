//! Treeherder metadata inherited from the primary upstream task

use serde_json::{Map, Value};

use super::reject_unknown_options;
use crate::dependencies::inherit_treeherder;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

/// Fills `treeherder` from the record's primary upstream task
///
/// The downstream symbol is regrouped under the upstream's group, and
/// platform and tier are inherited when the record does not set them.
/// Records without a primary upstream pass through unchanged.
#[derive(Debug, Default)]
pub struct TreeherderFromDependency;

impl TreeherderFromDependency {
    pub const NAME: &'static str = "build-treeherder-from-dependency";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }

    fn apply(config: &TransformConfig, mut task: TaskRecord) -> Result<TaskRecord> {
        let Some(upstream) = config.kind_dependencies_tasks.primary_for(&task)? else {
            return Ok(task);
        };
        let treeherder = inherit_treeherder(&task, upstream);
        task.set("treeherder", Value::Object(treeherder));
        Ok(task)
    }
}

impl Transform for TreeherderFromDependency {
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
