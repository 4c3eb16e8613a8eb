//! Soft dependencies on code-review tasks

use serde_json::{Map, Value};
use tracing::debug;

use super::reject_unknown_options;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::transform::{TaskStream, Transform, TransformConfig};

const CODE_REVIEW: &str = "code-review";

/// Adds every upstream task flagged `code-review` as a soft dependency
#[derive(Debug, Default)]
pub struct AddSoftDependencies;

impl AddSoftDependencies {
    pub const NAME: &'static str = "add-soft-dependencies";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }
}

impl Transform for AddSoftDependencies {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        let labels: Vec<&'a str> = config
            .kind_dependencies_tasks
            .iter()
            .filter(|t| t.attribute(CODE_REVIEW) == Some(&Value::Bool(true)))
            .map(|t| t.label.as_str())
            .collect();
        debug!("{} code-review tasks for kind '{}'", labels.len(), config.kind);

        Box::new(tasks.map(move |task| {
            task.and_then(|mut task: TaskRecord| {
                for label in &labels {
                    task.add_soft_dependency(label)?;
                }
                Ok(task)
            })
        }))
    }
}
