//! Structural validation of records

use serde_json::{Map, Value};

use super::{reject_unknown_options, string_list_option};
use crate::domain::path::FieldPath;
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::transform::{TaskStream, Transform, TransformConfig};

/// Rejects records that lack a name or a required field
#[derive(Debug, Clone, Default)]
pub struct ValidateSchema {
    required: Vec<FieldPath>,
}

impl ValidateSchema {
    pub const NAME: &'static str = "validate";

    /// # Errors
    /// Returns `InvalidPath` for a malformed path
    pub fn new<I, S>(required: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let required = required
            .into_iter()
            .map(|f| FieldPath::parse(f.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { required })
    }

    /// Options: `required` (list of dotted paths)
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &["required"])?;
        Self::new(string_list_option(Self::NAME, options, "required")?.unwrap_or_default())
    }

    fn check(&self, task: &TaskRecord) -> Result<()> {
        let Some(name) = task.name.as_deref() else {
            return Err(TaskgraphError::Schema {
                task: task.display_name().to_string(),
                reason: "missing required field 'name'".to_string(),
            });
        };
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|path| task.get_path(path).is_none())
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(TaskgraphError::Schema {
                task: name.to_string(),
                reason: format!("missing required fields: {}", missing.join(", ")),
            });
        }
        Ok(())
    }
}

impl Transform for ValidateSchema {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        _config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.map(move |task| {
            let task = task?;
            self.check(&task)?;
            Ok(task)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameters;
    use crate::transforms::testing::run;
    use serde_json::json;

    fn config() -> TransformConfig {
        TransformConfig::standalone(Parameters::default(), "build")
    }

    #[test]
    fn test_valid_record_passes() {
        let t = ValidateSchema::new(["worker.max-run-time"]).unwrap();
        let out = run(
            &t,
            &config(),
            vec![json!({ "name": "a", "worker": { "max-run-time": 10 } })],
        )
        .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_missing_name() {
        let t = ValidateSchema::default();
        let err = run(&t, &config(), vec![json!({ "worker": {} })]).unwrap_err();
        assert!(matches!(err, TaskgraphError::Schema { task, .. } if task == "<unnamed>"));
    }

    #[test]
    fn test_missing_required_fields_are_listed() {
        let t = ValidateSchema::new(["worker.max-run-time", "treeherder.symbol"]).unwrap();
        let err = run(&t, &config(), vec![json!({ "name": "a", "worker": {} })]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task 'a' failed validation: \
             missing required fields: worker.max-run-time, treeherder.symbol"
        );
    }
}
