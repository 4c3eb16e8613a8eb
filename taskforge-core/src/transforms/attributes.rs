//! Attribute inheritance from the primary upstream task

use serde_json::{Map, Value};

use super::reject_unknown_options;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

/// Copies the primary upstream's attributes onto the record
///
/// Attributes the record already has are kept. The upstream `kind`
/// attribute is never copied.
#[derive(Debug, Default)]
pub struct CopyAttributesFromDependency;

impl CopyAttributesFromDependency {
    pub const NAME: &'static str = "copy-attributes-from-primary-dependency";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }

    fn apply(config: &TransformConfig, mut task: TaskRecord) -> Result<TaskRecord> {
        let Some(upstream) = config.kind_dependencies_tasks.primary_for(&task)? else {
            return Ok(task);
        };
        let mut merged: Map<String, Value> = upstream
            .attributes
            .iter()
            .filter(|(key, _)| key.as_str() != "kind")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(own) = task.attributes() {
            for (key, value) in own {
                merged.insert(key.clone(), value.clone());
            }
        }
        task.set("attributes", Value::Object(merged));
        Ok(task)
    }
}

impl Transform for CopyAttributesFromDependency {
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
    use crate::parameters::Parameters;
    use crate::transforms::testing::{config_with_upstream, run};
    use serde_json::json;

    #[test]
    fn test_downstream_attributes_win() {
        let config = config_with_upstream(
            Parameters::default(),
            "signing",
            vec![(
                "build",
                json!({
                    "name": "android-arm",
                    "label": "build-android-arm/opt",
                    "attributes": {
                        "build-platform": "android-arm",
                        "build-type": "opt",
                        "shippable": true
                    }
                }),
            )],
        );
        let out = run(
            &CopyAttributesFromDependency,
            &config,
            vec![json!({
                "name": "android-arm",
                "primary-dependency": "build-android-arm/opt",
                "attributes": { "build-type": "debug" }
            })],
        )
        .unwrap();

        assert_eq!(out[0].attribute("build-platform"), Some(&json!("android-arm")));
        assert_eq!(out[0].attribute("build-type"), Some(&json!("debug")));
        assert_eq!(out[0].attribute("shippable"), Some(&json!(true)));
        assert_eq!(out[0].attribute("kind"), None);
    }

    #[test]
    fn test_upstream_kind_not_copied() {
        let config = config_with_upstream(
            Parameters::default(),
            "signing",
            vec![(
                "build",
                json!({ "name": "linux64", "attributes": { "build-platform": "linux64" } }),
            )],
        );
        let out = run(
            &CopyAttributesFromDependency,
            &config,
            vec![json!({ "name": "linux64", "primary-dependency": "build-linux64" })],
        )
        .unwrap();

        assert_eq!(
            out[0].attributes().unwrap(),
            json!({ "build-platform": "linux64" }).as_object().unwrap()
        );
    }

    #[test]
    fn test_without_primary_passes_through() {
        let config = config_with_upstream(Parameters::default(), "signing", vec![]);
        let input = json!({ "name": "alone", "attributes": { "a": 1 } });
        let out = run(&CopyAttributesFromDependency, &config, vec![input.clone()]).unwrap();
        assert_eq!(out[0].to_value(), input);
    }
}
