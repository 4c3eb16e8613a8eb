//! Inheritance for fxrecord tasks
//!
//! An fxrecord task records a run of the build named by its
//! `primary-dependency`, so it takes that build's platform and product and
//! is told the build's task id through its environment.

use serde_json::{Map, Value, json};

use super::reject_unknown_options;
use crate::domain::path::FieldPath;
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

const TASK_ID_ENV: &str = "FXRECORD_TASK_ID";
const SHIPPING_PRODUCT: &str = "shipping-product";

/// Wires a record to its primary upstream build
#[derive(Debug, Default)]
pub struct FxrecordInherit;

impl FxrecordInherit {
    pub const NAME: &'static str = "fxrecord-inherit";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }

    fn apply(config: &TransformConfig, mut task: TaskRecord) -> Result<TaskRecord> {
        let upstream = config
            .kind_dependencies_tasks
            .primary_for(&task)?
            .ok_or_else(|| {
                TaskgraphError::invalid_field(
                    task.display_name(),
                    "primary-dependency",
                    "is required",
                )
            })?;
        let label = upstream.label.clone();

        if let Some(platform) = upstream
            .extra()
            .and_then(|extra| extra.get("treeherder-platform"))
        {
            task.treeherder_mut()?
                .insert("platform".to_string(), platform.clone());
        }

        task.object_mut("dependencies")?
            .insert(label.clone(), Value::String(label.clone()));

        let env = FieldPath::parse(&format!("worker.env.{}", TASK_ID_ENV))?;
        task.set_path(
            &env,
            json!({ "task-reference": format!("<{}>", label) }),
        )?;

        if let Some(product) = upstream.attribute(SHIPPING_PRODUCT) {
            task.attributes_mut()?
                .entry(SHIPPING_PRODUCT)
                .or_insert_with(|| product.clone());
        }

        Ok(task)
    }
}

impl Transform for FxrecordInherit {
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

    fn config() -> TransformConfig {
        config_with_upstream(
            Parameters::default(),
            "fxrecord",
            vec![(
                "build",
                json!({
                    "name": "win64-shippable",
                    "label": "build-win64-shippable/opt",
                    "attributes": { "shipping-product": "firefox" },
                    "task": { "extra": { "treeherder-platform": "windows10-64-shippable/opt" } }
                }),
            )],
        )
    }

    #[test]
    fn test_inherits_from_build() {
        let out = run(
            &FxrecordInherit,
            &config(),
            vec![json!({
                "name": "fxrecord",
                "primary-dependency": "build-win64-shippable/opt",
                "treeherder": { "symbol": "fxrec" }
            })],
        )
        .unwrap();
        let task = &out[0];

        assert_eq!(task.name.as_deref(), Some("fxrecord"));
        assert_eq!(
            task.treeherder().unwrap()["platform"],
            json!("windows10-64-shippable/opt")
        );
        assert_eq!(
            task.fields["dependencies"]["build-win64-shippable/opt"],
            json!("build-win64-shippable/opt")
        );
        assert_eq!(
            task.fields["worker"]["env"]["FXRECORD_TASK_ID"],
            json!({ "task-reference": "<build-win64-shippable/opt>" })
        );
        assert_eq!(task.attribute("shipping-product"), Some(&json!("firefox")));
    }

    #[test]
    fn test_keeps_own_shipping_product() {
        let out = run(
            &FxrecordInherit,
            &config(),
            vec![json!({
                "name": "fxrecord",
                "primary-dependency": "build-win64-shippable/opt",
                "attributes": { "shipping-product": "devedition" }
            })],
        )
        .unwrap();
        assert_eq!(out[0].attribute("shipping-product"), Some(&json!("devedition")));
    }

    #[test]
    fn test_requires_primary_dependency() {
        let err = run(
            &FxrecordInherit,
            &config(),
            vec![json!({ "name": "fxrecord" })],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TaskgraphError::InvalidField { field, .. } if field == "primary-dependency"
        ));
    }
}
