//! Kind definitions loaded from Lua
//!
//! A [`KindDefinition`] is the plain-data form of a kind file. It becomes a
//! runnable [`Kind`] once its transform names are looked up in a
//! [`TransformRegistry`].

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use taskforge_core::transforms::TaskDefaults;
use taskforge_core::{Kind, KindMetadata, TaskRecord, TransformRegistry, TransformSpec};

/// Everything a kind file declares
#[derive(Debug, Clone)]
pub struct KindDefinition {
    pub name: String,
    pub description: Option<String>,
    pub kind_dependencies: Vec<String>,
    pub transforms: Vec<TransformSpec>,
    pub task_defaults: Option<Map<String, Value>>,
    pub tasks: Vec<TaskRecord>,
}

impl KindDefinition {
    /// Listing information, with the transform options as declared
    pub fn metadata(&self) -> KindMetadata {
        let mut transforms = Vec::with_capacity(self.transforms.len() + 1);
        if self.task_defaults.is_some() {
            transforms.push(TransformSpec::named(TaskDefaults::NAME));
        }
        transforms.extend(self.transforms.iter().cloned());

        KindMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            kind_dependencies: self.kind_dependencies.clone(),
            transforms,
            task_count: self.tasks.len(),
        }
    }

    /// Build the runnable kind
    ///
    /// Task defaults, when declared, are merged in before any listed
    /// transform runs.
    ///
    /// # Errors
    /// Fails when a transform is not registered or rejects its options
    pub fn into_kind(self, registry: &TransformRegistry) -> Result<Kind> {
        let mut sequence = registry
            .build_sequence(&self.name, &self.transforms)
            .with_context(|| format!("Failed to build transforms of kind '{}'", self.name))?;

        if let Some(defaults) = self.task_defaults {
            sequence.prepend(Box::new(TaskDefaults::new(defaults)));
        }

        let mut kind = Kind::new(self.name)
            .with_dependencies(self.kind_dependencies)
            .with_tasks(self.tasks)
            .with_transforms(sequence);
        kind.description = self.description;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskforge_core::{Parameters, Pipeline};

    fn definition() -> KindDefinition {
        KindDefinition {
            name: "build".to_string(),
            description: Some("Builds".to_string()),
            kind_dependencies: Vec::new(),
            transforms: vec![
                TransformSpec::named("validate").with_option("required", json!(["worker"])),
            ],
            task_defaults: Some(
                json!({ "worker": { "max-run-time": 3600 } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            tasks: vec![
                TaskRecord::from_value(json!({ "name": "linux64", "worker": { "os": "linux" } }))
                    .unwrap(),
            ],
        }
    }

    #[test]
    fn test_metadata_lists_defaults_first() {
        let metadata = definition().metadata();
        let names: Vec<_> = metadata.transforms.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["task-defaults", "validate"]);
        assert_eq!(metadata.transforms[1].options["required"], json!(["worker"]));
        assert_eq!(metadata.task_count, 1);
    }

    #[test]
    fn test_into_kind_applies_defaults_before_transforms() {
        let registry = TransformRegistry::with_defaults();
        let kind = definition().into_kind(&registry).unwrap();
        assert_eq!(kind.transforms.names(), vec!["task-defaults", "validate"]);
        assert_eq!(kind.description.as_deref(), Some("Builds"));

        let mut pipeline = Pipeline::new(Parameters::default());
        pipeline.add_kind(kind).unwrap();
        let graph = pipeline.run().unwrap();

        let task = graph.get("build-linux64").unwrap();
        assert_eq!(
            task.record.get("worker"),
            Some(&json!({ "max-run-time": 3600, "os": "linux" }))
        );
    }

    #[test]
    fn test_into_kind_unknown_transform() {
        let mut def = definition();
        def.transforms = vec![TransformSpec::named("does-not-exist")];
        let err = def
            .into_kind(&TransformRegistry::with_defaults())
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("does-not-exist"));
    }
}
