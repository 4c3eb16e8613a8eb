//! Transform registry
//!
//! Kinds refer to transforms by name. The registry maps each name to a
//! factory that builds the transform from the options given with it, and
//! assembles a kind's [`TransformSequence`] from its list of specs.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::kind::TransformSpec;
use crate::error::{Result, TaskgraphError};
use crate::transform::{Transform, TransformSequence};
use crate::transforms::{
    AddSoftDependencies, BuildTask, CopyAttributesFromDependency, FromDeps, FxrecordInherit,
    ResolveKeys, RunOnReleases, TaskDefaults, TreeherderFromDependency, ValidateSchema,
};

/// Builds a transform from its options
pub type TransformFactory =
    Box<dyn Fn(&Map<String, Value>) -> Result<Box<dyn Transform>> + Send + Sync>;

/// Named transform factories
#[derive(Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl TransformRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in transform
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ResolveKeys::NAME, |o| Ok(Box::new(ResolveKeys::from_options(o)?)));
        registry.register(TreeherderFromDependency::NAME, |o| {
            Ok(Box::new(TreeherderFromDependency::from_options(o)?))
        });
        registry.register(CopyAttributesFromDependency::NAME, |o| {
            Ok(Box::new(CopyAttributesFromDependency::from_options(o)?))
        });
        registry.register(AddSoftDependencies::NAME, |o| {
            Ok(Box::new(AddSoftDependencies::from_options(o)?))
        });
        registry.register(RunOnReleases::NAME, |o| Ok(Box::new(RunOnReleases::from_options(o)?)));
        registry.register(FxrecordInherit::NAME, |o| {
            Ok(Box::new(FxrecordInherit::from_options(o)?))
        });
        registry.register(TaskDefaults::NAME, |o| Ok(Box::new(TaskDefaults::from_options(o)?)));
        registry.register(FromDeps::NAME, |o| Ok(Box::new(FromDeps::from_options(o)?)));
        registry.register(ValidateSchema::NAME, |o| {
            Ok(Box::new(ValidateSchema::from_options(o)?))
        });
        registry.register(BuildTask::NAME, |o| Ok(Box::new(BuildTask::from_options(o)?)));
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Box<dyn Transform>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a single transform
    ///
    /// # Errors
    /// Returns `UnknownTransform` for an unregistered name, or whatever the
    /// factory rejects the options with.
    pub fn build(&self, spec: &TransformSpec) -> Result<Box<dyn Transform>> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| TaskgraphError::UnknownTransform(spec.name.clone()))?;
        factory(&spec.options)
    }

    /// Build the transform sequence of `kind`
    pub fn build_sequence(&self, kind: &str, specs: &[TransformSpec]) -> Result<TransformSequence> {
        let mut sequence = TransformSequence::new(kind);
        for spec in specs {
            debug!("Adding transform '{}' to kind '{}'", spec.name, kind);
            sequence.register_boxed(self.build(spec)?);
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MapTransform;
    use serde_json::json;

    #[test]
    fn test_registry_with_defaults() {
        let registry = TransformRegistry::with_defaults();
        assert_eq!(registry.len(), 10);
        for name in [
            "resolve-keys",
            "build-treeherder-from-dependency",
            "copy-attributes-from-primary-dependency",
            "add-soft-dependencies",
            "run-on-releases",
            "fxrecord-inherit",
            "task-defaults",
            "from-deps",
            "validate",
            "build-task",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_build_sequence_keeps_order() {
        let registry = TransformRegistry::with_defaults();
        let specs = vec![
            TransformSpec::named("run-on-releases"),
            TransformSpec::named("resolve-keys").with_option("fields", json!(["worker.push"])),
            TransformSpec::named("build-task"),
        ];
        let seq = registry.build_sequence("push-apk", &specs).unwrap();
        assert_eq!(seq.names(), vec!["run-on-releases", "resolve-keys", "build-task"]);
        assert_eq!(seq.name(), "push-apk");
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::with_defaults();
        let err = registry
            .build_sequence("k", &[TransformSpec::named("nope")])
            .err()
            .unwrap();
        assert!(matches!(err, TaskgraphError::UnknownTransform(name) if name == "nope"));
    }

    #[test]
    fn test_bad_options_rejected() {
        let registry = TransformRegistry::with_defaults();
        let spec = TransformSpec::named("run-on-releases").with_option("typo", json!(1));
        assert!(matches!(
            registry.build(&spec).err().unwrap(),
            TaskgraphError::InvalidOption { .. }
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = TransformRegistry::new();
        registry.register("noop", |_| Ok(Box::new(MapTransform::new("noop", |_, t| Ok(t)))));
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
