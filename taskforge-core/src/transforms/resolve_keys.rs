//! Keyed-by resolution of configured fields

use serde_json::{Map, Value};

use super::{reject_unknown_options, string_list_option};
use crate::domain::path::FieldPath;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::keyed_by::{KeyedByValues, resolve_keyed_by};
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

/// Resolves keyed-by blocks at a list of dotted paths
///
/// Values are taken from every parameter, overlaid with the record's own
/// attributes.
pub struct ResolveKeys {
    fields: Vec<FieldPath>,
}

impl ResolveKeys {
    pub const NAME: &'static str = "resolve-keys";

    /// # Errors
    /// Returns `InvalidPath` for a malformed path
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = fields
            .into_iter()
            .map(|f| FieldPath::parse(f.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    /// Options: `fields` (list of dotted paths)
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &["fields"])?;
        let fields = string_list_option(Self::NAME, options, "fields")?.unwrap_or_default();
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    fn resolve(&self, base: &KeyedByValues, mut task: TaskRecord) -> Result<TaskRecord> {
        let mut values = base.clone();
        if let Some(attributes) = task.attributes() {
            values.extend_from_map(attributes);
        }
        let item = task.display_name().to_string();
        for path in &self.fields {
            resolve_keyed_by(&mut task.fields, path, &item, &values)?;
        }
        Ok(task)
    }
}

impl Transform for ResolveKeys {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        let base = KeyedByValues::from_params(&config.params);
        Box::new(tasks.map(move |task| {
            task.and_then(|task| for_record(task, |task| self.resolve(&base, task)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskgraphError;
    use crate::parameters::Parameters;
    use serde_json::json;

    fn config(project: &str) -> TransformConfig {
        TransformConfig::standalone(Parameters::new([("project", json!(project))]), "push-apk")
    }

    fn run(config: &TransformConfig, t: &ResolveKeys, task: Value) -> Result<TaskRecord> {
        let task = TaskRecord::from_value(task).unwrap();
        t.transform(config, Box::new(std::iter::once(Ok(task))))
            .next()
            .unwrap()
    }

    #[test]
    fn test_resolves_by_parameter() {
        let t = ResolveKeys::new(["worker.push"]).unwrap();
        let task = json!({
            "name": "push",
            "worker": { "push": { "by-project": { "mozilla-central": "yes", "default": "no" } } }
        });

        let out = run(&config("mozilla-central"), &t, task.clone()).unwrap();
        assert_eq!(out.fields["worker"]["push"], json!("yes"));

        let out = run(&config("try"), &t, task).unwrap();
        assert_eq!(out.fields["worker"]["push"], json!("no"));
    }

    #[test]
    fn test_attributes_override_parameters() {
        let t = ResolveKeys::new(["run.tooltool"]).unwrap();
        let task = json!({
            "name": "build",
            "attributes": { "build-platform": "linux64" },
            "run": { "tooltool": { "by-build-platform": { "linux*": true, "default": false } } }
        });
        let out = run(&config("mozilla-central"), &t, task).unwrap();
        assert_eq!(out.fields["run"]["tooltool"], json!(true));
    }

    #[test]
    fn test_failure_names_the_record() {
        let t = ResolveKeys::new(["worker.push"]).unwrap();
        let task = json!({
            "name": "push",
            "worker": { "push": { "by-project": { "mozilla-central": "yes" } } }
        });
        let err = run(&config("try"), &t, task).unwrap_err();
        assert!(matches!(
            err,
            TaskgraphError::KeyedByMatchFailed { item, field, .. }
                if item == "push" && field == "worker.push"
        ));
    }

    #[test]
    fn test_from_options() {
        let opts = json!({ "fields": ["worker.push", "treeherder.tier"] });
        let t = ResolveKeys::from_options(opts.as_object().unwrap()).unwrap();
        assert_eq!(t.fields().len(), 2);

        let opts = json!({ "fields": ["worker..push"] });
        assert!(ResolveKeys::from_options(opts.as_object().unwrap()).is_err());
    }
}
