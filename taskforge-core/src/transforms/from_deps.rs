//! Fan-out over upstream tasks

use serde_json::{Map, Value};

use super::{bool_option, reject_unknown_options, string_list_option};
use crate::dependencies::UpstreamTask;
use crate::domain::task::TaskRecord;
use crate::error::Result;
use crate::transform::{TaskStream, Transform, TransformConfig, for_record};

/// Emits one record per upstream task of the selected kinds
///
/// Each output is a copy of the input record named
/// `"{record name}-{upstream name}"` and wired to its upstream through
/// `primary-dependency`, `dependent-tasks` and `dependencies`.
#[derive(Debug, Clone, Default)]
pub struct FromDeps {
    kinds: Option<Vec<String>>,
    copy_attributes: bool,
}

impl FromDeps {
    pub const NAME: &'static str = "from-deps";

    /// Fan out over every declared kind-dependency
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the fan-out to `kinds`
    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Copy upstream attributes the record does not set
    pub fn copy_attributes(mut self, copy: bool) -> Self {
        self.copy_attributes = copy;
        self
    }

    /// Options: `kinds` (list of kind names), `copy-attributes` (boolean)
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &["kinds", "copy-attributes"])?;
        Ok(Self {
            kinds: string_list_option(Self::NAME, options, "kinds")?,
            copy_attributes: bool_option(Self::NAME, options, "copy-attributes")?
                .unwrap_or(false),
        })
    }

    fn expand(&self, config: &TransformConfig, task: TaskRecord) -> Result<Vec<TaskRecord>> {
        let deps = &config.kind_dependencies_tasks;
        let kinds = self.kinds.as_deref().unwrap_or(deps.kinds());

        let mut produced = Vec::new();
        for kind in kinds {
            for upstream in deps.tasks_of_kind(kind)? {
                produced.push(self.derive(&task, upstream)?);
            }
        }
        Ok(produced)
    }

    fn derive(&self, task: &TaskRecord, upstream: &UpstreamTask) -> Result<TaskRecord> {
        let mut derived = task.clone();
        derived.name = Some(match &task.name {
            Some(name) => format!("{}-{}", name, upstream.name()),
            None => upstream.name().to_string(),
        });

        let label = Value::String(upstream.label.clone());
        derived.set("primary-dependency", label.clone());
        derived
            .object_mut("dependent-tasks")?
            .insert(upstream.kind.clone(), label.clone());
        derived
            .object_mut("dependencies")?
            .insert(upstream.kind.clone(), label);

        if self.copy_attributes {
            let attributes = derived.attributes_mut()?;
            for (key, value) in &upstream.attributes {
                if key != "kind" && !attributes.contains_key(key) {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(derived)
    }
}

impl Transform for FromDeps {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.flat_map(move |task| {
            match task.and_then(|task| for_record(task, |task| self.expand(config, task))) {
                Ok(records) => records.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        }))
    }
}
