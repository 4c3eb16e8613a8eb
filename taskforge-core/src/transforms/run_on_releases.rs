//! Release-type filtering

use serde_json::{Map, Value};
use tracing::debug;

use super::reject_unknown_options;
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};
use crate::parameters::RELEASE_TYPE;
use crate::transform::{TaskStream, Transform, TransformConfig};

const RUN_ON_RELEASES: &str = "run-on-releases";

/// Drops records whose `run-on-releases` list excludes the current release type
///
/// Records without `run-on-releases` are kept. The `release-type`
/// parameter is only read for records that carry the list.
#[derive(Debug, Default)]
pub struct RunOnReleases;

impl RunOnReleases {
    pub const NAME: &'static str = "run-on-releases";

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        reject_unknown_options(Self::NAME, options, &[])?;
        Ok(Self)
    }

    fn keep(config: &TransformConfig, task: &TaskRecord) -> Result<bool> {
        let Some(releases) = task.get(RUN_ON_RELEASES) else {
            return Ok(true);
        };
        let releases = releases.as_array().ok_or_else(|| {
            TaskgraphError::invalid_field(task.display_name(), RUN_ON_RELEASES, "is not a list")
        })?;
        let release_type = config.params.get_str(RELEASE_TYPE)?;
        let keep = releases.iter().any(|r| r.as_str() == Some(release_type));
        if !keep {
            debug!(
                "Dropping '{}': release type '{}' not in {}",
                task.display_name(),
                release_type,
                RUN_ON_RELEASES
            );
        }
        Ok(keep)
    }
}

impl Transform for RunOnReleases {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        Box::new(tasks.filter_map(move |task| match task {
            Ok(task) => match Self::keep(config, &task) {
                Ok(true) => Some(Ok(task)),
                Ok(false) => None,
                Err(e) => Some(Err(e.for_task(task.display_name()))),
            },
            Err(e) => Some(Err(e)),
        }))
    }
}
