//! Taskforge Core
//!
//! Task-graph generation: kinds of task descriptions are fed through ordered
//! transform sequences, and each kind may read the finished tasks of the
//! kinds it depends on.
//!
//! This crate contains:
//! - Domain types: task records, field paths, kind metadata
//! - Parameters: the read-only store of caller-supplied values
//! - Keyed-by resolution of conditional configuration values
//! - The dependency inspector for upstream tasks
//! - The transform trait, transform sequences and built-in transforms
//! - The pipeline runner that builds the whole graph

pub mod dependencies;
pub mod domain;
pub mod error;
pub mod keyed_by;
pub mod parameters;
pub mod pipeline;
pub mod registry;
pub mod symbol;
pub mod transform;
pub mod transforms;

pub use dependencies::{KindDependencies, UpstreamTask};
pub use domain::kind::{KindMetadata, TransformSpec};
pub use domain::path::FieldPath;
pub use domain::task::TaskRecord;
pub use error::{Result, TaskgraphError};
pub use parameters::Parameters;
pub use pipeline::{Kind, Pipeline, TaskGraph};
pub use registry::TransformRegistry;
pub use transform::{TaskStream, Transform, TransformConfig, TransformSequence, for_record};
