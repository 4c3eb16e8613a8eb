//! Error types for graph generation

use thiserror::Error;

/// Result type alias for graph generation
pub type Result<T> = std::result::Result<T, TaskgraphError>;

/// Errors that can occur while building a task graph
#[derive(Debug, Error)]
pub enum TaskgraphError {
    /// A parameter was requested that the caller never supplied
    #[error("Missing parameter '{name}'")]
    MissingParameter {
        /// Parameter name
        name: String,
    },

    /// A parameter has a value outside its allowed range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Mutation of a locked container
    #[error("Cannot modify read-only {what}")]
    ReadOnly {
        /// What was being modified
        what: String,
    },

    /// No alternative of a keyed-by block matched
    #[error(
        "No match for 'by-{keyed_by}' value '{value}' and no 'default' \
         while determining '{field}' of '{item}'"
    )]
    KeyedByMatchFailed {
        /// Name of the item being resolved
        item: String,
        /// Dotted path of the field
        field: String,
        /// Parameter the field is keyed by
        keyed_by: String,
        /// Value that failed to match
        value: String,
    },

    /// A dotted field path could not be parsed
    #[error("Invalid field path '{0}'")]
    InvalidPath(String),

    /// A field has an unexpected shape
    #[error("Task '{task}': field '{field}' {reason}")]
    InvalidField {
        /// Task name
        task: String,
        /// Dotted path of the field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// A kind was asked for that is not among the declared kind-dependencies
    #[error("Kind '{requested}' is not a kind-dependency of '{kind}'")]
    UnknownKindDependency {
        /// Kind being built
        kind: String,
        /// Kind that was asked for
        requested: String,
    },

    /// A label was asked for that no upstream task carries
    #[error("Task '{task}' depends on unknown task '{label}'")]
    UnknownDependency {
        /// Task name
        task: String,
        /// Missing label
        label: String,
    },

    /// Two records share a name or label
    #[error("Duplicate task name '{name}'")]
    NameCollision {
        /// The duplicated name
        name: String,
    },

    /// A kind-dependency names a kind that is not defined
    #[error("Kind '{kind}' depends on undefined kind '{dependency}'")]
    UnknownKind {
        /// Kind declaring the dependency
        kind: String,
        /// Undefined kind
        dependency: String,
    },

    /// Kind-dependencies form a cycle
    #[error("Cyclic kind-dependencies between: {}", kinds.join(", "))]
    CyclicKinds {
        /// Kinds that could not be ordered
        kinds: Vec<String>,
    },

    /// A transform was configured with an unusable option
    #[error("Transform '{transform}': option '{option}' {reason}")]
    InvalidOption {
        /// Transform name
        transform: String,
        /// Option key
        option: String,
        /// What is wrong with it
        reason: String,
    },

    /// A transform name is not registered
    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    /// A record failed validation
    #[error("Task '{task}' failed validation: {reason}")]
    Schema {
        /// Task name
        task: String,
        /// Validation failure
        reason: String,
    },

    /// An error raised while a transform handled one record
    #[error("Task '{task}': {source}")]
    Task {
        /// Name of the record
        task: String,
        /// Underlying error
        #[source]
        source: Box<TaskgraphError>,
    },

    /// An error raised inside a transform
    #[error("In transform '{transform}': {source}")]
    Transform {
        /// Transform name
        transform: String,
        /// Underlying error
        #[source]
        source: Box<TaskgraphError>,
    },
}

impl TaskgraphError {
    /// Create a missing parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid field error
    pub fn invalid_field(
        task: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            task: task.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attribute this error to a transform
    ///
    /// Errors already attributed to a transform are returned unchanged, so
    /// the innermost transform name is the one reported.
    pub fn in_transform(self, transform: &str) -> Self {
        match self {
            Self::Transform { .. } => self,
            other => Self::Transform {
                transform: transform.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Attribute this error to the record being transformed
    ///
    /// Errors that already name their record are returned unchanged.
    pub fn for_task(self, task: &str) -> Self {
        match self {
            Self::Task { .. }
            | Self::Transform { .. }
            | Self::InvalidField { .. }
            | Self::UnknownDependency { .. }
            | Self::Schema { .. }
            | Self::KeyedByMatchFailed { .. } => self,
            other => Self::Task {
                task: task.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Name of the record this error was raised for, if known
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::Task { task, .. }
            | Self::InvalidField { task, .. }
            | Self::UnknownDependency { task, .. }
            | Self::Schema { task, .. } => Some(task),
            Self::KeyedByMatchFailed { item, .. } => Some(item),
            Self::Transform { source, .. } => source.task(),
            _ => None,
        }
    }

    /// Name of the transform this error was raised in, if any
    pub fn transform(&self) -> Option<&str> {
        match self {
            Self::Transform { transform, .. } => Some(transform),
            _ => None,
        }
    }

    /// The error with any transform and record attribution stripped
    pub fn root(&self) -> &TaskgraphError {
        match self {
            Self::Transform { source, .. } | Self::Task { source, .. } => source.root(),
            other => other,
        }
    }
}
