//! Ordered composition of transforms

use std::collections::HashSet;

use tracing::debug;

use super::{TaskStream, Transform, TransformConfig};
use crate::domain::task::TaskRecord;
use crate::error::{Result, TaskgraphError};

/// An ordered list of transforms applied one after another
///
/// The output of each stage is checked for duplicate record names, and any
/// error a stage raises is attributed to that stage.
pub struct TransformSequence {
    name: String,
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformSequence {
    /// Create an empty sequence
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transforms: Vec::new(),
        }
    }

    /// Append a transform
    pub fn register(&mut self, transform: impl Transform + 'static) -> &mut Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Append an already boxed transform
    pub fn register_boxed(&mut self, transform: Box<dyn Transform>) -> &mut Self {
        self.transforms.push(transform);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.register(transform);
        self
    }

    /// A sequence running `self` and then `other`
    pub fn chain(mut self, other: TransformSequence) -> Self {
        self.transforms.extend(other.transforms);
        self
    }

    /// Insert a transform before all others
    pub fn prepend(&mut self, transform: Box<dyn Transform>) -> &mut Self {
        self.transforms.insert(0, transform);
        self
    }

    /// Number of transforms
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the sequence is the identity
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Names of the transforms in application order
    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run `input` through every transform in order
    pub fn apply<'a, I>(&'a self, config: &'a TransformConfig, input: I) -> TaskStream<'a>
    where
        I: IntoIterator<Item = TaskRecord>,
        I::IntoIter: 'a,
    {
        self.transform(config, Box::new(input.into_iter().map(Ok)))
    }
}

impl Transform for TransformSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'a>(
        &'a self,
        config: &'a TransformConfig,
        tasks: TaskStream<'a>,
    ) -> TaskStream<'a> {
        self.transforms.iter().fold(tasks, |stream, stage| {
            debug!("Applying transform '{}' to kind '{}'", stage.name(), config.kind);
            let name = stage.name();
            let output = stage
                .transform(config, stream)
                .map(move |task| task.map_err(|e| e.in_transform(name)));
            let checked: TaskStream<'a> = Box::new(UniqueNames::new(name, output));
            checked
        })
    }
}

/// Fails the stream when a name repeats
///
/// Unnamed records are not checked.
struct UniqueNames<I> {
    stage: String,
    seen: HashSet<String>,
    inner: I,
}

impl<I> UniqueNames<I> {
    fn new(stage: &str, inner: I) -> Self {
        Self {
            stage: stage.to_string(),
            seen: HashSet::new(),
            inner,
        }
    }
}

impl<I> Iterator for UniqueNames<I>
where
    I: Iterator<Item = Result<TaskRecord>>,
{
    type Item = Result<TaskRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let task = match self.inner.next()? {
            Ok(task) => task,
            Err(e) => return Some(Err(e)),
        };
        if let Some(name) = &task.name {
            if !self.seen.insert(name.clone()) {
                let err = TaskgraphError::NameCollision { name: name.clone() };
                return Some(Err(err.in_transform(&self.stage)));
            }
        }
        Some(Ok(task))
    }
}
