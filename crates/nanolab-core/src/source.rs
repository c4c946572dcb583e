//! Producers of single-experiment results.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nanolab_ingest::{ExperimentParser, ExperimentResult, IngestError};
use nanolab_model::ParseOptions;
use nanolab_standards::SchemaRegistry;

/// Something that yields one parsed experiment on demand.
///
/// Producers are invoked lazily by [`crate::separate`], one at a time.
pub trait ExperimentSource {
    fn produce(&self) -> Result<ExperimentResult, IngestError>;

    /// Short label used in log lines.
    fn describe(&self) -> String;
}

impl<T: ExperimentSource + ?Sized> ExperimentSource for Box<T> {
    fn produce(&self) -> Result<ExperimentResult, IngestError> {
        (**self).produce()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: ExperimentSource + ?Sized> ExperimentSource for &T {
    fn produce(&self) -> Result<ExperimentResult, IngestError> {
        (**self).produce()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// An experiment export on disk.
#[derive(Debug, Clone)]
pub struct FileExperiment {
    path: PathBuf,
    registry: Arc<SchemaRegistry>,
    options: ParseOptions,
}

impl FileExperiment {
    pub fn new(path: impl Into<PathBuf>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            path: path.into(),
            registry,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExperimentSource for FileExperiment {
    fn produce(&self) -> Result<ExperimentResult, IngestError> {
        ExperimentParser::new(&self.registry)
            .with_options(self.options)
            .parse(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A result that is already in memory.
#[derive(Debug, Clone)]
pub struct InMemoryExperiment {
    label: String,
    result: ExperimentResult,
}

impl InMemoryExperiment {
    pub fn new(label: impl Into<String>, result: ExperimentResult) -> Self {
        Self {
            label: label.into(),
            result,
        }
    }
}

impl ExperimentSource for InMemoryExperiment {
    fn produce(&self) -> Result<ExperimentResult, IngestError> {
        Ok(self.result.clone())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// A producer backed by a closure.
pub struct FnExperiment<F> {
    label: String,
    produce: F,
}

impl<F> FnExperiment<F>
where
    F: Fn() -> Result<ExperimentResult, IngestError>,
{
    pub fn new(label: impl Into<String>, produce: F) -> Self {
        Self {
            label: label.into(),
            produce,
        }
    }
}

impl<F> fmt::Debug for FnExperiment<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExperiment")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<F> ExperimentSource for FnExperiment<F>
where
    F: Fn() -> Result<ExperimentResult, IngestError>,
{
    fn produce(&self) -> Result<ExperimentResult, IngestError> {
        (self.produce)()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
