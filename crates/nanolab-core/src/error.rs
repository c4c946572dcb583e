//! Error types for batch processing.

use std::path::PathBuf;

use nanolab_ingest::IngestError;
use thiserror::Error;

/// Errors raised while running a batch over projects.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A batch was started while another one is still running.
    #[error("a batch is already being processed")]
    AlreadyProcessing,

    /// The project catalog could not list or load a project.
    #[error("failed to load project '{project}': {message}")]
    Catalog { project: String, message: String },

    /// Outputs of a project could not be registered or written.
    #[error("failed to write outputs of project '{project}': {message}")]
    Output { project: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl BatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<polars::prelude::PolarsError> for BatchError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;
