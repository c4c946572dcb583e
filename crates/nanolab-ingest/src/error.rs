//! Error types for experiment ingestion.

use std::path::PathBuf;

use nanolab_model::TypeTag;
use nanolab_standards::StandardsError;
use thiserror::Error;

/// Errors that can occur while parsing one experiment file.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Experiment file not found.
    #[error("the file '{path}' was not found")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path too short to derive a folder/stem key.
    #[error("cannot derive a data key from '{path}': need a parent folder and a file name")]
    InvalidPath { path: PathBuf },

    /// File is not a `.csv` export.
    #[error("the file '{path}' is not a CSV. Please provide a valid .csv file")]
    InvalidFormat { path: PathBuf },

    // === Header Errors ===
    /// A `#\t` header line without a `key: value` shape.
    #[error("malformed header line {line} in {path}: '{content}' (expected 'key: value')")]
    MalformedHeader {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// Header key not declared by the procedure schema.
    #[error("key '{key}' is missing in the configuration of procedure '{procedure}'")]
    UnknownKey { key: String, procedure: String },

    /// Schema key absent from the header.
    #[error("key '{key}' required by procedure '{procedure}' is missing from the header")]
    MissingKey { key: String, procedure: String },

    // === Value Errors ===
    /// Schema declares a type tag with no conversion.
    #[error("unhandled type '{type_tag}' for metadata key '{key}'")]
    UnsupportedType { key: String, type_tag: String },

    /// Header value does not parse as its declared type.
    #[error("invalid {type_tag} value '{value}' for key '{key}'")]
    ValueParse {
        key: String,
        value: String,
        type_tag: TypeTag,
    },

    /// Tabular body does not fit the declared column types.
    #[error("error in reading {path} with dtype mapping: {dtypes}: {message}")]
    TableType {
        path: PathBuf,
        dtypes: String,
        message: String,
    },

    // === Registry Errors ===
    #[error(transparent)]
    Standards(#[from] StandardsError),

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl IngestError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::FileRead { path, source }
        }
    }
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
