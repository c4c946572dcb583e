#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON parameters {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML parameters {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported parameters file format: {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("parameter '{key}' not found in catalog")]
    MissingParameter { key: String },

    #[error("malformed definition for procedure '{procedure}': {reason}")]
    SchemaShape { procedure: String, reason: String },

    #[error("procedure '{procedure}' not found in procedures")]
    UnknownProcedure { procedure: String },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(procedure: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaShape {
            procedure: procedure.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StandardsError>;
