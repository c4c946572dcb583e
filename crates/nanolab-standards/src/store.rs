//! Parameter stores that back the procedure registry.
//!
//! A store answers a single question: the value registered under a
//! parameter name. The registry only ever asks for [`PROCEDURES_KEY`].
//!
//! [`PROCEDURES_KEY`]: crate::registry::PROCEDURES_KEY

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Result, StandardsError};

/// Key-value source of configuration parameters.
pub trait ParameterStore {
    /// Returns the value stored under `key`, or `None` when absent.
    fn load(&self, key: &str) -> Result<Option<Value>>;
}

/// Parameters read from one JSON or TOML file.
///
/// The file must hold a table at top level; its entries are the
/// parameter names.
#[derive(Debug, Clone)]
pub struct FileParameterStore {
    path: PathBuf,
}

impl FileParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Value> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| StandardsError::io(&self.path, e))?;
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => serde_json::from_str(&contents).map_err(|e| StandardsError::Json {
                path: self.path.clone(),
                source: e,
            }),
            Some("toml") => toml::from_str(&contents).map_err(|e| StandardsError::Toml {
                path: self.path.clone(),
                source: e,
            }),
            _ => Err(StandardsError::UnsupportedFormat {
                path: self.path.clone(),
            }),
        }
    }
}

impl ParameterStore for FileParameterStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let mut root = self.read()?;
        Ok(root.as_object_mut().and_then(|map| map.remove(key)))
    }
}

/// In-memory parameters, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryParameterStore {
    values: IndexMap<String, Value>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl ParameterStore for MemoryParameterStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }
}
