//! Per-experiment header and property records.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::TypedValue;

/// Column holding the folder/stem identifier of an experiment.
pub const DATA_KEY_COLUMN: &str = "data_key";
/// Column holding the resolved procedure name.
pub const PROCEDURE_TYPE_COLUMN: &str = "Procedure type";

/// Raw `key: value` pairs from a file's comment block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeader {
    /// Pairs in file order. A repeated key keeps its first position and
    /// its last value.
    pub entries: IndexMap<String, String>,
    /// Number of comment lines preceding the tabular body.
    pub body_offset: usize,
}

impl RawHeader {
    pub fn new(entries: IndexMap<String, String>, body_offset: usize) -> Self {
        Self {
            entries,
            body_offset,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Typed properties of one parsed experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentProperties {
    pub values: IndexMap<String, TypedValue>,
    pub data_key: String,
    pub procedure_type: String,
}

impl ExperimentProperties {
    pub fn new(data_key: impl Into<String>, procedure_type: impl Into<String>) -> Self {
        Self {
            values: IndexMap::new(),
            data_key: data_key.into(),
            procedure_type: procedure_type.into(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TypedValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.values.get(key)
    }

    /// Number of coerced header values, excluding the derived columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The record as one table row: header values, then `data_key` and
    /// `Procedure type`.
    pub fn row(&self) -> impl Iterator<Item = (&str, TypedValue)> + '_ {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .chain([
                (DATA_KEY_COLUMN, TypedValue::Str(self.data_key.clone())),
                (
                    PROCEDURE_TYPE_COLUMN,
                    TypedValue::Str(self.procedure_type.clone()),
                ),
            ])
    }
}

impl Serialize for ExperimentProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        for (key, value) in self.row() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}
