//! Procedure schemas: expected header keys and tabular column types.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Conversion applied to a raw header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// Leading whitespace-separated token as a float (`"36.5 C"` -> 36.5).
    Float,
    /// Whole value as a float.
    FloatNoUnit,
    Int,
    /// `true` only for the exact literal `True`.
    Bool,
    /// Unix epoch seconds, possibly fractional.
    Datetime,
    Str,
}

impl TypeTag {
    /// Parses a tag as written in the procedure registry.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "float" => Some(TypeTag::Float),
            "float_no_unit" => Some(TypeTag::FloatNoUnit),
            "int" => Some(TypeTag::Int),
            "bool" => Some(TypeTag::Bool),
            "datetime" => Some(TypeTag::Datetime),
            "str" => Some(TypeTag::Str),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Float => "float",
            TypeTag::FloatNoUnit => "float_no_unit",
            TypeTag::Int => "int",
            TypeTag::Bool => "bool",
            TypeTag::Datetime => "datetime",
            TypeTag::Str => "str",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target type of a column in the tabular body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Float64,
    Float32,
    Int64,
    Int32,
    Boolean,
    String,
    Datetime,
}

impl ColumnType {
    /// Parses a dtype name in the spelling used by instrument configs.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "float64" | "float" | "double" | "Float64" => Some(ColumnType::Float64),
            "float32" | "Float32" => Some(ColumnType::Float32),
            "int64" | "int" | "Int64" => Some(ColumnType::Int64),
            "int32" | "Int32" => Some(ColumnType::Int32),
            "bool" | "boolean" => Some(ColumnType::Boolean),
            "str" | "string" | "object" => Some(ColumnType::String),
            "datetime64[ns]" | "datetime" => Some(ColumnType::Datetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Float64 => "float64",
            ColumnType::Float32 => "float32",
            ColumnType::Int64 => "int64",
            ColumnType::Int32 => "int32",
            ColumnType::Boolean => "bool",
            ColumnType::String => "str",
            ColumnType::Datetime => "datetime64[ns]",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column type hints for the tabular body of one procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypes {
    /// One dtype for every column.
    Uniform(ColumnType),
    /// Per-column dtypes; unlisted columns are inferred.
    PerColumn(IndexMap<String, ColumnType>),
}

impl Default for ColumnTypes {
    fn default() -> Self {
        ColumnTypes::PerColumn(IndexMap::new())
    }
}

impl ColumnTypes {
    /// Declared type of a column, `None` when it should be inferred.
    pub fn get(&self, column: &str) -> Option<ColumnType> {
        match self {
            ColumnTypes::Uniform(column_type) => Some(*column_type),
            ColumnTypes::PerColumn(map) => map.get(column).copied(),
        }
    }
}

impl fmt::Display for ColumnTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTypes::Uniform(column_type) => write!(f, "{column_type}"),
            ColumnTypes::PerColumn(map) => {
                f.write_str("{")?;
                for (idx, (name, column_type)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{name}': '{column_type}'")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Definition of one procedure: the keys its header may carry and the
/// types of its tabular columns.
///
/// Type tags are kept as written so that an unsupported tag surfaces when
/// the value is coerced, naming the key it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureSchema {
    pub name: String,
    pub parameters: IndexMap<String, String>,
    pub metadata: IndexMap<String, String>,
    pub columns: ColumnTypes,
}

impl ProcedureSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: IndexMap::new(),
            metadata: IndexMap::new(),
            columns: ColumnTypes::default(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, tag: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), tag.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, tag: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), tag.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>, column_type: ColumnType) -> Self {
        match &mut self.columns {
            ColumnTypes::PerColumn(map) => {
                map.insert(column.into(), column_type);
            }
            ColumnTypes::Uniform(_) => {
                let mut map = IndexMap::new();
                map.insert(column.into(), column_type);
                self.columns = ColumnTypes::PerColumn(map);
            }
        }
        self
    }

    pub fn with_columns(mut self, columns: ColumnTypes) -> Self {
        self.columns = columns;
        self
    }

    /// Parameter keys followed by metadata keys, without duplicates.
    pub fn keys(&self) -> IndexSet<&str> {
        self.parameters
            .keys()
            .chain(self.metadata.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.parameters.contains_key(key) || self.metadata.contains_key(key)
    }

    /// Declared type tag for a key; metadata wins over parameters.
    pub fn type_tag(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .or_else(|| self.parameters.get(key))
            .map(String::as_str)
    }

    /// Keys declared in both maps with different tags.
    pub fn conflicting_keys(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(key, tag)| self.metadata.get(*key).is_some_and(|other| other != *tag))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}
