#![deny(unsafe_code)]

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, info};

use nanolab_model::{ColumnType, ColumnTypes, ProcedureSchema};

use crate::error::{Result, StandardsError};
use crate::store::ParameterStore;

/// Parameter name under which procedure definitions are registered.
pub const PROCEDURES_KEY: &str = "procedures";

const PARAMETERS_FIELD: &str = "Parameters";
const METADATA_FIELD: &str = "Metadata";
const DATA_FIELD: &str = "Data";

/// Procedure schemas loaded once and shared read-only by every parser.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    procedures: IndexMap<String, ProcedureSchema>,
}

impl SchemaRegistry {
    /// Loads the `procedures` parameter from a store.
    ///
    /// Load failures mean no experiment can be parsed and are returned to
    /// the caller as-is.
    pub fn load(store: &dyn ParameterStore) -> Result<Self> {
        let value = store
            .load(PROCEDURES_KEY)?
            .ok_or_else(|| StandardsError::MissingParameter {
                key: PROCEDURES_KEY.to_string(),
            })?;
        let registry = Self::from_value(&value)?;
        info!(procedure_count = registry.len(), "loaded procedure registry");
        Ok(registry)
    }

    /// Builds the registry from the `procedures` mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(entries) = value.as_object() else {
            return Err(StandardsError::shape(
                PROCEDURES_KEY,
                "expected a mapping of procedure name to definition",
            ));
        };
        let mut procedures = IndexMap::with_capacity(entries.len());
        for (name, definition) in entries {
            let schema = parse_procedure(name, definition)?;
            debug!(
                procedure = %name,
                key_count = schema.keys().len(),
                "registered procedure"
            );
            procedures.insert(name.clone(), schema);
        }
        Ok(Self { procedures })
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = ProcedureSchema>) -> Self {
        Self {
            procedures: schemas
                .into_iter()
                .map(|schema| (schema.name.clone(), schema))
                .collect(),
        }
    }

    pub fn get(&self, procedure: &str) -> Option<&ProcedureSchema> {
        self.procedures.get(procedure)
    }

    /// Looks up a procedure, failing when it is not registered.
    pub fn resolve(&self, procedure: &str) -> Result<&ProcedureSchema> {
        self.get(procedure)
            .ok_or_else(|| StandardsError::UnknownProcedure {
                procedure: procedure.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcedureSchema> {
        self.procedures.values()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

fn parse_procedure(name: &str, definition: &Value) -> Result<ProcedureSchema> {
    let Some(fields) = definition.as_object() else {
        return Err(StandardsError::shape(name, "definition is not a mapping"));
    };

    let parameters = parse_tag_map(name, fields, PARAMETERS_FIELD)?;
    let metadata = parse_tag_map(name, fields, METADATA_FIELD)?;
    let columns = parse_columns(name, fields.get(DATA_FIELD))?;

    let schema = ProcedureSchema {
        name: name.to_string(),
        parameters,
        metadata,
        columns,
    };

    let conflicts = schema.conflicting_keys();
    if !conflicts.is_empty() {
        return Err(StandardsError::shape(
            name,
            format!(
                "keys declared with different types in {PARAMETERS_FIELD} and {METADATA_FIELD}: {}",
                conflicts.join(", ")
            ),
        ));
    }

    Ok(schema)
}

fn parse_tag_map(
    procedure: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<IndexMap<String, String>> {
    let Some(value) = fields.get(field) else {
        return Err(StandardsError::shape(
            procedure,
            format!("missing '{field}'"),
        ));
    };
    // An empty YAML/TOML section may come through as null.
    if value.is_null() {
        return Ok(IndexMap::new());
    }
    let Some(entries) = value.as_object() else {
        return Err(StandardsError::shape(
            procedure,
            format!("'{field}' is not a mapping of key to type"),
        ));
    };
    let mut tags = IndexMap::with_capacity(entries.len());
    for (key, tag) in entries {
        let Some(tag) = tag.as_str() else {
            return Err(StandardsError::shape(
                procedure,
                format!("type of '{key}' in '{field}' is not a string"),
            ));
        };
        tags.insert(key.clone(), tag.to_string());
    }
    Ok(tags)
}

fn parse_columns(procedure: &str, value: Option<&Value>) -> Result<ColumnTypes> {
    match value {
        None | Some(Value::Null) => Ok(ColumnTypes::default()),
        Some(Value::String(dtype)) => parse_dtype(procedure, "*", dtype).map(ColumnTypes::Uniform),
        Some(Value::Object(entries)) => {
            let mut columns = IndexMap::with_capacity(entries.len());
            for (column, dtype) in entries {
                let Some(dtype) = dtype.as_str() else {
                    return Err(StandardsError::shape(
                        procedure,
                        format!("dtype of column '{column}' is not a string"),
                    ));
                };
                columns.insert(column.clone(), parse_dtype(procedure, column, dtype)?);
            }
            Ok(ColumnTypes::PerColumn(columns))
        }
        Some(_) => Err(StandardsError::shape(
            procedure,
            format!("'{DATA_FIELD}' must be a dtype or a mapping of column to dtype"),
        )),
    }
}

fn parse_dtype(procedure: &str, column: &str, dtype: &str) -> Result<ColumnType> {
    ColumnType::parse(dtype).ok_or_else(|| {
        StandardsError::shape(
            procedure,
            format!("unsupported dtype '{dtype}' for column '{column}'"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::store::MemoryParameterStore;

    fn procedures() -> Value {
        json!({
            "ITt": {
                "Parameters": {"VDS": "float", "Laser toggle": "bool"},
                "Metadata": {"Start time": "datetime", "Chip number": "int"},
                "Data": {"Time (s)": "float64", "I (A)": "float64"}
            },
            "IVg": {
                "Parameters": {"VDS": "float"},
                "Metadata": {},
                "Data": "float64"
            }
        })
    }

    #[test]
    fn loads_from_store() {
        let store = MemoryParameterStore::new().with(PROCEDURES_KEY, procedures());
        let registry = SchemaRegistry::load(&store).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["ITt", "IVg"]);

        let itt = registry.resolve("ITt").unwrap();
        assert_eq!(itt.keys().len(), 4);
        assert_eq!(itt.columns.get("I (A)"), Some(ColumnType::Float64));

        let ivg = registry.resolve("IVg").unwrap();
        assert_eq!(ivg.columns, ColumnTypes::Uniform(ColumnType::Float64));
    }

    #[test]
    fn missing_procedures_parameter() {
        let store = MemoryParameterStore::new();
        let err = SchemaRegistry::load(&store).unwrap_err();
        assert!(matches!(err, StandardsError::MissingParameter { .. }));
    }

    #[test]
    fn unknown_procedure_is_an_error_but_get_is_optional() {
        let registry = SchemaRegistry::from_value(&procedures()).unwrap();
        assert!(registry.get("").is_none());
        let err = registry.resolve("").unwrap_err();
        assert_eq!(err.to_string(), "procedure '' not found in procedures");
    }

    #[test]
    fn parameters_must_be_a_mapping() {
        let value = json!({"Bad": {"Parameters": ["VDS"], "Metadata": {}}});
        let err = SchemaRegistry::from_value(&value).unwrap_err();
        assert!(matches!(err, StandardsError::SchemaShape { ref procedure, .. } if procedure == "Bad"));
    }

    #[test]
    fn metadata_is_required() {
        let value = json!({"Bad": {"Parameters": {}}});
        let err = SchemaRegistry::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("missing 'Metadata'"));
    }

    #[test]
    fn conflicting_tags_are_rejected() {
        let value = json!({
            "Bad": {"Parameters": {"k": "float"}, "Metadata": {"k": "int"}}
        });
        let err = SchemaRegistry::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("different types"));
    }

    #[test]
    fn unsupported_dtype_is_rejected() {
        let value = json!({
            "Bad": {"Parameters": {}, "Metadata": {}, "Data": {"V": "complex128"}}
        });
        let err = SchemaRegistry::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("complex128"));
    }

    #[test]
    fn unknown_type_tags_are_kept_for_coercion() {
        let value = json!({"X": {"Parameters": {"k": "decimal"}, "Metadata": null}});
        let registry = SchemaRegistry::from_value(&value).unwrap();
        assert_eq!(registry.resolve("X").unwrap().type_tag("k"), Some("decimal"));
    }
}
