//! Parsing of one experiment export into properties and a data table.

use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{debug, debug_span};

use nanolab_model::{
    ExperimentProperties, ParseOptions, ProcedureSchema, RawHeader, ValidationMode,
};
use nanolab_standards::SchemaRegistry;

use crate::coerce::coerce;
use crate::csv::read_table;
use crate::error::{IngestError, Result};
use crate::header::{ensure_csv, extract_data_key, parse_header, procedure_id_from_line};

/// Properties and data table of one experiment.
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    pub properties: ExperimentProperties,
    pub table: DataFrame,
}

/// Parses experiment files against a shared procedure registry.
#[derive(Debug, Clone, Copy)]
pub struct ExperimentParser<'a> {
    registry: &'a SchemaRegistry,
    options: ParseOptions,
}

impl<'a> ExperimentParser<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Parses one file. Any failure aborts the whole experiment.
    pub fn parse(&self, path: &Path) -> Result<ExperimentResult> {
        let span = debug_span!("parse_experiment", path = %path.display());
        let _guard = span.enter();

        let text = std::fs::read_to_string(path).map_err(|e| IngestError::open(path, e))?;
        let header = parse_header(path, text.lines())?;

        ensure_csv(path)?;
        let procedure = procedure_id_from_line(path, text.lines().next().unwrap_or_default());
        let schema = self.registry.resolve(&procedure)?;

        let properties = build_properties(path, &header, schema, self.options.validation)?;
        let table = read_table(path, &text, header.body_offset, &schema.columns)?;

        debug!(
            procedure = %schema.name,
            data_key = %properties.data_key,
            property_count = properties.len(),
            rows = table.height(),
            columns = table.width(),
            "parsed experiment"
        );
        Ok(ExperimentResult { properties, table })
    }
}

/// Parses one file with the given registry and options.
pub fn parse_experiment(
    path: &Path,
    registry: &SchemaRegistry,
    options: ParseOptions,
) -> Result<ExperimentResult> {
    ExperimentParser::new(registry).with_options(options).parse(path)
}

/// A header entry paired with its declared type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedEntry<'a> {
    pub key: &'a str,
    pub raw: &'a str,
    pub type_tag: &'a str,
}

/// Checks header keys against the schema in the given direction and
/// returns the entries to coerce.
pub fn validate_header<'a>(
    header: &'a RawHeader,
    schema: &'a ProcedureSchema,
    mode: ValidationMode,
) -> Result<Vec<ValidatedEntry<'a>>> {
    match mode {
        ValidationMode::KnownKeys => header
            .iter()
            .map(|(key, raw)| {
                let type_tag = schema.type_tag(key).ok_or_else(|| IngestError::UnknownKey {
                    key: key.to_string(),
                    procedure: schema.name.clone(),
                })?;
                Ok(ValidatedEntry { key, raw, type_tag })
            })
            .collect(),
        ValidationMode::Exhaustive => schema
            .keys()
            .into_iter()
            .map(|key| {
                let raw = header.get(key).ok_or_else(|| IngestError::MissingKey {
                    key: key.to_string(),
                    procedure: schema.name.clone(),
                })?;
                let type_tag = schema.type_tag(key).unwrap_or_default();
                Ok(ValidatedEntry { key, raw, type_tag })
            })
            .collect(),
    }
}

/// Validates and coerces the header, then attaches `data_key` and the
/// procedure name.
pub fn build_properties(
    path: &Path,
    header: &RawHeader,
    schema: &ProcedureSchema,
    mode: ValidationMode,
) -> Result<ExperimentProperties> {
    let entries = validate_header(header, schema, mode)?;
    let mut properties = ExperimentProperties::new(extract_data_key(path)?, schema.name.clone());
    for entry in entries {
        properties.insert(entry.key, coerce(entry.key, entry.raw, entry.type_tag)?);
    }
    Ok(properties)
}
