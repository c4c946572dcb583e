//! Data model for lab-instrument experiment exports.
//!
//! These types carry no I/O. Schemas come from `nanolab-standards`,
//! headers and typed values are produced by `nanolab-ingest`.

pub mod experiment;
pub mod options;
pub mod schema;
pub mod value;

pub use experiment::{DATA_KEY_COLUMN, ExperimentProperties, PROCEDURE_TYPE_COLUMN, RawHeader};
pub use options::{ParseOptions, ValidationMode};
pub use schema::{ColumnType, ColumnTypes, ProcedureSchema, TypeTag};
pub use value::TypedValue;
