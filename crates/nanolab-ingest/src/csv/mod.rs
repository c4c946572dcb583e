//! Tabular body reading with schema-driven column types.

mod columns;
mod reader;

pub use columns::{ColumnError, NA_VALUES, build_column, infer_column_type};
pub use reader::{BodyRecords, read_body_records, read_table, skip_lines};
