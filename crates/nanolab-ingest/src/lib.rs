//! Ingestion of lab-instrument CSV exports.
//!
//! A file is parsed in three steps: the comment header is scanned for
//! `key: value` entries ([`header`]), each entry is converted with the
//! type tag its procedure schema declares ([`coerce`]), and the body after
//! the comment block is read into a typed DataFrame ([`csv`]).

pub mod coerce;
pub mod csv;
pub mod error;
pub mod experiment;
pub mod header;

pub use coerce::{coerce, coerce_as, epoch_seconds_to_datetime};
pub use csv::{BodyRecords, read_body_records, read_table};
pub use error::{IngestError, Result};
pub use experiment::{
    ExperimentParser, ExperimentResult, ValidatedEntry, build_properties, parse_experiment,
    validate_header,
};
pub use header::{
    extract_data_key, extract_procedure_id, format_header, parse_entry, parse_header,
    read_header_lines,
};
