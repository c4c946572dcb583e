//! Typed column construction from raw body cells.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{DataType, NamedFrom, PolarsError, Series, TimeUnit};

use nanolab_model::ColumnType;

use crate::coerce::epoch_seconds_to_datetime;

/// Failure to build one column.
#[derive(Debug)]
pub enum ColumnError {
    /// Cell at `row` (0-based within the body) does not convert.
    Cell { row: usize, value: String },
    Polars(PolarsError),
}

impl From<PolarsError> for ColumnError {
    fn from(err: PolarsError) -> Self {
        Self::Polars(err)
    }
}

/// Builds a Series of the given type. `None`, empty cells and
/// [`NA_VALUES`] are missing values; integer columns cannot hold them.
pub fn build_column(
    name: &str,
    cells: &[Option<&str>],
    column_type: ColumnType,
) -> Result<Series, ColumnError> {
    let series = match column_type {
        ColumnType::Float64 => Series::new(name.into(), parse_nullable(cells, parse_f64)?),
        ColumnType::Float32 => Series::new(name.into(), parse_nullable(cells, parse_f32)?),
        ColumnType::Int64 => Series::new(name.into(), parse_required(cells, parse_i64)?),
        ColumnType::Int32 => Series::new(name.into(), parse_required(cells, parse_i32)?),
        ColumnType::Boolean => Series::new(name.into(), parse_nullable(cells, parse_bool)?),
        ColumnType::String => {
            let values: Vec<Option<&str>> = cells.iter().map(|cell| non_empty(*cell)).collect();
            Series::new(name.into(), values)
        }
        ColumnType::Datetime => {
            let micros = parse_nullable(cells, parse_timestamp_micros)?;
            Series::new(name.into(), micros)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}

/// Picks a type for a column without a declared dtype.
///
/// Integers with gaps widen to Float64 so the gaps can stay missing.
pub fn infer_column_type(cells: &[Option<&str>]) -> ColumnType {
    let present: Vec<&str> = cells.iter().filter_map(|cell| non_empty(*cell)).collect();
    if present.is_empty() {
        return ColumnType::Float64;
    }
    let has_gaps = present.len() < cells.len();
    if present.iter().all(|v| parse_i64(v).is_some()) {
        return if has_gaps {
            ColumnType::Float64
        } else {
            ColumnType::Int64
        };
    }
    if present.iter().all(|v| parse_f64(v).is_some()) {
        return ColumnType::Float64;
    }
    if present.iter().all(|v| parse_bool(v).is_some()) {
        return ColumnType::Boolean;
    }
    ColumnType::String
}

/// Cell texts read as missing values, matched exactly.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn non_empty(cell: Option<&str>) -> Option<&str> {
    cell.filter(|v| !NA_VALUES.contains(v))
}

fn parse_nullable<T>(
    cells: &[Option<&str>],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>, ColumnError> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match non_empty(*cell) {
            None => Ok(None),
            Some(value) => parse(value).map(Some).ok_or_else(|| ColumnError::Cell {
                row,
                value: value.to_string(),
            }),
        })
        .collect()
}

fn parse_required<T>(
    cells: &[Option<&str>],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, ColumnError> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let value = cell.unwrap_or("");
            parse(value).ok_or_else(|| ColumnError::Cell {
                row,
                value: value.to_string(),
            })
        })
        .collect()
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

fn parse_f32(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok()
}

fn parse_i64(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

fn parse_i32(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Epoch seconds, RFC 3339, or `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC).
fn parse_timestamp_micros(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Some(seconds) = parse_f64(value) {
        return epoch_seconds_to_datetime(seconds).map(|ts| ts.timestamp_micros());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.timestamp_micros());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc().timestamp_micros())
}
