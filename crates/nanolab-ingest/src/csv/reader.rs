//! Reads the delimited body that follows the comment block.

use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::{DataFrame, IntoColumn};

use nanolab_model::ColumnTypes;

use crate::error::{IngestError, Result};

use super::columns::{ColumnError, build_column, infer_column_type};

/// Raw body cells with their source line numbers.
#[derive(Debug, Clone)]
pub struct BodyRecords {
    /// Column names, de-duplicated (`I`, `I.1`, ...).
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based file line of each row.
    pub lines: Vec<usize>,
}

impl BodyRecords {
    /// Cells of one column; `None` where a short row has no field.
    pub fn column(&self, idx: usize) -> Vec<Option<&str>> {
        self.rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str))
            .collect()
    }
}

/// Text after the first `n` non-blank lines, with the number of physical
/// lines consumed. Blank lines do not count toward `n`.
pub fn skip_lines(text: &str, n: usize) -> (&str, usize) {
    let mut rest = text;
    let mut skipped = 0;
    let mut consumed = 0;
    while skipped < n {
        let Some((line, tail)) = rest.split_once('\n') else {
            return ("", consumed + usize::from(!rest.is_empty()));
        };
        if !line.trim().is_empty() {
            skipped += 1;
        }
        consumed += 1;
        rest = tail;
    }
    (rest, consumed)
}

/// Splits the body into header row and records.
pub fn read_body_records(
    path: &Path,
    text: &str,
    body_offset: usize,
    columns: &ColumnTypes,
) -> Result<BodyRecords> {
    let table_error = |message: String| IngestError::TableType {
        path: path.to_path_buf(),
        dtypes: columns.to_string(),
        message,
    };

    let (body, consumed) = skip_lines(text, body_offset);
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let raw_headers = reader
        .headers()
        .map_err(|e| table_error(e.to_string()))?
        .clone();
    if raw_headers.is_empty() {
        return Err(table_error("no columns to parse from file".to_string()));
    }
    let headers = dedupe_headers(raw_headers.iter());

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(e.to_string()))?;
        let line = consumed + record.position().map_or(0, |p| p.line() as usize);
        if record.len() > headers.len() {
            return Err(table_error(format!(
                "expected {} fields in line {line}, saw {}",
                headers.len(),
                record.len()
            )));
        }
        rows.push(record.iter().map(str::to_string).collect());
        lines.push(line);
    }

    Ok(BodyRecords {
        headers,
        rows,
        lines,
    })
}

/// Reads the body into a DataFrame, typing each column from `columns`
/// and inferring the rest.
pub fn read_table(
    path: &Path,
    text: &str,
    body_offset: usize,
    columns: &ColumnTypes,
) -> Result<DataFrame> {
    let records = read_body_records(path, text, body_offset, columns)?;

    let mut built = Vec::with_capacity(records.headers.len());
    for (idx, name) in records.headers.iter().enumerate() {
        let cells = records.column(idx);
        let column_type = columns
            .get(name)
            .unwrap_or_else(|| infer_column_type(&cells));
        let series = build_column(name, &cells, column_type).map_err(|err| match err {
            ColumnError::Cell { row, value } => IngestError::TableType {
                path: path.to_path_buf(),
                dtypes: columns.to_string(),
                message: format!(
                    "could not convert '{value}' in column '{name}' (line {}) to {column_type}",
                    records.lines.get(row).copied().unwrap_or_default()
                ),
            },
            ColumnError::Polars(e) => IngestError::from(e),
        })?;
        built.push(series.into_column());
    }

    Ok(DataFrame::new(built)?)
}

fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}
