//! Stacking of per-experiment properties into one table.

use indexmap::IndexMap;
use polars::prelude::{
    DataFrame, DataType, IntoColumn, NamedFrom, PolarsResult, Series, TimeUnit,
};

use nanolab_model::{DATA_KEY_COLUMN, ExperimentProperties, PROCEDURE_TYPE_COLUMN, TypedValue};

/// Stacks properties as rows, one per experiment, in input order.
///
/// Columns are the union of all keys in first-seen order, followed by
/// `data_key` and `Procedure type`. A row without a column holds null
/// there. A column whose values mix kinds widens: int with float becomes
/// Float64, any other mix becomes String.
pub fn stack_properties(rows: &[ExperimentProperties]) -> PolarsResult<DataFrame> {
    let mut cells: IndexMap<&str, Vec<Option<TypedValue>>> = IndexMap::new();
    for (idx, props) in rows.iter().enumerate() {
        for (name, value) in props.row() {
            let column = cells.entry(name).or_insert_with(|| vec![None; rows.len()]);
            column[idx] = Some(value);
        }
    }
    for name in [DATA_KEY_COLUMN, PROCEDURE_TYPE_COLUMN] {
        cells.entry(name).or_default();
    }
    // Derived columns go last even if a header used the same name first.
    for name in [DATA_KEY_COLUMN, PROCEDURE_TYPE_COLUMN] {
        if let Some(values) = cells.shift_remove(name) {
            cells.insert(name, values);
        }
    }

    let columns = cells
        .into_iter()
        .map(|(name, values)| build_series(name, &values).map(Series::into_column))
        .collect::<PolarsResult<Vec<_>>>()?;
    DataFrame::new(columns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unified {
    Bool,
    Int,
    Float,
    Timestamp,
    Str,
    Mixed,
}

fn unify(values: &[Option<TypedValue>]) -> Unified {
    let mut unified: Option<Unified> = None;
    for value in values.iter().flatten() {
        let kind = match value {
            TypedValue::Bool(_) => Unified::Bool,
            TypedValue::Int(_) => Unified::Int,
            TypedValue::Float(_) => Unified::Float,
            TypedValue::Timestamp(_) => Unified::Timestamp,
            TypedValue::Str(_) => Unified::Str,
        };
        unified = Some(match (unified, kind) {
            (None, kind) => kind,
            (Some(a), b) if a == b => a,
            (Some(Unified::Int | Unified::Float), Unified::Int | Unified::Float) => Unified::Float,
            _ => Unified::Mixed,
        });
    }
    unified.unwrap_or(Unified::Str)
}

fn build_series(name: &str, values: &[Option<TypedValue>]) -> PolarsResult<Series> {
    let series = match unify(values) {
        Unified::Bool => {
            let data: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    Some(TypedValue::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data)
        }
        Unified::Int => {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Some(TypedValue::Int(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data)
        }
        Unified::Float => {
            let data: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_ref().and_then(TypedValue::as_f64))
                .collect();
            Series::new(name.into(), data)
        }
        Unified::Timestamp => {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Some(TypedValue::Timestamp(ts)) => Some(ts.timestamp_micros()),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
        Unified::Str | Unified::Mixed => {
            let data: Vec<Option<String>> = values
                .iter()
                .map(|v| v.as_ref().map(ToString::to_string))
                .collect();
            Series::new(name.into(), data)
        }
    };
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(key: &str, values: &[(&str, TypedValue)]) -> ExperimentProperties {
        let mut props = ExperimentProperties::new(key, "ITt");
        for (name, value) in values {
            props.insert(*name, value.clone());
        }
        props
    }

    #[test]
    fn test_union_of_columns_with_nulls() {
        let rows = vec![
            props("d/a", &[("VDS", TypedValue::Float(0.1))]),
            props("d/b", &[("Chip number", TypedValue::Int(7))]),
        ];
        let df = stack_properties(&rows).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["VDS", "Chip number", DATA_KEY_COLUMN, PROCEDURE_TYPE_COLUMN]
        );
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("VDS").unwrap().null_count(), 1);
        assert_eq!(df.column("Chip number").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_int_and_float_widen() {
        let rows = vec![
            props("d/a", &[("T", TypedValue::Int(3))]),
            props("d/b", &[("T", TypedValue::Float(3.5))]),
        ];
        let df = stack_properties(&rows).unwrap();
        assert_eq!(df.column("T").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_other_mixes_render_as_string() {
        let rows = vec![
            props("d/a", &[("X", TypedValue::Bool(true))]),
            props("d/b", &[("X", TypedValue::Int(2))]),
        ];
        let df = stack_properties(&rows).unwrap();
        let column = df.column("X").unwrap().str().unwrap();
        assert_eq!(column.get(0), Some("True"));
        assert_eq!(column.get(1), Some("2"));
    }

    #[test]
    fn test_empty_input_keeps_derived_columns() {
        let df = stack_properties(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(
            df.get_column_names_str(),
            vec![DATA_KEY_COLUMN, PROCEDURE_TYPE_COLUMN]
        );
    }
}
