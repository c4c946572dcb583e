use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::DataType;
use tempfile::TempDir;

use nanolab_ingest::{
    ExperimentParser, IngestError, extract_procedure_id, parse_experiment, read_header_lines,
};
use nanolab_model::{ColumnType, ParseOptions, ProcedureSchema, TypedValue};
use nanolab_standards::{SchemaRegistry, StandardsError};

const ITT_EXPORT: &str = "\
#Procedure: <laser_setup.procedures.ITt>
#Parameters:
#\tVDS: 0.1 V
#\tLaser wavelength: 455.0 nm
#\tLaser toggle: True
#Metadata:
#\tStart time: 1731364225.4285064
#\tChip number: 7
#Data:
t (s),VDS (V),I (A)
0.0,0.1,1.5e-6
0.5,0.1,1.6e-6
1.0,0.1,1.7e-6
";

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_schemas([
        ProcedureSchema::new("ITt")
            .with_parameter("VDS", "float")
            .with_parameter("Laser wavelength", "float")
            .with_parameter("Laser toggle", "bool")
            .with_metadata("Start time", "datetime")
            .with_metadata("Chip number", "int")
            .with_column("t (s)", ColumnType::Float64)
            .with_column("VDS (V)", ColumnType::Float64)
            .with_column("I (A)", ColumnType::Float64),
        ProcedureSchema::new("IV").with_parameter("VDS", "float"),
    ])
}

fn write_export(dir: &TempDir, folder: &str, name: &str, contents: &str) -> PathBuf {
    let folder = dir.path().join(folder);
    fs::create_dir_all(&folder).expect("create folder");
    let path = folder.join(name);
    fs::write(&path, contents).expect("write export");
    path
}

#[test]
fn parses_full_export() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_export(&dir, "2024-11-29", "ITt2024-11-29_1.csv", ITT_EXPORT);

    let registry = registry();
    let result = ExperimentParser::new(&registry).parse(&path).expect("parse");

    let props = &result.properties;
    assert_eq!(props.data_key, "2024-11-29/ITt2024-11-29_1");
    assert_eq!(props.procedure_type, "ITt");
    assert_eq!(props.get("VDS"), Some(&TypedValue::Float(0.1)));
    assert_eq!(props.get("Laser wavelength"), Some(&TypedValue::Float(455.0)));
    assert_eq!(props.get("Laser toggle"), Some(&TypedValue::Bool(true)));
    assert_eq!(props.get("Chip number"), Some(&TypedValue::Int(7)));
    match props.get("Start time") {
        Some(TypedValue::Timestamp(ts)) => assert_eq!(ts.timestamp(), 1_731_364_225),
        other => panic!("expected timestamp, got {other:?}"),
    }

    let table = &result.table;
    assert_eq!(table.height(), 3);
    assert_eq!(
        table.get_column_names_str(),
        vec!["t (s)", "VDS (V)", "I (A)"]
    );
    assert_eq!(table.column("I (A)").expect("I column").dtype(), &DataType::Float64);
}

#[test]
fn header_offset_matches_comment_lines() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_export(&dir, "day", "run.csv", ITT_EXPORT);
    let header = read_header_lines(&path).expect("header");
    assert_eq!(header.body_offset, 9);
    assert_eq!(header.len(), 5);
    assert_eq!(extract_procedure_id(&path).expect("procedure"), "ITt");
}

#[test]
fn unknown_header_key_fails_in_default_mode() {
    let dir = TempDir::new().expect("temp dir");
    let contents = ITT_EXPORT.replace("#\tChip number: 7\n", "#\tChip number: 7\n#\tOperator: ana\n");
    let path = write_export(&dir, "day", "run.csv", &contents);

    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "key 'Operator' is missing in the configuration of procedure 'ITt'"
    );
}

#[test]
fn exhaustive_mode_ignores_extra_keys_and_requires_schema_keys() {
    let dir = TempDir::new().expect("temp dir");
    let contents = ITT_EXPORT.replace("#\tChip number: 7\n", "#\tChip number: 7\n#\tOperator: ana\n");
    let path = write_export(&dir, "day", "run.csv", &contents);
    let result = parse_experiment(&path, &registry(), ParseOptions::exhaustive()).expect("parse");
    assert!(result.properties.get("Operator").is_none());
    assert_eq!(result.properties.len(), 5);

    let trimmed = ITT_EXPORT.replace("#\tChip number: 7\n", "");
    let path = write_export(&dir, "day", "short.csv", &trimmed);
    let err = parse_experiment(&path, &registry(), ParseOptions::exhaustive()).unwrap_err();
    assert!(matches!(err, IngestError::MissingKey { ref key, .. } if key == "Chip number"));
}

#[test]
fn bad_body_cell_reports_dtype_mapping() {
    let dir = TempDir::new().expect("temp dir");
    let contents = ITT_EXPORT.replace("0.5,0.1,1.6e-6", "abc,0.1,1.6e-6");
    let path = write_export(&dir, "day", "run.csv", &contents);

    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    match &err {
        IngestError::TableType { path: err_path, dtypes, .. } => {
            assert_eq!(err_path, &path);
            assert!(dtypes.contains("'t (s)': 'float64'"), "{dtypes}");
        }
        other => panic!("expected table type error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("error in reading"));
}

#[test]
fn unknown_procedure_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let contents = ITT_EXPORT.replace("procedures.ITt>", "procedures.IVg>");
    let path = write_export(&dir, "day", "run.csv", &contents);

    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Standards(StandardsError::UnknownProcedure { ref procedure }) if procedure == "IVg"
    ));
}

#[test]
fn missing_marker_resolves_to_empty_procedure() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_export(&dir, "day", "plain.csv", "#\tVDS: 1 V\nV,I\n1,2\n");

    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "procedure '' not found in procedures");
}

#[test]
fn non_csv_and_missing_files_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_export(&dir, "day", "run.txt", ITT_EXPORT);
    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::InvalidFormat { .. }));

    let missing = dir.path().join("day").join("absent.csv");
    let err = parse_experiment(&missing, &registry(), ParseOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { .. }));
}

#[test]
fn value_that_does_not_parse_names_key() {
    let dir = TempDir::new().expect("temp dir");
    let contents = ITT_EXPORT.replace("#\tChip number: 7", "#\tChip number: seven");
    let path = write_export(&dir, "day", "run.csv", &contents);

    let err = parse_experiment(&path, &registry(), ParseOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "invalid int value 'seven' for key 'Chip number'");
}

#[test]
fn top_level_file_has_no_data_key() {
    let err = nanolab_ingest::extract_data_key(Path::new("run.csv")).unwrap_err();
    assert!(matches!(err, IngestError::InvalidPath { .. }));
}

#[test]
fn blank_line_in_comment_block_keeps_column_row() {
    let dir = TempDir::new().expect("temp dir");
    let export = ITT_EXPORT.replacen("#Parameters:\n", "#Parameters:\n\n", 1);
    let path = write_export(&dir, "day", "run.csv", &export);

    let registry = registry();
    let result = parse_experiment(&path, &registry, ParseOptions::default()).expect("parse");
    assert_eq!(
        result.table.get_column_names_str(),
        vec!["t (s)", "VDS (V)", "I (A)"]
    );
    assert_eq!(result.table.height(), 3);
}

#[test]
fn na_cells_are_missing_values() {
    let dir = TempDir::new().expect("temp dir");
    let export = ITT_EXPORT.replace("0.5,0.1,1.6e-6", "0.5,NA,N/A");
    let path = write_export(&dir, "day", "run.csv", &export);

    let registry = registry();
    let result = parse_experiment(&path, &registry, ParseOptions::default()).expect("parse");
    assert_eq!(result.table.height(), 3);
    assert_eq!(result.table.column("I (A)").expect("I column").null_count(), 1);
}
