//! Integration tests for the on-disk catalog and CSV sink.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use nanolab_cli::pipeline::{
    CsvOutputSink, DEFAULT_PARAMETERS, DirectoryCatalog, list_export_files, load_registry,
    projects_root, resolve_procedures_path,
};
use nanolab_core::{BatchHook, ProjectCatalog};

const PARAMETERS: &str = r#"{
  "procedures": {
    "IV": {
      "Parameters": {"VDS": "float", "Chip number": "int"},
      "Metadata": {"Start time": "datetime"},
      "Data": {"V": "float64", "I": "float64"}
    },
    "ITt": {
      "Parameters": {"Laser toggle": "bool"},
      "Metadata": null,
      "Data": "float64"
    }
  }
}"#;

const IV_EXPORT: &str = "\
#Procedure: <laser_setup.procedures.IV>
#Parameters:
#\tVDS: 0.1 V
#\tChip number: 3
#Metadata:
#\tStart time: 1731364225.5
#Data:
V,I
0.0,1e-6
0.1,2e-6
";

const ITT_EXPORT: &str = "\
#Procedure: <laser_setup.procedures.ITt>
#Parameters:
#\tLaser toggle: True
#Data:
t,I
0.0,1e-6
";

fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(&path, contents).expect("write file");
    path
}

fn data_root() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write(root, DEFAULT_PARAMETERS, PARAMETERS);
    write(root, "01_raw/project_a/2024-11-29/IV_1.csv", IV_EXPORT);
    write(root, "01_raw/project_a/2024-11-29/ITt_1.csv", ITT_EXPORT);
    write(root, "01_raw/project_a/2024-11-30/IV_2.csv", &IV_EXPORT.replace("VDS: 0.1 V", "VDS: ? V"));
    write(root, "01_raw/project_b/day/IV_1.csv", IV_EXPORT);
    write(root, "01_raw/project_b/notes.txt", "not an export");
    write(root, "01_raw/scratch/IV_1.csv", IV_EXPORT);
    dir
}

#[test]
fn discovers_projects_and_partitions() {
    let dir = data_root();
    let registry = load_registry(&dir.path().join(DEFAULT_PARAMETERS)).expect("registry");
    let raw = projects_root(dir.path());
    assert_eq!(raw, dir.path().join("01_raw"));

    let catalog = DirectoryCatalog::new(&raw, Arc::new(registry));
    assert_eq!(
        catalog.projects().expect("projects"),
        vec!["project_a".to_string(), "project_b".to_string()]
    );

    let experiments = catalog.load("project_a").expect("load");
    let keys: Vec<&str> = experiments.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["2024-11-29/ITt_1", "2024-11-29/IV_1", "2024-11-30/IV_2"]
    );

    let files = list_export_files(&raw.join("project_b")).expect("files");
    assert_eq!(files.len(), 1);
}

#[test]
fn batch_writes_properties_and_tables() {
    let dir = data_root();
    let registry = load_registry(&dir.path().join(DEFAULT_PARAMETERS)).expect("registry");
    let catalog = DirectoryCatalog::new(projects_root(dir.path()), Arc::new(registry));
    let output = dir.path().join("03_primary");
    let sink = CsvOutputSink::new(&output);

    let report = BatchHook::new().run(&catalog, &sink).expect("batch");
    assert!(!report.has_failures());
    assert_eq!(report.skipped_experiments(), 1);

    let project_a = &report.projects[0];
    assert_eq!(project_a.project, "project_a");
    assert_eq!(project_a.experiments, 3);
    assert_eq!(project_a.succeeded, 2);
    assert_eq!(project_a.skipped[0].key, "2024-11-30/IV_2");

    let properties =
        fs::read_to_string(output.join("properties_project_a.csv")).expect("properties csv");
    let mut lines = properties.lines();
    let header = lines.next().expect("header row");
    assert!(header.contains("data_key"), "{header}");
    assert!(header.contains("Procedure type"), "{header}");
    assert!(header.contains("Laser toggle"), "{header}");
    assert_eq!(lines.count(), 2);

    assert!(output.join("data_project_a/2024-11-29/IV_1.csv").is_file());
    assert!(output.join("data_project_a/2024-11-29/ITt_1.csv").is_file());
    assert!(!output.join("data_project_a/2024-11-30/IV_2.csv").exists());
    assert!(output.join("data_project_b/day/IV_1.csv").is_file());

    let table = fs::read_to_string(output.join("data_project_a/2024-11-29/IV_1.csv"))
        .expect("data csv");
    assert_eq!(table.lines().next(), Some("V,I"));
    assert_eq!(table.lines().count(), 3);
}

#[test]
fn missing_parameters_file_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let path = resolve_procedures_path(None, None, dir.path());
    let err = load_registry(&path).unwrap_err();
    assert!(format!("{err:#}").contains("load procedure registry"));
}
