//! On-disk project catalog and CSV output sink.
//!
//! A data root holds one directory per project (`project_*`), each a
//! partitioned set of experiment exports. Outputs go to one properties
//! CSV and one directory of data CSVs per project.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::{debug, info};

use nanolab_core::{
    BatchError, ExperimentMap, FileExperiment, OutputLocations, OutputSink, PROJECT_PREFIX,
    ProjectCatalog, SeparatedDataset,
};
use nanolab_model::ParseOptions;
use nanolab_standards::{FileParameterStore, SchemaRegistry};

/// Environment variable naming the parameters file.
pub const PROCEDURES_ENV: &str = "NANOLAB_PROCEDURES";
/// Parameters file relative to the data root.
pub const DEFAULT_PARAMETERS: &str = "conf/base/parameters.json";
/// Raw input layer under the data root.
pub const RAW_DIR: &str = "01_raw";
/// Output layer under the data root.
pub const PRIMARY_DIR: &str = "03_primary";

const EXPORT_EXTENSION: &str = "csv";

/// Picks the parameters file: explicit flag, then `env_value`, then the
/// default file under `root`.
pub fn resolve_procedures_path(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    root: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => root.join(DEFAULT_PARAMETERS),
    }
}

/// [`resolve_procedures_path`] reading [`PROCEDURES_ENV`].
pub fn procedures_path(explicit: Option<&Path>, root: &Path) -> PathBuf {
    resolve_procedures_path(explicit, std::env::var_os(PROCEDURES_ENV), root)
}

/// Loads the procedure registry from a JSON or TOML parameters file.
pub fn load_registry(path: &Path) -> Result<SchemaRegistry> {
    let store = FileParameterStore::new(path);
    SchemaRegistry::load(&store)
        .with_context(|| format!("load procedure registry from {}", path.display()))
}

/// Directory holding the projects: `<root>/01_raw` if present, else `root`.
pub fn projects_root(root: &Path) -> PathBuf {
    let raw = root.join(RAW_DIR);
    if raw.is_dir() { raw } else { root.to_path_buf() }
}

/// Projects as directories named `project_*` under a root.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    registry: Arc<SchemaRegistry>,
    options: ParseOptions,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            root: root.into(),
            registry,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ProjectCatalog for DirectoryCatalog {
    fn projects(&self) -> nanolab_core::Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| BatchError::io(&self.root, e))?;
        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BatchError::io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(PROJECT_PREFIX) {
                projects.push(name);
            }
        }
        projects.sort();
        debug!(root = %self.root.display(), count = projects.len(), "discovered projects");
        Ok(projects)
    }

    fn load(&self, project: &str) -> nanolab_core::Result<ExperimentMap> {
        let dir = self.root.join(project);
        let files = list_export_files(&dir)?;
        let mut experiments = ExperimentMap::new();
        for path in files {
            let key = partition_key(&dir, &path).ok_or_else(|| BatchError::Catalog {
                project: project.to_string(),
                message: format!("cannot derive a partition key for {}", path.display()),
            })?;
            let source =
                FileExperiment::new(path, Arc::clone(&self.registry)).with_options(self.options);
            experiments.insert(key, Box::new(source));
        }
        info!(project, experiments = experiments.len(), "loaded project");
        Ok(experiments)
    }
}

/// Lists `.csv` files under `dir`, recursively, sorted by path.
pub fn list_export_files(dir: &Path) -> nanolab_core::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| BatchError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| BatchError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let is_export = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION));
            if is_export {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Path of `path` relative to `dir` without its extension, joined with `/`.
pub fn partition_key(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Writes outputs as CSV under one directory.
#[derive(Debug, Clone)]
pub struct CsvOutputSink {
    root: PathBuf,
}

impl CsvOutputSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for CsvOutputSink {
    fn register(&self, project: &str) -> nanolab_core::Result<OutputLocations> {
        let locations = OutputLocations::for_project(&self.root, project);
        debug!(
            project,
            properties = %locations.properties.display(),
            data = %locations.data_dir.display(),
            "registered outputs"
        );
        Ok(locations)
    }

    fn save(
        &self,
        project: &str,
        locations: &OutputLocations,
        dataset: &mut SeparatedDataset,
    ) -> nanolab_core::Result<()> {
        write_csv(&locations.properties, &mut dataset.properties)?;
        for (key, table) in dataset.tables.iter_mut() {
            let path = locations.data_dir.join(format!("{key}.{EXPORT_EXTENSION}"));
            write_csv(&path, table)?;
        }
        info!(
            project,
            tables = dataset.tables.len(),
            properties = %locations.properties.display(),
            "saved project outputs"
        );
        Ok(())
    }
}

/// Writes a DataFrame with a header row, creating parent directories.
pub fn write_csv(path: &Path, df: &mut DataFrame) -> nanolab_core::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BatchError::io(parent, e))?;
    }
    let mut file = File::create(path).map_err(|e| BatchError::io(path, e))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
