//! Project-level batch processing.
//!
//! A [`BatchHook`] walks every project a [`ProjectCatalog`] knows about,
//! separates its experiments and hands the result to an [`OutputSink`].
//! Output locations for all projects are registered before the first
//! project is processed.
//!
//! The hook is either `Idle` or `Processing`. Starting a batch while one
//! is running fails with [`BatchError::AlreadyProcessing`]; the state
//! returns to `Idle` when the batch ends, whichever way it ends.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{error, info, info_span};

use crate::error::{BatchError, Result};
use crate::separate::{SeparatedDataset, SkippedExperiment, separate};
use crate::source::ExperimentSource;

/// Prefix that marks a catalog entry as a project.
pub const PROJECT_PREFIX: &str = "project_";

/// Experiments of one project keyed by their partition name.
pub type ExperimentMap = IndexMap<String, Box<dyn ExperimentSource>>;

/// Source of projects and their experiments.
pub trait ProjectCatalog {
    /// Project names, in processing order.
    fn projects(&self) -> Result<Vec<String>>;

    fn load(&self, project: &str) -> Result<ExperimentMap>;
}

/// Destination of separated datasets.
pub trait OutputSink {
    /// Declares where a project's outputs go. Called for every project
    /// before any project is processed.
    fn register(&self, project: &str) -> Result<OutputLocations>;

    fn save(
        &self,
        project: &str,
        locations: &OutputLocations,
        dataset: &mut SeparatedDataset,
    ) -> Result<()>;
}

/// Where the outputs of one project are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocations {
    /// Stacked properties, one CSV file.
    pub properties: PathBuf,
    /// One CSV per experiment, named by its key.
    pub data_dir: PathBuf,
}

impl OutputLocations {
    /// `properties_<project>.csv` and `data_<project>/` under `root`.
    pub fn for_project(root: &Path, project: &str) -> Self {
        Self {
            properties: root.join(format!("properties_{project}.csv")),
            data_dir: root.join(format!("data_{project}")),
        }
    }
}

/// State of a [`BatchHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Processing,
}

/// Outcome of one project.
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub project: String,
    pub locations: OutputLocations,
    pub experiments: usize,
    pub succeeded: usize,
    pub skipped: Vec<SkippedExperiment>,
    /// Set when the project could not be loaded or saved.
    pub error: Option<String>,
}

impl ProjectReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub projects: Vec<ProjectReport>,
}

impl BatchReport {
    pub fn failed_projects(&self) -> impl Iterator<Item = &ProjectReport> {
        self.projects.iter().filter(|p| !p.is_success())
    }

    pub fn skipped_experiments(&self) -> usize {
        self.projects.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_projects().next().is_some()
    }
}

/// Runs batches over a catalog, rejecting re-entry while one is running.
#[derive(Debug, Default)]
pub struct BatchHook {
    state: Cell<BatchState>,
}

/// Holds a hook in `Processing`; resets it to `Idle` on drop.
#[derive(Debug)]
pub struct BatchGuard<'a> {
    hook: &'a BatchHook,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.hook.state.set(BatchState::Idle);
    }
}

impl BatchHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatchState {
        self.state.get()
    }

    /// Moves to `Processing`, or fails if a batch is already running.
    pub fn begin(&self) -> Result<BatchGuard<'_>> {
        match self.state.get() {
            BatchState::Processing => Err(BatchError::AlreadyProcessing),
            BatchState::Idle => {
                self.state.set(BatchState::Processing);
                Ok(BatchGuard { hook: self })
            }
        }
    }

    /// Processes every project of `catalog` into `sink`.
    ///
    /// A project that fails to load or save is logged and reported; the
    /// remaining projects still run. Failing to list projects or to
    /// register outputs aborts the batch.
    pub fn run(&self, catalog: &dyn ProjectCatalog, sink: &dyn OutputSink) -> Result<BatchReport> {
        let _guard = self.begin()?;

        let projects = catalog.projects()?;
        info!(count = projects.len(), "starting batch");

        let mut registered = Vec::with_capacity(projects.len());
        for project in projects {
            let locations = sink.register(&project)?;
            registered.push((project, locations));
        }

        let mut report = BatchReport::default();
        for (project, locations) in registered {
            let span = info_span!("project", project = %project);
            let _enter = span.enter();
            let project_report = match process_project(catalog, sink, &project, &locations) {
                Ok(dataset) => {
                    info!(
                        succeeded = dataset.succeeded(),
                        skipped = dataset.skipped.len(),
                        "project processed"
                    );
                    ProjectReport {
                        project,
                        locations,
                        experiments: dataset.total(),
                        succeeded: dataset.succeeded(),
                        skipped: dataset.skipped,
                        error: None,
                    }
                }
                Err(err) => {
                    error!(error = %err, "project failed");
                    ProjectReport {
                        project,
                        locations,
                        experiments: 0,
                        succeeded: 0,
                        skipped: Vec::new(),
                        error: Some(err.to_string()),
                    }
                }
            };
            report.projects.push(project_report);
        }
        Ok(report)
    }
}

fn process_project(
    catalog: &dyn ProjectCatalog,
    sink: &dyn OutputSink,
    project: &str,
    locations: &OutputLocations,
) -> Result<SeparatedDataset> {
    let experiments = catalog.load(project)?;
    let mut dataset = separate(&experiments)?;
    sink.save(project, locations, &mut dataset)?;
    Ok(dataset)
}
