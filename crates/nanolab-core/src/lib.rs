//! Dataset separation and project batch processing.
//!
//! [`separate`] folds many experiment producers into one properties table
//! and a keyed map of data tables, skipping producers that fail.
//! [`BatchHook`] applies it to every project of a catalog.

pub mod error;
pub mod hook;
pub mod separate;
pub mod source;
pub mod stack;

pub use error::{BatchError, Result};
pub use hook::{
    BatchGuard, BatchHook, BatchReport, BatchState, ExperimentMap, OutputLocations, OutputSink,
    PROJECT_PREFIX, ProjectCatalog, ProjectReport,
};
pub use separate::{SeparatedDataset, SkippedExperiment, separate};
pub use source::{ExperimentSource, FileExperiment, FnExperiment, InMemoryExperiment};
pub use stack::stack_properties;
