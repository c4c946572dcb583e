use std::path::PathBuf;

use nanolab_core::BatchReport;

#[derive(Debug)]
pub struct ProcessResult {
    pub projects_root: PathBuf,
    pub output_dir: PathBuf,
    pub procedures: PathBuf,
    pub report: BatchReport,
    pub has_errors: bool,
}
