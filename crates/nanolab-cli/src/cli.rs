//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "nanolab",
    version,
    about = "Separate lab-instrument CSV exports into properties and data tables",
    long_about = "Parse instrument CSV exports whose comment header names a procedure,\n\
                  validate the header against the procedure registry, and write one\n\
                  properties table plus one data table per experiment for each project."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every project under a data root and write outputs.
    Process(ProcessArgs),

    /// List the procedures of the registry.
    Procedures(RegistryArgs),

    /// Parse a single experiment file and print what was read.
    Inspect(InspectArgs),
}

/// Where the procedure registry comes from and how headers are checked.
#[derive(Args, Clone)]
pub struct RegistryArgs {
    /// Parameters file (JSON or TOML) holding the `procedures` table.
    ///
    /// Falls back to NANOLAB_PROCEDURES, then conf/base/parameters.json
    /// under the data root.
    #[arg(long = "procedures", value_name = "FILE")]
    pub procedures: Option<PathBuf>,

    /// Require every schema key in each header; ignore unknown header keys.
    #[arg(long = "strict-schema")]
    pub strict_schema: bool,
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// Data root. Projects are read from <ROOT>/01_raw when it exists.
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Output directory (default: <ROOT>/03_primary).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Exit with an error when any experiment was skipped.
    #[arg(long = "fail-on-skip")]
    pub fail_on_skip: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Experiment export to parse.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of table rows to print.
    #[arg(long = "rows", default_value_t = 5)]
    pub rows: usize,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
