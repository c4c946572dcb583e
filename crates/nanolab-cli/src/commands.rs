use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use comfy_table::{CellAlignment, Table};
use tracing::{info, info_span};

use nanolab_cli::pipeline::{
    CsvOutputSink, DirectoryCatalog, PRIMARY_DIR, load_registry, procedures_path, projects_root,
};
use nanolab_core::BatchHook;
use nanolab_ingest::ExperimentParser;
use nanolab_model::{ColumnTypes, ParseOptions, ValidationMode};
use nanolab_standards::SchemaRegistry;

use crate::cli::{InspectArgs, ProcessArgs, RegistryArgs};
use crate::summary::{align_column, apply_table_style, dim_cell, header_cell};
use crate::types::ProcessResult;

pub fn run_process(args: &ProcessArgs) -> Result<ProcessResult> {
    let root = &args.root;
    let span = info_span!("process", root = %root.display());
    let _guard = span.enter();
    let start = Instant::now();

    let procedures = procedures_path(args.registry.procedures.as_deref(), root);
    let registry = Arc::new(load_registry(&procedures)?);
    let options = parse_options(&args.registry);

    let projects_root = projects_root(root);
    if !projects_root.is_dir() {
        bail!("data root {} is not a directory", projects_root.display());
    }
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| root.join(PRIMARY_DIR));

    let catalog = DirectoryCatalog::new(&projects_root, registry).with_options(options);
    let sink = CsvOutputSink::new(&output_dir);
    let report = BatchHook::new()
        .run(&catalog, &sink)
        .context("process projects")?;

    let has_errors =
        report.has_failures() || (args.fail_on_skip && report.skipped_experiments() > 0);
    info!(
        projects = report.projects.len(),
        skipped = report.skipped_experiments(),
        validation = options.validation.as_str(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch finished"
    );
    Ok(ProcessResult {
        projects_root,
        output_dir,
        procedures,
        report,
        has_errors,
    })
}

pub fn run_procedures(args: &RegistryArgs) -> Result<()> {
    let registry = registry_from_cwd(args)?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Procedure"),
        header_cell("Parameters"),
        header_cell("Metadata"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for schema in registry.iter() {
        let columns = match &schema.columns {
            ColumnTypes::Uniform(column_type) => format!("all {column_type}"),
            ColumnTypes::PerColumn(map) if map.is_empty() => "inferred".to_string(),
            ColumnTypes::PerColumn(map) => map.len().to_string(),
        };
        table.add_row(vec![
            header_cell(&schema.name),
            comfy_table::Cell::new(schema.parameters.len()),
            comfy_table::Cell::new(schema.metadata.len()),
            dim_cell(columns),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let registry = registry_from_cwd(&args.registry)?;
    let options = parse_options(&args.registry);
    let result = ExperimentParser::new(&registry)
        .with_options(options)
        .parse(&args.file)
        .with_context(|| format!("parse {}", args.file.display()))?;

    let properties = &result.properties;
    println!("Experiment: {}", properties.data_key);
    println!("Procedure: {}", properties.procedure_type);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Type"),
        header_cell("Value"),
    ]);
    apply_table_style(&mut table);
    for (key, value) in &properties.values {
        table.add_row(vec![
            comfy_table::Cell::new(key),
            dim_cell(value.kind()),
            comfy_table::Cell::new(value),
        ]);
    }
    println!("{table}");

    let (rows, columns) = result.table.shape();
    println!("Data: {rows} rows x {columns} columns");
    println!("{}", result.table.head(Some(args.rows)));
    Ok(())
}

fn parse_options(args: &RegistryArgs) -> ParseOptions {
    let validation = if args.strict_schema {
        ValidationMode::Exhaustive
    } else {
        ValidationMode::KnownKeys
    };
    ParseOptions::new().with_validation(validation)
}

fn registry_from_cwd(args: &RegistryArgs) -> Result<SchemaRegistry> {
    let path = procedures_path(args.procedures.as_deref(), Path::new("."));
    load_registry(&path)
}
