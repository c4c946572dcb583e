use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use nanolab_core::ProjectReport;

use crate::types::ProcessResult;

pub fn print_summary(result: &ProcessResult) {
    println!("Projects: {}", result.projects_root.display());
    println!("Output: {}", result.output_dir.display());
    println!("Procedures: {}", result.procedures.display());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Project"),
        header_cell("Experiments"),
        header_cell("Parsed"),
        header_cell("Skipped"),
        header_cell("Properties"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Center);

    let mut total_experiments = 0usize;
    let mut total_parsed = 0usize;
    let mut total_skipped = 0usize;
    for project in &result.report.projects {
        total_experiments += project.experiments;
        total_parsed += project.succeeded;
        total_skipped += project.skipped.len();
        table.add_row(vec![
            Cell::new(&project.project)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(project.experiments),
            Cell::new(project.succeeded),
            count_cell(project.skipped.len(), Color::Yellow),
            properties_cell(project),
            status_cell(project),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_experiments).add_attribute(Attribute::Bold),
        Cell::new(total_parsed).add_attribute(Attribute::Bold),
        count_cell(total_skipped, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_skipped_table(result);

    let errors: Vec<String> = result
        .report
        .failed_projects()
        .filter_map(|p| p.error.as_ref().map(|e| format!("{}: {e}", p.project)))
        .collect();
    if !errors.is_empty() {
        eprintln!("Errors:");
        for error in &errors {
            eprintln!("- {error}");
        }
    }
}

fn print_skipped_table(result: &ProcessResult) {
    if result.report.skipped_experiments() == 0 {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Project"),
        header_cell("Experiment"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    for project in &result.report.projects {
        for skipped in &project.skipped {
            table.add_row(vec![
                dim_cell(&project.project),
                Cell::new(&skipped.key),
                Cell::new(&skipped.reason).fg(Color::Yellow),
            ]);
        }
    }
    println!();
    println!("Skipped experiments:");
    println!("{table}");
}

fn properties_cell(project: &ProjectReport) -> Cell {
    if project.is_success() {
        Cell::new(project.locations.properties.display())
    } else {
        dim_cell("-")
    }
}

fn status_cell(project: &ProjectReport) -> Cell {
    if !project.is_success() {
        Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    } else if project.skipped.is_empty() {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("PARTIAL").fg(Color::Yellow)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
