use chrono::{DateTime, Utc};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use stgen_model::SignalKind;
use stgen_templates::{CacheStatistics, ValidationResult};

use crate::types::GenerateResult;

pub fn print_summary(result: &GenerateResult) {
    eprintln!("Points: {}", result.points_file.display());
    eprintln!("Templates: {}", result.templates);
    match &result.output {
        Some(path) => eprintln!("Output: {}", path.display()),
        None => eprintln!("Output: <stdout>"),
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("Description"),
        header_cell("Generated"),
        header_cell("Failed"),
        header_cell("Skipped"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut totals = (0usize, 0usize, 0usize);
    for (tag, counts) in result.batch.by_type() {
        totals.0 += counts.generated;
        totals.1 += counts.failed;
        totals.2 += counts.skipped;
        let description = SignalKind::from_tag(&tag).map_or("-", |kind| kind.description());
        table.add_row(vec![
            type_cell(&tag),
            description_cell(description),
            Cell::new(counts.generated),
            count_cell(counts.failed, Color::Red),
            count_cell(counts.skipped, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{:.2?}", result.elapsed))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals.0).add_attribute(Attribute::Bold),
        count_cell(totals.1, Color::Red).add_attribute(Attribute::Bold),
        count_cell(totals.2, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    eprintln!("{table}");
    print_error_table(result);
    if let Some(statistics) = &result.statistics {
        print_statistics(statistics);
    }
    if result.batch.was_cancelled() {
        eprintln!("Generation was cancelled before all points were processed.");
    }
}

fn print_error_table(result: &GenerateResult) {
    let errors: Vec<_> = result.batch.errors().collect();
    if errors.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Row"),
        header_cell("Type"),
        header_cell("Variable"),
        header_cell("Kind"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (record, error) in errors {
        table.add_row(vec![
            Cell::new(record.index + 1),
            type_cell(&record.signal_type),
            Cell::new(&record.variable),
            Cell::new(error.kind()).fg(Color::Red),
            Cell::new(error.to_string()),
        ]);
    }
    eprintln!("{table}");
}

pub fn print_statistics(statistics: &CacheStatistics) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Cache"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let by_type: Vec<String> = statistics
        .entries_by_type
        .iter()
        .map(|(tag, count)| format!("{tag}={count}"))
        .collect();
    let rows: Vec<(&str, String)> = vec![
        ("Entries", statistics.total_entries.to_string()),
        ("Entries by type", by_type.join(", ")),
        ("Requests", statistics.total_requests.to_string()),
        ("Hits", statistics.hits.to_string()),
        ("Misses", statistics.misses.to_string()),
        ("Hit ratio", format!("{:.1}%", statistics.hit_ratio * 100.0)),
        ("Memory estimate", format!("{} B", statistics.memory_estimate_bytes)),
        (
            "Average render",
            format!(
                "{:.1} us ({} samples)",
                statistics.average_render_micros, statistics.render_samples
            ),
        ),
        ("Evictions", statistics.evictions.to_string()),
        ("Eviction policy", statistics.eviction_policy.clone()),
        ("Compilations", statistics.lifetime_compilations.to_string()),
        ("Cache age", format_age(statistics.created_at)),
        (
            "Last cleanup",
            statistics
                .last_cleanup
                .map_or_else(|| "never".to_string(), |at| at.to_rfc3339()),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("{table}");
}

fn format_age(since: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(since);
    format!("{:.3} s", age.num_milliseconds() as f64 / 1000.0)
}

pub fn print_validation(result: &ValidationResult, type_tag: &str) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Line"),
        header_cell("Column"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let issues = result
        .errors
        .iter()
        .map(|issue| ("error", Color::Red, issue))
        .chain(result.warnings.iter().map(|issue| ("warning", Color::Yellow, issue)));
    for (severity, color, issue) in issues {
        table.add_row(vec![
            Cell::new(severity).fg(color).add_attribute(Attribute::Bold),
            optional_cell(issue.location.line),
            optional_cell(issue.location.column),
            Cell::new(&issue.message),
        ]);
    }
    if table.row_count() > 0 {
        println!("{table}");
    }
    let variables: Vec<&str> = result.required_fields.iter().map(String::as_str).collect();
    println!("Type: {type_tag}");
    println!("Variables: {}", if variables.is_empty() { "-".to_string() } else { variables.join(", ") });
    println!("Complexity: {}", result.complexity_score);
    println!(
        "Result: {} error(s), {} warning(s)",
        result.errors.len(),
        result.warnings.len()
    );
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
        .set_width(120);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
            ColumnConstraint::LowerBoundary(Width::Fixed(9)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::LowerBoundary(Width::Fixed(7)),
        ]);
    }
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn type_cell(tag: &str) -> Cell {
    if SignalKind::from_tag(tag).is_some() {
        Cell::new(tag)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(tag).fg(Color::DarkGrey)
    }
}

fn description_cell(description: &str) -> Cell {
    if description == "-" {
        dim_cell(description)
    } else {
        Cell::new(description)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn optional_cell(value: Option<usize>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
