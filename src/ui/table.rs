use tabled::{Table, Tabled, settings::Style};

use crate::lms::{DbStats, LoadReport};

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Loaded")]
    loaded: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

/// Per-table outcome of a fixture load
pub fn load_report_table(report: &LoadReport) -> String {
    let rows: Vec<LoadRow> = report
        .tables
        .iter()
        .map(|t| LoadRow {
            table: t.table.to_string(),
            files: t.files,
            loaded: t.loaded,
            failed: t.failed,
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    let rows: Vec<CountRow> = stats
        .tables
        .iter()
        .map(|(table, rows)| CountRow {
            table: table.to_string(),
            rows: *rows,
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
