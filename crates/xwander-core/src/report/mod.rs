//! Reporting Module
//!
//! Turns query result rows into terminal tables and CSV, JSON or Markdown
//! exports. A row is one JSON object keyed by GAQL field name.

pub mod export;
pub mod table;

use serde_json::{Map, Value};

pub use export::{
    export_results, export_to_string, CsvExporter, ExportFormat, ExportOptions, JsonExporter,
    MarkdownExporter,
};
pub use table::{format_micros, format_percentage, group_thousands, TableFormatter};

pub type Row = Map<String, Value>;

/// Requested columns, or the first row's keys in insertion order
fn column_names(rows: &[Row], columns: Option<&[&str]>) -> Vec<String> {
    match columns {
        Some(columns) => columns.iter().map(|c| c.to_string()).collect(),
        None => rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default(),
    }
}
