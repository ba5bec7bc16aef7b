//! Export of query results to CSV, JSON and Markdown

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use super::table::cell_text;
use super::{column_names, Row};
use crate::common::{AppResult, XwanderError};

const NO_DATA: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl FromStr for ExportFormat {
    type Err = XwanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(XwanderError::Export(format!("Unsupported format: {}", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// Format-specific knobs; ignored by formats that have no use for them
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Columns to include, in order; defaults to the first row's keys
    pub columns: Option<Vec<String>>,
    /// Markdown heading
    pub title: Option<String>,
}

impl ExportOptions {
    fn column_refs(&self) -> Option<Vec<&str>> {
        self.columns
            .as_ref()
            .map(|cols| cols.iter().map(String::as_str).collect())
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

pub struct CsvExporter;

impl CsvExporter {
    pub fn to_string(rows: &[Row], columns: Option<&[&str]>) -> String {
        if rows.is_empty() {
            return NO_DATA.to_string();
        }

        let columns = column_names(rows, columns);
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(columns.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","));
        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|col| csv_field(&cell_text(row.get(col))))
                .collect();
            lines.push(cells.join(","));
        }
        lines.join("\n")
    }

    /// Write a CSV file; an empty result set is an error
    pub fn export(rows: &[Row], path: &Path, columns: Option<&[&str]>) -> AppResult<PathBuf> {
        if rows.is_empty() {
            return Err(XwanderError::Export("No data to export".to_string()));
        }
        let mut content = Self::to_string(rows, columns);
        content.push('\n');
        write_file(path, &content)
    }
}

pub struct JsonExporter;

impl JsonExporter {
    /// Pretty JSON array, two-space indent
    pub fn to_string(rows: &[Row]) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(rows)?)
    }

    pub fn export(rows: &[Row], path: &Path) -> AppResult<PathBuf> {
        write_file(path, &Self::to_string(rows)?)
    }
}

pub struct MarkdownExporter;

impl MarkdownExporter {
    pub fn to_string(rows: &[Row], columns: Option<&[&str]>, title: Option<&str>) -> String {
        if rows.is_empty() {
            return NO_DATA.to_string();
        }

        let columns = column_names(rows, columns);
        let mut lines = Vec::with_capacity(rows.len() + 4);

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            lines.push(format!("# {}\n", title));
        }

        lines.push(format!("| {} |", columns.join(" | ")));
        lines.push(format!("| {} |", vec!["---"; columns.len()].join(" | ")));
        for row in rows {
            let cells: Vec<String> = columns.iter().map(|col| cell_text(row.get(col))).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        lines.push(format!("\n*Total rows: {}*", rows.len()));

        lines.join("\n")
    }

    pub fn export(
        rows: &[Row],
        path: &Path,
        columns: Option<&[&str]>,
        title: Option<&str>,
    ) -> AppResult<PathBuf> {
        write_file(path, &Self::to_string(rows, columns, title))
    }
}

fn write_file(path: &Path, content: &str) -> AppResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!("Exported {} bytes to {:?}", content.len(), path);
    Ok(path.to_path_buf())
}

/// Render rows in `format` without touching the filesystem
pub fn export_to_string(rows: &[Row], format: ExportFormat, options: &ExportOptions) -> AppResult<String> {
    let columns = options.column_refs();
    match format {
        ExportFormat::Csv => Ok(CsvExporter::to_string(rows, columns.as_deref())),
        ExportFormat::Json => JsonExporter::to_string(rows),
        ExportFormat::Markdown => Ok(MarkdownExporter::to_string(
            rows,
            columns.as_deref(),
            options.title.as_deref(),
        )),
    }
}

/// Write rows to `path` in `format`, creating parent directories
pub fn export_results(
    rows: &[Row],
    path: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> AppResult<PathBuf> {
    let columns = options.column_refs();
    match format {
        ExportFormat::Csv => CsvExporter::export(rows, path, columns.as_deref()),
        ExportFormat::Json => JsonExporter::export(rows, path),
        ExportFormat::Markdown => {
            MarkdownExporter::export(rows, path, columns.as_deref(), options.title.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows() -> Vec<Row> {
        [
            json!({ "campaign.name": "Aurora, Levi", "metrics.clicks": 12 }),
            json!({ "campaign.name": "Husky \"Pro\"", "metrics.clicks": 3 }),
        ]
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
    }

    #[test]
    fn test_format_names() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("Markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        let err = "xlsx".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Export error: Unsupported format: xlsx");
    }

    #[test]
    fn test_csv_quotes_when_needed() {
        let csv = CsvExporter::to_string(&rows(), None);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "campaign.name,metrics.clicks");
        assert_eq!(lines[1], "\"Aurora, Levi\",12");
        assert_eq!(lines[2], "\"Husky \"\"Pro\"\"\",3");
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(CsvExporter::to_string(&[], None), "No data");
        assert_eq!(MarkdownExporter::to_string(&[], None, Some("x")), "No data");
        assert_eq!(JsonExporter::to_string(&[]).unwrap(), "[]");

        let dir = tempfile::tempdir().unwrap();
        let err = CsvExporter::export(&[], &dir.path().join("out.csv"), None).unwrap_err();
        assert!(matches!(err, XwanderError::Export(_)));
    }

    #[test]
    fn test_markdown_layout() {
        let md = MarkdownExporter::to_string(&rows(), Some(&["metrics.clicks"]), Some("Clicks"));
        assert_eq!(
            md,
            "# Clicks\n\n| metrics.clicks |\n| --- |\n| 12 |\n| 3 |\n\n*Total rows: 2*"
        );
    }

    #[test]
    fn test_json_is_pretty() {
        let out = export_to_string(&rows()[..1], ExportFormat::Json, &ExportOptions::default()).unwrap();
        assert!(out.starts_with("[\n  {\n    \"campaign.name\""));
    }

    #[test]
    fn test_export_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/2026/clicks.md");
        let options = ExportOptions {
            title: Some("Weekly".to_string()),
            ..Default::default()
        };

        let written = export_results(&rows(), &path, ExportFormat::Markdown, &options).unwrap();
        assert_eq!(written, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Weekly"));
        assert!(content.contains("*Total rows: 2*"));
    }
}
