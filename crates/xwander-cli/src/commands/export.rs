//! export command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::Value;
use tracing::info;
use xwander_core::report::{export_results, export_to_string, ExportFormat, ExportOptions, Row, TableFormatter};
use xwander_core::XwanderConfig;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned terminal table
    Table,
    Csv,
    Json,
    #[value(alias = "md")]
    Markdown,
}

impl OutputFormat {
    /// File format, or `None` for the terminal table
    fn export_format(self) -> Option<ExportFormat> {
        match self {
            OutputFormat::Table => None,
            OutputFormat::Csv => Some(ExportFormat::Csv),
            OutputFormat::Json => Some(ExportFormat::Json),
            OutputFormat::Markdown => Some(ExportFormat::Markdown),
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON file holding an array of result rows
    pub file: PathBuf,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Comma-separated columns to include
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Markdown heading
    #[arg(long)]
    pub title: Option<String>,

    /// Format rows as campaign performance (money, percentages)
    #[arg(long)]
    pub performance: bool,
}

fn load_rows(file: &Path) -> Result<Vec<Row>> {
    let content = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let value: Value = serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", file))?;

    let Value::Array(items) = value else {
        anyhow::bail!("{:?} must hold a JSON array of objects", file);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            _ => anyhow::bail!("row {} in {:?} is not an object", i, file),
        })
        .collect()
}

/// Terminal table, honouring `--columns` and `--performance`
pub fn render_table(rows: &[Row], args: &ExportArgs, currency: &str) -> String {
    if args.performance {
        return TableFormatter::format_performance(rows, currency);
    }
    let columns: Vec<&str> = args.columns.iter().map(String::as_str).collect();
    TableFormatter::format(rows, (!columns.is_empty()).then_some(columns.as_slice()))
}

pub fn run(args: ExportArgs) -> Result<()> {
    let rows = load_rows(&args.file)?;

    let Some(format) = args.format.export_format() else {
        let config = XwanderConfig::load()?;
        println!("{}", render_table(&rows, &args, &config.report.currency));
        return Ok(());
    };
    let options = ExportOptions {
        columns: (!args.columns.is_empty()).then(|| args.columns.clone()),
        title: args.title.clone(),
    };

    match &args.output {
        Some(path) => {
            let written = export_results(&rows, path, format, &options)?;
            info!("Wrote {} rows as {}", rows.len(), format);
            println!("{}", written.display());
        }
        None => println!("{}", export_to_string(&rows, format, &options)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: PathBuf) -> ExportArgs {
        ExportArgs {
            file,
            format: OutputFormat::Table,
            output: None,
            columns: Vec::new(),
            title: None,
            performance: false,
        }
    }

    #[test]
    fn test_load_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, r#"[{"campaign.id": 1}, {"campaign.id": 2}]"#).unwrap();
        assert_eq!(load_rows(&path).unwrap().len(), 2);

        std::fs::write(&path, r#"[{"campaign.id": 1}, 7]"#).unwrap();
        assert!(load_rows(&path).is_err());

        std::fs::write(&path, r#"{"campaign.id": 1}"#).unwrap();
        assert!(load_rows(&path).is_err());
    }

    #[test]
    fn test_render_table_with_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, r#"[{"campaign.id": 1, "campaign.name": "Aurora"}]"#).unwrap();

        let rows = load_rows(&path).unwrap();
        let mut args = args(path);
        args.columns = vec!["campaign.name".to_string()];

        let table = render_table(&rows, &args, "EUR");
        assert!(table.starts_with("campaign.name\n"));
        assert!(table.ends_with("Total rows: 1"));
    }

    #[test]
    fn test_format_flag_values() {
        assert_eq!(OutputFormat::from_str("md", true).unwrap(), OutputFormat::Markdown);
        assert_eq!(OutputFormat::from_str("CSV", true).unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_str("xlsx", true).is_err());

        assert_eq!(OutputFormat::Table.export_format(), None);
        assert_eq!(OutputFormat::Json.export_format(), Some(ExportFormat::Json));
    }
}
