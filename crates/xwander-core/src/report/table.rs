//! Terminal table and value formatting for query results

use serde_json::Value;

use super::{column_names, Row};

const NAME_WIDTH: usize = 40;

/// `1234` → `1,234`
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn group_decimal(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let int_value: i64 = int_part.parse().unwrap_or(0);

    let mut out = String::new();
    if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_value));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Ads monetary amounts are in micros: `1_234_567_890` → `EUR 1,234.57`
pub fn format_micros(micros: i64, currency: &str) -> String {
    format!("{} {}", currency, group_decimal(micros as f64 / 1_000_000.0, 2))
}

/// `0.0523` → `5.23%`
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Text shown for a cell; missing and null render empty
pub(crate) fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric view of a metric; the API returns int64 metrics as strings
fn metric(row: &Row, key: &str) -> f64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub struct TableFormatter;

impl TableFormatter {
    /// ASCII table; columns default to the first row's keys
    pub fn format(rows: &[Row], columns: Option<&[&str]>) -> String {
        if rows.is_empty() {
            return "No results found.".to_string();
        }

        let columns = column_names(rows, columns);
        let widths: Vec<usize> = columns
            .iter()
            .map(|col| {
                rows.iter()
                    .map(|row| cell_text(row.get(col)).chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(col.chars().count())
            })
            .collect();

        let render = |cells: Vec<String>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let separator = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut lines = Vec::with_capacity(rows.len() + 4);
        lines.push(render(columns.clone()));
        lines.push(separator.clone());
        for row in rows {
            lines.push(render(columns.iter().map(|col| cell_text(row.get(col))).collect()));
        }
        lines.push(separator);
        lines.push(format!("\nTotal rows: {}", rows.len()));

        lines.join("\n")
    }

    /// Campaign performance rows with money, percentages and counts formatted
    pub fn format_performance(rows: &[Row], currency: &str) -> String {
        if rows.is_empty() {
            return "No campaigns found.".to_string();
        }

        let formatted: Vec<Row> = rows
            .iter()
            .map(|row| {
                let name: String = cell_text(row.get("campaign.name")).chars().take(NAME_WIDTH).collect();
                let mut out = Row::new();
                out.insert("campaign.name".into(), Value::String(name));
                out.insert("campaign.status".into(), Value::String(cell_text(row.get("campaign.status"))));
                out.insert(
                    "metrics.impressions".into(),
                    Value::String(group_thousands(metric(row, "metrics.impressions") as i64)),
                );
                out.insert(
                    "metrics.clicks".into(),
                    Value::String(group_thousands(metric(row, "metrics.clicks") as i64)),
                );
                out.insert(
                    "metrics.ctr".into(),
                    Value::String(format_percentage(metric(row, "metrics.ctr"))),
                );
                out.insert(
                    "metrics.cost".into(),
                    Value::String(format_micros(metric(row, "metrics.cost_micros") as i64, currency)),
                );
                out.insert(
                    "metrics.conversions".into(),
                    Value::String(format!("{:.1}", metric(row, "metrics.conversions"))),
                );
                out
            })
            .collect();

        Self::format(&formatted, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_format_micros() {
        assert_eq!(format_micros(1_234_567_890, "EUR"), "EUR 1,234.57");
        assert_eq!(format_micros(0, "USD"), "USD 0.00");
        assert_eq!(format_micros(999_999, "EUR"), "EUR 1.00");
        assert_eq!(format_micros(-2_500_000_000, "EUR"), "EUR -2,500.00");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.0523), "5.23%");
        assert_eq!(format_percentage(1.0), "100.00%");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn test_table_layout() {
        let rows = vec![
            row(json!({ "campaign.id": 1, "campaign.name": "Aurora" })),
            row(json!({ "campaign.id": 22, "campaign.name": "Husky safari" })),
        ];
        let table = TableFormatter::format(&rows, None);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "campaign.id | campaign.name");
        assert_eq!(lines[1], format!("{}-+-{}", "-".repeat(11), "-".repeat(13)));
        assert_eq!(lines[2], "1           | Aurora       ");
        assert_eq!(lines[3], "22          | Husky safari ");
        assert!(table.ends_with("\nTotal rows: 2"));
    }

    #[test]
    fn test_table_selected_columns_and_missing_cells() {
        let rows = vec![row(json!({ "a": "x", "b": null }))];
        let table = TableFormatter::format(&rows, Some(&["b", "c"]));
        assert!(table.starts_with("b | c\n--+--"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(TableFormatter::format(&[], None), "No results found.");
        assert_eq!(TableFormatter::format_performance(&[], "EUR"), "No campaigns found.");
    }

    #[test]
    fn test_performance_formatting() {
        let rows = vec![row(json!({
            "campaign.name": "Northern Lights Tour",
            "campaign.status": "ENABLED",
            "metrics.impressions": "12345",
            "metrics.clicks": 678,
            "metrics.ctr": 0.0549,
            "metrics.cost_micros": 45_670_000,
            "metrics.conversions": 3.0
        }))];
        let table = TableFormatter::format_performance(&rows, "EUR");

        assert!(table.contains("12,345"));
        assert!(table.contains("5.49%"));
        assert!(table.contains("EUR 45.67"));
        assert!(table.contains("3.0"));
    }
}
