//! gaql command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::debug;
use xwander_core::gaql::{pretty_print, validate, GaqlBuilder, QueryTemplates, TemplateParams};
use xwander_core::{AppResult, XwanderError};

#[derive(Args, Debug)]
pub struct GaqlArgs {
    #[command(subcommand)]
    pub command: GaqlCommand,
}

#[derive(Subcommand, Debug)]
pub enum GaqlCommand {
    /// Assemble a query from clauses
    Build(BuildArgs),

    /// Check a query's structure
    Validate {
        query: String,
    },

    /// Pretty-print a query
    Format {
        query: String,
    },

    /// Render a prebuilt report query
    Template(TemplateArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Comma-separated fields
    #[arg(long, value_delimiter = ',', required = true)]
    pub select: Vec<String>,

    /// Resource to query (campaign, ad_group, ...)
    #[arg(long)]
    pub from: String,

    /// WHERE predicate; repeat for AND
    #[arg(long = "where")]
    pub filters: Vec<String>,

    /// Date window keyword (LAST_7_DAYS, THIS_MONTH, ...)
    #[arg(long)]
    pub during: Option<String>,

    /// Explicit date range, YYYY-MM-DD
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub between: Option<Vec<String>>,

    /// Sort key as FIELD or FIELD:desc; repeat for multiple keys
    #[arg(long = "order-by")]
    pub order_by: Vec<String>,

    #[arg(long)]
    pub limit: Option<u64>,

    /// Print one clause per line
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Template name (campaign_performance, search_terms, ...)
    pub name: String,

    #[arg(long, default_value = "7")]
    pub days: u32,

    #[arg(long, default_value = "50")]
    pub limit: u64,

    #[arg(long)]
    pub campaign_id: Option<String>,

    /// Include paused and removed campaigns
    #[arg(long)]
    pub all_statuses: bool,

    #[arg(long)]
    pub pretty: bool,
}

pub fn run(args: GaqlArgs) -> Result<()> {
    match args.command {
        GaqlCommand::Build(args) => {
            let query = build_query(&args)?;
            print_query(&query, args.pretty);
        }
        GaqlCommand::Validate { query } => {
            validate(&query)?;
            println!("Query is valid");
        }
        GaqlCommand::Format { query } => {
            println!("{}", pretty_print(&query));
        }
        GaqlCommand::Template(args) => {
            let params = TemplateParams {
                days: args.days,
                limit: args.limit,
                enabled_only: !args.all_statuses,
                campaign_id: args.campaign_id,
            };
            let query = QueryTemplates::by_name(&args.name, &params)?;
            print_query(&query, args.pretty);
        }
    }
    Ok(())
}

fn print_query(query: &str, pretty: bool) {
    if pretty {
        println!("{}", pretty_print(query));
    } else {
        println!("{}", query);
    }
}

/// `FIELD` or `FIELD:asc` / `FIELD:desc`
fn parse_order(key: &str) -> AppResult<(String, bool)> {
    match key.rsplit_once(':') {
        None => Ok((key.to_string(), false)),
        Some((field, direction)) => match direction.to_ascii_lowercase().as_str() {
            "desc" => Ok((field.to_string(), true)),
            "asc" => Ok((field.to_string(), false)),
            other => Err(XwanderError::malformed_query(format!(
                "Invalid sort direction '{}' for {} (expected asc or desc)",
                other, field
            ))),
        },
    }
}

pub fn build_query(args: &BuildArgs) -> AppResult<String> {
    let mut builder = GaqlBuilder::new()
        .add_select(args.select.iter().map(|f| f.trim()).filter(|f| !f.is_empty()))
        .set_source(args.from.as_str());

    for filter in &args.filters {
        builder = builder.add_filter(filter.as_str());
    }
    if let Some(window) = &args.during {
        builder = builder.add_date_range(window);
    }
    if let Some(range) = &args.between {
        if let [start, end] = range.as_slice() {
            builder = builder.add_date_between(start, end);
        }
    }
    for key in &args.order_by {
        let (field, descending) = parse_order(key)?;
        builder = builder.add_order(field, descending);
    }
    if let Some(limit) = args.limit {
        builder = builder.set_limit(limit);
    }

    debug!("Built query from {} select fields", builder.select_fields().len());
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BuildArgs {
        BuildArgs {
            select: vec!["campaign.id".into(), "campaign.name".into()],
            from: "campaign".into(),
            filters: vec!["campaign.status = ENABLED".into()],
            during: None,
            between: None,
            order_by: vec!["metrics.clicks:desc".into()],
            limit: Some(50),
            pretty: false,
        }
    }

    #[test]
    fn test_build_from_flags() {
        assert_eq!(
            build_query(&args()).unwrap(),
            "SELECT campaign.id, campaign.name FROM campaign WHERE campaign.status = ENABLED \
             ORDER BY metrics.clicks DESC LIMIT 50"
        );
    }

    #[test]
    fn test_build_with_dates() {
        let mut args = args();
        args.filters.clear();
        args.order_by.clear();
        args.limit = None;
        args.between = Some(vec!["2026-01-01".into(), "2026-01-31".into()]);

        assert_eq!(
            build_query(&args).unwrap(),
            "SELECT campaign.id, campaign.name FROM campaign \
             WHERE segments.date BETWEEN '2026-01-01' AND '2026-01-31'"
        );
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("metrics.cost_micros").unwrap(), ("metrics.cost_micros".to_string(), false));
        assert_eq!(parse_order("metrics.clicks:DESC").unwrap(), ("metrics.clicks".to_string(), true));
        assert!(parse_order("metrics.clicks:sideways").is_err());
    }

    #[test]
    fn test_blank_select_is_rejected() {
        let mut args = args();
        args.select = vec![" ".into()];
        let err = build_query(&args).unwrap_err();
        assert_eq!(err.to_string(), "Malformed query: SELECT clause is required");
    }
}
