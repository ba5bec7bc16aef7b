//! xwander CLI
//!
//! Offline front end for the shared plugin utilities:
//! - gaql: build, validate, pretty-print and template queries
//! - formula: Airtable filter formulas
//! - batch: chunk plans for bulk record operations
//! - export: render result rows as CSV, JSON or Markdown
//! - ratelimit: exercise a token bucket
//! - config: show the effective configuration

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xwander_core::{ErrorCode, XwanderError};

mod commands;

#[derive(Parser)]
#[command(name = "xwander")]
#[command(about = "Query building, rate limiting and batch tooling for xwander plugins", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging on stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Google Ads queries
    Gaql(commands::gaql::GaqlArgs),

    /// Airtable filter formulas
    Formula(commands::formula::FormulaArgs),

    /// Bulk record operations
    Batch(commands::batch::BatchArgs),

    /// Export result rows from a JSON file
    Export(commands::export::ExportArgs),

    /// Token bucket probe
    Ratelimit(commands::ratelimit::RatelimitArgs),

    /// Configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Gaql(args) => commands::gaql::run(args),
        Commands::Formula(args) => commands::formula::run(args),
        Commands::Batch(args) => commands::batch::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Ratelimit(args) => commands::ratelimit::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}

/// Library errors carry their own code; anything else is generic
fn exit_code(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<XwanderError>()
        .map(XwanderError::code)
        .unwrap_or(ErrorCode::Generic);
    code.code() as u8
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
