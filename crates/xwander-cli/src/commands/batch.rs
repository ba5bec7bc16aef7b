//! batch command implementation
//!
//! `plan` is a dry run: it chunks the input the way a bulk call would, prints
//! the request each chunk would send and the resulting outcome, without
//! talking to Airtable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{json, Map, Value};
use xwander_core::batch::{
    create_payload, delete_query, update_payload, upsert_payload, BatchOutcome, BatchRunner, ItemOutcome,
    RecordChange,
};
use xwander_core::XwanderConfig;

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub command: BatchCommand,
}

#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Show the chunked requests for a JSON array of records
    Plan(PlanArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Create,
    Update,
    Upsert,
    Delete,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// JSON file holding an array of records (or record ids for delete)
    pub file: PathBuf,

    /// Records per request (default from config)
    #[arg(long)]
    pub size: Option<usize>,

    #[arg(long, value_enum, default_value = "create")]
    pub kind: BatchKind,

    /// Fields identifying a record for upsert
    #[arg(long, value_delimiter = ',', required_if_eq("kind", "upsert"))]
    pub merge_on: Vec<String>,

    /// Let Airtable convert field values
    #[arg(long)]
    pub typecast: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,
}

/// One chunk's request plus the per-item outcome of preparing it
struct ChunkPlan {
    request: Value,
    outcomes: Vec<ItemOutcome>,
}

fn record_id(item: &Value) -> Option<String> {
    match item {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn plan_chunk(kind: BatchKind, chunk: &[Value], merge_on: &[&str], typecast: bool) -> ChunkPlan {
    match kind {
        BatchKind::Create | BatchKind::Upsert => {
            let mut records: Vec<Map<String, Value>> = Vec::with_capacity(chunk.len());
            let outcomes: Vec<ItemOutcome> = chunk
                .iter()
                .map(|item| match item {
                    Value::Object(fields) => {
                        records.push(fields.clone());
                        if kind == BatchKind::Create {
                            ItemOutcome::success(None).with_change(RecordChange::Created)
                        } else {
                            // created or updated is only known once Airtable answers
                            ItemOutcome::success(None)
                        }
                    }
                    _ => ItemOutcome::failure(None, "record is not a JSON object"),
                })
                .collect();
            let (method, body) = if kind == BatchKind::Create {
                ("POST", create_payload(&records, typecast))
            } else {
                ("PATCH", upsert_payload(&records, merge_on, typecast))
            };
            ChunkPlan {
                request: json!({ "method": method, "body": body }),
                outcomes,
            }
        }
        BatchKind::Update => {
            let mut updates = Vec::with_capacity(chunk.len());
            let outcomes: Vec<ItemOutcome> = chunk
                .iter()
                .map(|item| {
                    let id = record_id(item);
                    let has_fields = item.get("fields").is_some_and(Value::is_object);
                    match id {
                        Some(id) if has_fields => {
                            updates.push(item.clone());
                            ItemOutcome::updated(id)
                        }
                        Some(id) => ItemOutcome::failure(Some(id), "update is missing a fields object"),
                        None => ItemOutcome::failure(None, "update is missing a record id"),
                    }
                })
                .collect();
            ChunkPlan {
                request: json!({ "method": "PATCH", "body": update_payload(&updates, typecast) }),
                outcomes,
            }
        }
        BatchKind::Delete => {
            let mut ids = Vec::with_capacity(chunk.len());
            let outcomes: Vec<ItemOutcome> = chunk
                .iter()
                .map(|item| match record_id(item) {
                    Some(id) => {
                        ids.push(id.clone());
                        ItemOutcome::deleted(id)
                    }
                    None => ItemOutcome::failure(None, "missing record id"),
                })
                .collect();
            ChunkPlan {
                request: json!({ "method": "DELETE", "query": delete_query(&ids) }),
                outcomes,
            }
        }
    }
}

/// Requests a dry run would send, plus the outcome of preparing them
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub chunk_size: usize,
    /// Seconds
    pub delay_between_chunks: f64,
    pub requests: Vec<Value>,
    pub outcome: BatchOutcome,
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:30}] {pos}/{len} records") {
        pb.set_style(style);
    }
    pb
}

/// Dry-run `items` through a runner
pub fn plan(items: &[Value], args: &PlanArgs, config: &XwanderConfig) -> Result<PlanReport> {
    let size = args.size.unwrap_or(config.batch.max_chunk_size);
    let merge_on: Vec<&str> = args.merge_on.iter().map(String::as_str).collect();

    let progress = args.progress.then(|| progress_bar(items.len()));
    let mut runner = BatchRunner::new(size)?.with_id(record_id);
    if let Some(pb) = &progress {
        runner = runner.on_progress(move |done, _total| pb.set_position(done as u64));
    }

    let mut requests = Vec::new();
    let outcome = runner.run(items, |chunk| {
        let ChunkPlan { request, outcomes } = plan_chunk(args.kind, chunk, &merge_on, args.typecast);
        requests.push(request);
        Ok::<_, String>(outcomes)
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    Ok(PlanReport {
        chunk_size: size,
        delay_between_chunks: Duration::from_millis(config.batch.delay_between_chunks_ms).as_secs_f64(),
        requests,
        outcome,
    })
}

pub fn run(args: BatchArgs) -> Result<()> {
    match args.command {
        BatchCommand::Plan(args) => {
            let config = XwanderConfig::load()?;
            let content = std::fs::read_to_string(&args.file)
                .with_context(|| format!("Failed to read {:?}", args.file))?;
            let items: Vec<Value> = serde_json::from_str(&content)
                .with_context(|| format!("{:?} must hold a JSON array", args.file))?;

            let report = plan(&items, &args, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            report.outcome.ensure_success()?;
            Ok(())
        }
    }
}
