//! xwander core
//!
//! Shared building blocks for the xwander vendor API plugins (Google Ads,
//! Airtable, Bokun, HubSpot, GA4):
//!
//! - `gaql`: Google Ads Query Language builder, validator and pretty-printer
//! - `formula`: Airtable filter formula builder
//! - `ratelimit`: per-resource token buckets and throttling backoff
//! - `batch`: chunked bulk operations with partial-failure accounting
//! - `report`: table formatting and CSV/JSON/Markdown export
//!
//! None of these talk to a vendor API; requests are made by the callbacks
//! and clients the plugins supply.

pub mod batch;
pub mod common;
pub mod config;
pub mod formula;
pub mod gaql;
pub mod ratelimit;
pub mod report;

pub use batch::{chunk, run_batched, BatchError, BatchOutcome, BatchRunner, ItemOutcome, RecordChange};
pub use common::{AppResult, ErrorCode, XwanderError};
pub use config::XwanderConfig;
pub use formula::{Formula, FormulaBuilder};
pub use gaql::{GaqlBuilder, QueryTemplates};
pub use ratelimit::{Backoff, LimiterRegistry, TokenBucket};
