//! Rate Limiting Module
//!
//! - `TokenBucket`: blocking / async token bucket per resource key
//! - `LimiterRegistry`: shared buckets keyed by resource
//! - `Backoff`: exponential delay for vendor-reported throttling

pub mod backoff;
pub mod bucket;
pub mod registry;

pub use backoff::Backoff;
pub use bucket::TokenBucket;
pub use registry::{LimiterRegistry, DEFAULT_BURST, DEFAULT_RATE};
