//! Configuration
//!
//! Defaults for the limiter, batch runner, backoff and report formatting,
//! read from `~/.xwander/config.json` with environment overrides.
//!
//! The utilities themselves never look at the environment; a caller loads
//! an `XwanderConfig` once and passes the sections down.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::{config_path, AppResult, XwanderError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Tokens per second
    pub rate: f64,
    /// Burst capacity
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { rate: 5.0, burst: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Vendor per-request maximum (Airtable: 10 records)
    pub max_chunk_size: usize,
    pub delay_between_chunks_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 10,
            delay_between_chunks_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub floor_secs: f64,
    pub ceiling_secs: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_secs: 1.0,
            ceiling_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XwanderConfig {
    pub rate_limit: RateLimitConfig,
    pub batch: BatchConfig,
    pub backoff: BackoffConfig,
    pub report: ReportConfig,
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| XwanderError::config(format!("Invalid value for {}: '{}'", name, raw)))
}

impl XwanderConfig {
    /// Load `~/.xwander/config.json` (if present) plus `XWANDER_*` overrides
    pub fn load() -> AppResult<Self> {
        let path = config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| XwanderError::config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| XwanderError::config(format!("Failed to parse {:?}: {}", path, e)))?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    ///
    /// Recognised: `XWANDER_RATE`, `XWANDER_BURST`, `XWANDER_BATCH_SIZE`,
    /// `XWANDER_CURRENCY`.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("XWANDER_RATE") {
            self.rate_limit.rate = parse_env("XWANDER_RATE", &raw)?;
        }
        if let Some(raw) = lookup("XWANDER_BURST") {
            self.rate_limit.burst = parse_env("XWANDER_BURST", &raw)?;
        }
        if let Some(raw) = lookup("XWANDER_BATCH_SIZE") {
            self.batch.max_chunk_size = parse_env("XWANDER_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("XWANDER_CURRENCY") {
            let currency = raw.trim();
            if !currency.is_empty() {
                self.report.currency = currency.to_string();
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.rate_limit.rate.is_finite() && self.rate_limit.rate > 0.0) {
            return Err(XwanderError::config("rate_limit.rate must be positive"));
        }
        if self.rate_limit.burst < 1 {
            return Err(XwanderError::config("rate_limit.burst must be at least 1"));
        }
        if self.batch.max_chunk_size < 1 {
            return Err(XwanderError::config("batch.max_chunk_size must be at least 1"));
        }
        let floor = self.backoff.floor_secs;
        let ceiling = self.backoff.ceiling_secs;
        if !(floor.is_finite() && ceiling.is_finite() && floor > 0.0 && floor <= ceiling) {
            return Err(XwanderError::config(
                "backoff requires 0 < floor_secs <= ceiling_secs",
            ));
        }
        Ok(())
    }
}
