//! ratelimit command implementation

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use xwander_core::ratelimit::{Backoff, LimiterRegistry};
use xwander_core::XwanderConfig;

#[derive(Args, Debug)]
pub struct RatelimitArgs {
    #[command(subcommand)]
    pub command: RatelimitCommand,
}

#[derive(Subcommand, Debug)]
pub enum RatelimitCommand {
    /// Acquire COUNT tokens from one bucket and report the pacing
    Probe(ProbeArgs),

    /// Print the delays for consecutive throttling signals
    Backoff {
        /// Number of consecutive 429 responses
        #[arg(long, default_value = "8")]
        signals: usize,
    },
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Resource key (Airtable base, Ads customer id, ...)
    #[arg(long, default_value = "probe")]
    pub key: String,

    #[arg(long, default_value = "10")]
    pub count: u32,

    /// Tokens per second (default from config)
    #[arg(long)]
    pub rate: Option<f64>,

    /// Burst capacity (default from config)
    #[arg(long)]
    pub burst: Option<u32>,

    /// Give up on a token after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub key: String,
    pub rate: f64,
    pub burst: u32,
    pub acquired: u32,
    pub timed_out: u32,
    pub elapsed_secs: f64,
}

pub async fn probe(args: &ProbeArgs, config: &XwanderConfig) -> Result<ProbeReport> {
    let registry = LimiterRegistry::from_config(&config.rate_limit)?;
    let rate = args.rate.unwrap_or(config.rate_limit.rate);
    let burst = args.burst.unwrap_or(config.rate_limit.burst);
    let bucket = registry.get_or_create(&args.key, rate, burst)?;
    let timeout = args.timeout_ms.map(Duration::from_millis);

    let started = Instant::now();
    let mut acquired = 0;
    for _ in 0..args.count {
        if bucket.acquire_async(timeout).await {
            acquired += 1;
        }
    }

    Ok(ProbeReport {
        key: args.key.clone(),
        rate,
        burst,
        acquired,
        timed_out: args.count - acquired,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

pub fn backoff_delays(config: &XwanderConfig, signals: usize) -> Result<Vec<f64>> {
    let backoff = Backoff::from_config(&config.backoff)?;
    Ok((0..signals).map(|_| backoff.on_throttled().as_secs_f64()).collect())
}

pub async fn run(args: RatelimitArgs) -> Result<()> {
    let config = XwanderConfig::load()?;
    match args.command {
        RatelimitCommand::Probe(args) => {
            let report = probe(&args, &config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        RatelimitCommand::Backoff { signals } => {
            for (i, delay) in backoff_delays(&config, signals)?.iter().enumerate() {
                println!("{:>3}  {:.1}s", i + 1, delay);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_paces_requests() {
        let args = ProbeArgs {
            key: "appTest".to_string(),
            count: 4,
            rate: Some(20.0),
            burst: Some(2),
            timeout_ms: None,
        };
        let report = probe(&args, &XwanderConfig::default()).await.unwrap();

        assert_eq!(report.acquired, 4);
        assert_eq!(report.timed_out, 0);
        // two beyond the burst at 20/s
        assert!(report.elapsed_secs >= 0.095);
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let args = ProbeArgs {
            key: "appSlow".to_string(),
            count: 3,
            rate: Some(0.1),
            burst: Some(1),
            timeout_ms: Some(10),
        };
        let report = probe(&args, &XwanderConfig::default()).await.unwrap();
        assert_eq!(report.acquired, 1);
        assert_eq!(report.timed_out, 2);
    }

    #[test]
    fn test_backoff_delays_from_config() {
        let delays = backoff_delays(&XwanderConfig::default(), 8).unwrap();
        assert_eq!(delays, vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 60.0, 60.0]);
    }
}
