//! Limiter Registry
//!
//! Process-wide map of resource key → shared token bucket. The registry is
//! an explicit value: construct one at startup and hand out `Arc`s of it,
//! tests build their own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::bucket::TokenBucket;
use crate::common::AppResult;
use crate::config::RateLimitConfig;

/// Airtable allows 5 requests per second per base
pub const DEFAULT_RATE: f64 = 5.0;
pub const DEFAULT_BURST: u32 = 5;

#[derive(Debug)]
pub struct LimiterRegistry {
    default_rate: f64,
    default_capacity: u32,
    buckets: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

impl LimiterRegistry {
    pub fn new() -> Self {
        Self {
            default_rate: DEFAULT_RATE,
            default_capacity: DEFAULT_BURST,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Registry whose `get_or_default` uses the configured rate and burst
    pub fn from_config(config: &RateLimitConfig) -> AppResult<Self> {
        // Fail early on a bad configuration rather than on first use
        TokenBucket::new("config-check", config.rate, config.burst)?;

        Ok(Self {
            default_rate: config.rate,
            default_capacity: config.burst,
            buckets: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<TokenBucket>>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Shared bucket for `key`, created on first use
    ///
    /// The first caller's `rate` and `capacity` win for the lifetime of the
    /// registry; later arguments for the same key are ignored.
    pub fn get_or_create(&self, key: &str, rate: f64, capacity: u32) -> AppResult<Arc<TokenBucket>> {
        let mut buckets = self.lock();

        if let Some(bucket) = buckets.get(key) {
            if bucket.refill_rate() != rate || bucket.capacity() != capacity {
                debug!(
                    "Limiter '{}' already exists ({}/s, burst {}); ignoring {}/s, burst {}",
                    key,
                    bucket.refill_rate(),
                    bucket.capacity(),
                    rate,
                    capacity
                );
            }
            return Ok(Arc::clone(bucket));
        }

        let bucket = Arc::new(TokenBucket::new(key, rate, capacity)?);
        info!("Created rate limiter '{}': {}/s, burst {}", key, rate, capacity);
        buckets.insert(key.to_string(), Arc::clone(&bucket));
        Ok(bucket)
    }

    /// Shared bucket for `key` with the registry defaults
    pub fn get_or_default(&self, key: &str) -> AppResult<Arc<TokenBucket>> {
        self.get_or_create(key, self.default_rate, self.default_capacity)
    }

    pub fn get(&self, key: &str) -> Option<Arc<TokenBucket>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every bucket; handles already given out keep working
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_bucket() {
        let registry = LimiterRegistry::new();
        let a = registry.get_or_default("app123").unwrap();
        let b = registry.get_or_default("app123").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_configuration_wins() {
        let registry = LimiterRegistry::new();
        let first = registry.get_or_create("app123", 2.0, 3).unwrap();
        let second = registry.get_or_create("app123", 50.0, 10).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.refill_rate(), 2.0);
        assert_eq!(second.capacity(), 3);
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry = LimiterRegistry::new();
        let a = registry.get_or_create("appA", 0.1, 1).unwrap();
        let b = registry.get_or_create("appB", 0.1, 1).unwrap();

        assert!(a.try_acquire());
        assert!(!a.try_acquire());
        assert!(b.try_acquire());
    }

    #[test]
    fn test_invalid_first_configuration_is_not_registered() {
        let registry = LimiterRegistry::new();
        assert!(registry.get_or_create("app", 0.0, 1).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_config_defaults() {
        let config = RateLimitConfig { rate: 2.5, burst: 4 };
        let registry = LimiterRegistry::from_config(&config).unwrap();
        let bucket = registry.get_or_default("base").unwrap();
        assert_eq!(bucket.refill_rate(), 2.5);
        assert_eq!(bucket.capacity(), 4);

        registry.clear();
        assert!(registry.get("base").is_none());

        let bad = RateLimitConfig { rate: 1.0, burst: 0 };
        assert!(LimiterRegistry::from_config(&bad).is_err());
    }
}
