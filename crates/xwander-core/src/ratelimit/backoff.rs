//! Backpressure handling
//!
//! Reacts to the vendor itself reporting "rate limit exceeded" (HTTP 429),
//! independently of the local token bucket. Each consecutive signal doubles
//! the delay up to a ceiling; the next unthrottled success resets it.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::common::{AppResult, XwanderError};
use crate::config::BackoffConfig;

pub const DEFAULT_FLOOR: Duration = Duration::from_secs(1);
pub const DEFAULT_CEILING: Duration = Duration::from_secs(60);

/// Per-client exponential backoff counter
#[derive(Debug)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Mutex<Duration>,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> AppResult<Self> {
        if floor.is_zero() {
            return Err(XwanderError::config("backoff floor must be greater than zero"));
        }
        if floor > ceiling {
            return Err(XwanderError::config(format!(
                "backoff floor {:?} exceeds ceiling {:?}",
                floor, ceiling
            )));
        }

        Ok(Self {
            floor,
            ceiling,
            current: Mutex::new(floor),
        })
    }

    pub fn from_config(config: &BackoffConfig) -> AppResult<Self> {
        let secs = |value: f64, name: &str| {
            Duration::try_from_secs_f64(value)
                .map_err(|_| XwanderError::config(format!("invalid backoff {}: {}", name, value)))
        };
        Self::new(
            secs(config.floor_secs, "floor")?,
            secs(config.ceiling_secs, "ceiling")?,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Duration> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Delay the next throttled signal would wait
    pub fn current(&self) -> Duration {
        *self.lock()
    }

    /// Record a throttling signal
    ///
    /// Returns the delay to wait before retrying and doubles the stored
    /// delay (capped at the ceiling) for the next consecutive signal.
    pub fn on_throttled(&self) -> Duration {
        let mut current = self.lock();
        let delay = *current;
        *current = delay.checked_mul(2).unwrap_or(self.ceiling).min(self.ceiling);
        warn!("Rate limited by vendor API; backing off {:?}", delay);
        delay
    }

    /// Record an unthrottled response
    pub fn on_success(&self) {
        let mut current = self.lock();
        if *current != self.floor {
            debug!("Resetting backoff from {:?} to {:?}", *current, self.floor);
            *current = self.floor;
        }
    }

    /// Record a throttling signal and sleep the returned delay
    pub fn wait_throttled(&self) {
        std::thread::sleep(self.on_throttled());
    }

    /// Async variant of [`wait_throttled`](Self::wait_throttled)
    pub async fn wait_throttled_async(&self) {
        let delay = self.on_throttled();
        tokio::time::sleep(delay).await;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR,
            ceiling: DEFAULT_CEILING,
            current: Mutex::new(DEFAULT_FLOOR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_up_to_ceiling() {
        let backoff = Backoff::default();
        let delays: Vec<u64> = (0..8).map(|_| backoff.on_throttled().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_success_resets_to_floor() {
        let backoff = Backoff::default();
        backoff.on_throttled();
        backoff.on_throttled();
        assert_eq!(backoff.current(), Duration::from_secs(4));

        backoff.on_success();
        assert_eq!(backoff.current(), DEFAULT_FLOOR);
        assert_eq!(backoff.on_throttled(), DEFAULT_FLOOR);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(Backoff::new(Duration::ZERO, Duration::from_secs(1)).is_err());
        assert!(Backoff::new(Duration::from_secs(5), Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_wait_throttled_async_escalates() {
        let backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(15)).unwrap();
        backoff.wait_throttled_async().await;
        backoff.wait_throttled_async().await;
        assert_eq!(backoff.current(), Duration::from_millis(15));
    }
}
