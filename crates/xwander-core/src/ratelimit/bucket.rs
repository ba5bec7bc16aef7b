//! Token Bucket
//!
//! One bucket throttles every outbound call attributed to a resource key
//! (an Airtable base, an Ads customer, ...). Callers block until a token is
//! available instead of being rejected.
//!
//! Refill and consume happen in a single short critical section; the lock
//! is always released before sleeping.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::common::{AppResult, XwanderError};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    key: String,
    capacity: u32,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket
    ///
    /// `refill_rate` is in tokens per second and must be positive;
    /// `capacity` is the burst size and must be at least 1.
    pub fn new(key: impl Into<String>, refill_rate: f64, capacity: u32) -> AppResult<Self> {
        if !(refill_rate.is_finite() && refill_rate > 0.0) {
            return Err(XwanderError::config(format!(
                "refill rate must be positive, got {}",
                refill_rate
            )));
        }
        if capacity < 1 {
            return Err(XwanderError::config("bucket capacity must be at least 1"));
        }

        Ok(Self {
            key: key.into(),
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        // tokens and last_refill are always written together
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity as f64);
        state.last_refill = now;
    }

    /// Refill, then take one token or report how long until one is due
    fn take_or_wait(&self) -> Result<(), Duration> {
        let mut state = self.lock();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        // a tiny rate can push the wait past what Duration holds
        Err(Duration::try_from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            .unwrap_or(Duration::MAX))
    }

    /// Clamp the wait to the remaining budget, or `None` once the deadline passed
    fn bounded_wait(&self, wait: Duration, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(wait),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    debug!("Rate limiter '{}' timed out waiting for a token", self.key);
                    None
                } else {
                    Some(wait.min(deadline - now))
                }
            }
        }
    }

    /// Take a token without waiting
    pub fn try_acquire(&self) -> bool {
        self.take_or_wait().is_ok()
    }

    /// Block the calling thread until a token is available
    ///
    /// Returns `false` if `timeout` elapses first. A timeout too large to
    /// represent as an instant means no deadline. Never errors.
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            let wait = match self.take_or_wait() {
                Ok(()) => return true,
                Err(wait) => wait,
            };

            let Some(wait) = self.bounded_wait(wait, deadline) else {
                return false;
            };

            debug!("Rate limiter '{}' waiting {:?} for a token", self.key, wait);
            std::thread::sleep(wait);
        }
    }

    /// Async variant of [`acquire`](Self::acquire) that yields to the runtime
    /// while waiting
    pub async fn acquire_async(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            let wait = match self.take_or_wait() {
                Ok(()) => return true,
                Err(wait) => wait,
            };

            let Some(wait) = self.bounded_wait(wait, deadline) else {
                return false;
            };

            debug!("Rate limiter '{}' waiting {:?} for a token", self.key, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Current token count after refilling, always in `[0, capacity]`
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state);
        state.tokens
    }
}
