//! Continuous token bucket for a single client.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::{ProxyError, Result};

/// Refill rate and capacity applied to every bucket of a registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    refill_rate: f64,
    burst: u32,
}

impl RateLimitPolicy {
    /// # Errors
    /// `ProxyError::Config` if `refill_rate` is not a positive finite number
    /// or `burst` is zero.
    pub fn new(refill_rate: f64, burst: u32) -> Result<Self> {
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(ProxyError::Config(format!(
                "refill rate must be a positive number, got {refill_rate}"
            )));
        }
        if burst == 0 {
            return Err(ProxyError::Config("burst must be >= 1".to_string()));
        }
        Ok(Self { refill_rate, burst })
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Bucket capacity
    pub fn burst(&self) -> u32 {
        self.burst
    }
}

impl Default for RateLimitPolicy {
    /// 5 requests per second sustained, bursts of 10
    fn default() -> Self {
        Self { refill_rate: 5.0, burst: 10 }
    }
}

impl TryFrom<&RateLimitConfig> for RateLimitPolicy {
    type Error = ProxyError;

    fn try_from(cfg: &RateLimitConfig) -> Result<Self> {
        Self::new(cfg.refill_rate, cfg.burst)
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with lazy, time-based refill.
///
/// Tokens are replenished at call time from the elapsed monotonic time, so an
/// idle bucket costs nothing. Fractional tokens are carried between calls.
/// `0 <= tokens <= capacity` holds after every operation.
///
/// Buckets are only created by [`LimiterRegistry`](super::LimiterRegistry).
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub(crate) fn new(policy: RateLimitPolicy, now: Instant) -> Self {
        let capacity = f64::from(policy.burst);
        Self {
            capacity,
            refill_rate: policy.refill_rate,
            state: Mutex::new(BucketState { tokens: capacity, last_refill: now }),
        }
    }

    /// Take one token if available. Returns `true` when the request is admitted.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// [`allow`](Self::allow) evaluated at `now`.
    ///
    /// An instant earlier than the last accounting adds no tokens and does not
    /// move the accounting timestamp backwards.
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.lock();

        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens = elapsed
            .as_secs_f64()
            .mul_add(self.refill_rate, state.tokens)
            .min(self.capacity);
        if now > state.last_refill {
            state.last_refill = now;
        }

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens left as of the last accounting (no refill is applied)
    pub fn available(&self) -> f64 {
        self.lock().tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    #[cfg(test)]
    pub(crate) fn last_refill(&self) -> Instant {
        self.lock().last_refill
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        // No critical section can leave the state half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
