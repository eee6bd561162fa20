//! Token-bucket rate limiting keyed by caller and operation
//!
//! Each `(limit_type, key)` pair owns one bucket. Limits are expressed as
//! tokens per 60-second window and refill continuously.

pub mod bucket;

pub use bucket::RateBucket;

use crate::errors::RateLimitExceeded;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Default tokens per minute for unknown limit types
pub const DEFAULT_LIMIT_PER_MINUTE: f64 = 60.0;

struct LimiterState {
    limits: HashMap<String, f64>,
    buckets: HashMap<String, RateBucket>,
}

/// Process-wide token-bucket limiter
pub struct RateLimiter {
    default_limit: f64,
    state: Mutex<LimiterState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_PER_MINUTE)
    }
}

impl RateLimiter {
    /// Create limiter whose unknown limit types fall back to `default_limit`
    pub fn new(default_limit: f64) -> Self {
        Self {
            default_limit,
            state: Mutex::new(LimiterState {
                limits: HashMap::new(),
                buckets: HashMap::new(),
            }),
        }
    }

    /// Create limiter with a table of named limits
    pub fn with_limits(
        default_limit: f64,
        limits: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        let limiter = Self::new(default_limit);
        {
            let mut state = limiter.lock();
            state.limits.extend(limits);
        }
        limiter
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // Bucket arithmetic cannot leave the map half-updated, so a poisoned
        // lock still holds consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Configure tokens per minute for a named limit type
    pub fn set_limit(&self, limit_type: impl Into<String>, per_minute: f64) {
        self.lock().limits.insert(limit_type.into(), per_minute);
    }

    /// Tokens per minute that apply to `limit_type`
    pub fn limit_for(&self, limit_type: &str) -> f64 {
        let state = self.lock();
        Self::resolve_limit(&state, self.default_limit, limit_type)
    }

    fn resolve_limit(state: &LimiterState, default_limit: f64, limit_type: &str) -> f64 {
        state
            .limits
            .get(limit_type)
            .copied()
            .unwrap_or(default_limit)
    }

    fn bucket_id(key: &str, limit_type: &str) -> String {
        format!("{}:{}", limit_type, key)
    }

    /// Refill the bucket, then take `cost` tokens or fail without consuming
    pub fn check_and_consume(
        &self,
        key: &str,
        limit_type: &str,
        cost: f64,
    ) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut state = self.lock();
        let limit = Self::resolve_limit(&state, self.default_limit, limit_type);
        let bucket = state
            .buckets
            .entry(Self::bucket_id(key, limit_type))
            .or_insert_with(|| RateBucket::new(key));

        bucket.refill(limit, now);
        match bucket.try_consume(cost, limit) {
            Ok(()) => Ok(()),
            Err(retry_after_secs) => {
                debug!(
                    key,
                    limit_type,
                    tokens = bucket.tokens(),
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                Err(RateLimitExceeded {
                    key: key.to_string(),
                    limit_type: limit_type.to_string(),
                    retry_after_secs,
                })
            }
        }
    }

    /// Tokens currently available, after refill, without consuming
    pub fn get_remaining(&self, key: &str, limit_type: &str) -> f64 {
        let now = Instant::now();
        let mut state = self.lock();
        let limit = Self::resolve_limit(&state, self.default_limit, limit_type);
        let bucket = state
            .buckets
            .entry(Self::bucket_id(key, limit_type))
            .or_insert_with(|| RateBucket::new(key));
        bucket.refill(limit, now);
        bucket.tokens()
    }

    /// Drop the bucket for a key so the next check starts fresh
    pub fn reset(&self, key: &str, limit_type: &str) {
        self.lock().buckets.remove(&Self::bucket_id(key, limit_type));
    }

    pub fn bucket_count(&self) -> usize {
        self.lock().buckets.len()
    }
}
