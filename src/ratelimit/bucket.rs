//! Single token bucket

use tokio::time::Instant;

/// Window over which a limit's tokens are granted
const WINDOW_SECS: f64 = 60.0;

/// Token bucket for one caller/operation key
///
/// A new bucket holds zero tokens and has never been refilled; its first
/// refill treats the elapsed time as unbounded and fills it to the limit.
#[derive(Debug, Clone)]
pub struct RateBucket {
    key: String,
    tokens: f64,
    last_update: Option<Instant>,
}

impl RateBucket {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tokens: 0.0,
            last_update: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Add tokens for the time elapsed since the last refill, capped at `limit`
    pub fn refill(&mut self, limit: f64, now: Instant) {
        self.tokens = match self.last_update {
            None => limit,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                (self.tokens + elapsed * limit / WINDOW_SECS).min(limit)
            }
        };
        self.tokens = self.tokens.max(0.0);
        self.last_update = Some(now);
    }

    /// Take `cost` tokens, or return the whole seconds until they accrue
    pub fn try_consume(&mut self, cost: f64, limit: f64) -> Result<(), u64> {
        if self.tokens < cost {
            let deficit = cost - self.tokens;
            let wait = if limit > 0.0 {
                (deficit * WINDOW_SECS / limit).ceil()
            } else {
                f64::from(u32::MAX)
            };
            return Err((wait as u64).max(1));
        }
        self.tokens -= cost;
        Ok(())
    }
}
