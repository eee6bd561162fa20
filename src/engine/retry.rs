//! Retry policy with exponential backoff
//!
//! Attempt `n` (zero-based) that fails with a retryable declared error is
//! followed by a sleep of `base_delay * 2^n`. No sleep follows the last
//! attempt. Unexpected failures and terminal kinds return immediately.

use crate::errors::ToolFailure;
use crate::tools::ToolMetadata;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed (at least one is always made)
    max_retries: u32,

    base_delay: Duration,

    /// Optional cap on a single delay
    max_delay: Option<Duration>,

    /// ±25% random variation
    enable_jitter: bool,
}

/// Final result plus how many times the operation ran
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, ToolFailure>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: None,
            enable_jitter: false,
        }
    }

    pub fn from_metadata(metadata: &ToolMetadata) -> Self {
        let policy = Self::new(metadata.max_retries, metadata.retry_base_delay)
            .with_jitter(metadata.retry_jitter);
        match metadata.retry_max_delay {
            Some(cap) => policy.with_max_delay(cap),
            None => policy,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.enable_jitter = enable;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after the zero-based `attempt` fails
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let delay = match self.max_delay {
            Some(cap) => exponential.min(cap),
            None => exponential,
        };

        if self.enable_jitter {
            let factor = 1.0 + (rand::random::<f64>() * 2.0 - 1.0) * 0.25;
            delay.mul_f64(factor.max(0.0))
        } else {
            delay
        }
    }

    /// Longest total sleep a caller can spend in backoff
    pub fn max_total_wait(&self) -> Duration {
        (0..self.attempts() - 1)
            .map(|attempt| {
                let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
                self.max_delay.map_or(delay, |cap| delay.min(cap))
            })
            .sum()
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `operation` receives the zero-based attempt index.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ToolFailure>>,
    {
        let max_attempts = self.attempts();
        let mut attempt = 0;

        loop {
            let result = operation(attempt).await;
            attempt += 1;

            match result {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(ToolFailure::Domain(err)) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable tool error: {}",
                        err
                    );
                    sleep(delay).await;
                }
                Err(failure) => {
                    return RetryOutcome {
                        result: Err(failure),
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let outcome = policy.run(|_| async { Ok::<_, ToolFailure>(42) }).await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let outcome = policy
            .run(|_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ToolError::generic("transient").into())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let outcome = policy
            .run(|attempt| async move {
                Err::<(), _>(ToolError::generic(format!("failure {}", attempt)).into())
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        match outcome.result {
            Err(ToolFailure::Domain(err)) => assert_eq!(err.message, "failure 2"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_kinds_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        for err in [
            ToolError::validation("bad"),
            ToolError::authentication("no key"),
            ToolError::security("blocked"),
        ] {
            let outcome = policy
                .run(|_| {
                    let err = err.clone();
                    async move { Err::<(), _>(err.into()) }
                })
                .await;
            assert_eq!(outcome.attempts, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let outcome = policy
            .run(|_| async { Err::<(), _>(anyhow::anyhow!("boom").into()) })
            .await;
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(ToolFailure::Unexpected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let outcome = policy
            .run(|_| async { Err::<(), _>(ToolError::generic("x").into()) })
            .await;
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_cap() {
        let policy =
            RetryPolicy::new(5, Duration::from_millis(1000)).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000)).with_jitter(true);
        for _ in 0..50 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(1500) && delay <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_max_total_wait() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        // Sleeps follow attempts 0..=3: 1 + 2 + 4 + 8
        assert_eq!(policy.max_total_wait(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_cap_shapes_backoff() {
        let metadata = ToolMetadata::new("lookup", "search")
            .with_retries(3, Duration::from_millis(1000))
            .with_retry_max_delay(Duration::from_millis(1500));
        let policy = RetryPolicy::from_metadata(&metadata);
        // 1000ms, then 2000ms capped to 1500ms
        assert_eq!(policy.max_total_wait(), Duration::from_millis(2500));

        let started = Instant::now();
        let outcome = policy
            .run(|_| async { Err::<(), _>(ToolError::generic("down").into()) })
            .await;

        assert_eq!(outcome.attempts, 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2500) && waited < Duration::from_millis(2600));
    }

    #[test]
    fn test_metadata_jitter_enabled() {
        let metadata = ToolMetadata::new("lookup", "search")
            .with_retries(3, Duration::from_millis(1000))
            .with_retry_jitter(true);
        let policy = RetryPolicy::from_metadata(&metadata);
        for _ in 0..50 {
            let delay = policy.delay_for(0);
            assert!(delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250));
        }
    }
}
