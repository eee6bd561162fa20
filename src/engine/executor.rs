//! Execution engine
//!
//! Sequences one tool invocation:
//!
//! ```text
//! START → CACHE_CHECK ─hit→ SUCCESS
//!              └─miss→ RATE_LIMIT_CHECK ─limited→ FAILURE
//!                           └─ok→ EXECUTE (retry loop) ─err→ FAILURE
//!                                    └─ok→ [CACHE_WRITE] → SUCCESS
//! ```
//!
//! Cache hits skip rate limiting and the tool body. Rate-limit rejections
//! are never retried. Every outcome is returned as a `ToolResponse`.

use super::context::InvocationContext;
use super::response::{FailureInfo, InvocationResult, ResponseMetadata, ToolResponse};
use super::retry::RetryPolicy;
use crate::cache::{derive_key, CacheManager};
use crate::errors::{ToolError, ToolFailure};
use crate::ratelimit::RateLimiter;
use crate::telemetry::{AnalyticsEvent, EventType, PerformanceRecord, Recorders};
use crate::tools::{Tool, ToolMetadata, ToolParams};
use futures_util::FutureExt;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// TTL for cache-enabled tools that do not set their own
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct ExecutionEngine {
    cache: Arc<CacheManager>,
    limiter: Arc<RateLimiter>,
    recorders: Recorders,
    mock_mode: bool,
    default_ttl: Duration,
}

impl ExecutionEngine {
    pub fn new(cache: Arc<CacheManager>, limiter: Arc<RateLimiter>, recorders: Recorders) -> Self {
        Self {
            cache,
            limiter,
            recorders,
            mock_mode: false,
            default_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Bypass rate limiting; tools see the flag on their context
    pub fn with_mock_mode(mut self, mock_mode: bool) -> Self {
        self.mock_mode = mock_mode;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    /// Run `tool` with its own metadata
    pub async fn run(
        &self,
        tool: &dyn Tool,
        params: &ToolParams,
        user_id: Option<&str>,
    ) -> ToolResponse {
        self.run_with(tool, tool.metadata(), params, user_id).await
    }

    /// Run `tool` under `metadata`, which may carry configured overrides
    pub async fn run_with(
        &self,
        tool: &dyn Tool,
        metadata: &ToolMetadata,
        params: &ToolParams,
        user_id: Option<&str>,
    ) -> ToolResponse {
        let mut ctx = InvocationContext::new(metadata, user_id, self.mock_mode);
        debug!(request_id = %ctx.request_id, tool = %metadata.name, "Invocation started");
        self.emit(
            AnalyticsEvent::new(EventType::Start, &metadata.name).with_metadata(json!({
                "request_id": ctx.request_id,
                "category": metadata.category,
                "user_id": ctx.user_id,
            })),
        );

        let cache_key = metadata.cache_enabled.then(|| {
            derive_key(
                &metadata.name,
                params,
                metadata.cache_key_params.as_deref(),
            )
        });

        if let Some(key) = &cache_key {
            if let Some(payload) = self.cache.get(key).await {
                debug!(request_id = %ctx.request_id, tool = %metadata.name, "Cache hit");
                return self.finish_success(&ctx, metadata, payload, true, 0);
            }
        }

        if !self.mock_mode {
            if let Err(limited) = self.limiter.check_and_consume(
                &ctx.rate_key(),
                &metadata.rate_limit_type,
                metadata.rate_limit_cost,
            ) {
                let failure = ToolFailure::Domain(ToolError::from(limited));
                return self.finish_failure(&ctx, metadata, &failure, 0);
            }
        }

        match self.execute_with_retry(tool, metadata, params, &mut ctx).await {
            Ok(payload) => {
                if let Some(key) = &cache_key {
                    let ttl = metadata.cache_ttl.unwrap_or(self.default_ttl);
                    self.cache.set(key, payload.clone(), ttl).await;
                }
                let attempts = ctx.retry_attempt + 1;
                self.finish_success(&ctx, metadata, payload, false, attempts)
            }
            Err(failure) => {
                let attempts = ctx.retry_attempt + 1;
                self.finish_failure(&ctx, metadata, &failure, attempts)
            }
        }
    }

    /// Call the tool body under the tool's retry policy.
    ///
    /// Leaves `ctx.retry_attempt` at the index of the last attempt made.
    pub async fn execute_with_retry(
        &self,
        tool: &dyn Tool,
        metadata: &ToolMetadata,
        params: &ToolParams,
        ctx: &mut InvocationContext,
    ) -> Result<Value, ToolFailure> {
        let base = ctx.clone();
        let policy = RetryPolicy::from_metadata(metadata);
        debug!(
            request_id = %ctx.request_id,
            max_attempts = policy.attempts(),
            max_backoff_ms = policy.max_total_wait().as_millis() as u64,
            "Executing tool"
        );
        let outcome = policy
            .run(|attempt| {
                let mut attempt_ctx = base.clone();
                attempt_ctx.retry_attempt = attempt;
                async move { execute_once(tool, params, &attempt_ctx).await }
            })
            .await;

        ctx.retry_attempt = outcome.attempts.saturating_sub(1);
        outcome.result
    }

    fn finish_success(
        &self,
        ctx: &InvocationContext,
        metadata: &ToolMetadata,
        payload: Value,
        cache_hit: bool,
        attempts: u32,
    ) -> ToolResponse {
        let duration_ms = ctx.elapsed_ms();
        info!(
            request_id = %ctx.request_id,
            tool = %metadata.name,
            duration_ms,
            cache_hit,
            attempts,
            "Tool succeeded"
        );

        self.emit(
            AnalyticsEvent::new(EventType::Success, &metadata.name)
                .with_duration(duration_ms)
                .with_metadata(json!({
                    "request_id": ctx.request_id,
                    "cache_hit": cache_hit,
                    "attempts": attempts,
                })),
        );
        self.measure(PerformanceRecord {
            tool_name: metadata.name.clone(),
            duration_ms,
            success: true,
            cache_hit,
            error_type: None,
        });

        InvocationResult::Success { payload }.into_response(
            &metadata.name,
            response_metadata(ctx, metadata, duration_ms, cache_hit, attempts),
        )
    }

    fn finish_failure(
        &self,
        ctx: &InvocationContext,
        metadata: &ToolMetadata,
        failure: &ToolFailure,
        attempts: u32,
    ) -> ToolResponse {
        let duration_ms = ctx.elapsed_ms();
        let info = FailureInfo::from_failure(failure, &ctx.request_id);
        warn!(
            request_id = %ctx.request_id,
            tool = %metadata.name,
            code = %info.code,
            attempts,
            "Tool failed: {}",
            failure
        );

        self.emit(
            AnalyticsEvent::new(EventType::Error, &metadata.name)
                .with_duration(duration_ms)
                .with_error(info.code.as_str(), info.message.as_str())
                .with_metadata(json!({
                    "request_id": ctx.request_id,
                    "attempts": attempts,
                    "error_type": failure.error_type(),
                })),
        );
        self.measure(PerformanceRecord {
            tool_name: metadata.name.clone(),
            duration_ms,
            success: false,
            cache_hit: false,
            error_type: Some(failure.error_type().to_string()),
        });

        InvocationResult::Failure(info).into_response(
            &metadata.name,
            response_metadata(ctx, metadata, duration_ms, false, attempts),
        )
    }

    fn emit(&self, event: AnalyticsEvent) {
        let analytics = &self.recorders.analytics;
        match std::panic::catch_unwind(AssertUnwindSafe(|| analytics.record(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Analytics sink error ignored: {}", e),
            Err(_) => debug!("Analytics sink panicked; ignored"),
        }
    }

    fn measure(&self, record: PerformanceRecord) {
        let performance = &self.recorders.performance;
        match std::panic::catch_unwind(AssertUnwindSafe(|| performance.record(record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Performance sink error ignored: {}", e),
            Err(_) => debug!("Performance sink panicked; ignored"),
        }
    }
}

/// One call to the tool body; a panic counts as an unexpected failure
async fn execute_once(
    tool: &dyn Tool,
    params: &ToolParams,
    ctx: &InvocationContext,
) -> Result<Value, ToolFailure> {
    match AssertUnwindSafe(tool.execute(params, ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ToolFailure::Unexpected(anyhow::anyhow!(
                "tool panicked: {}",
                message
            )))
        }
    }
}

fn response_metadata(
    ctx: &InvocationContext,
    metadata: &ToolMetadata,
    duration_ms: u64,
    cache_hit: bool,
    attempts: u32,
) -> ResponseMetadata {
    ResponseMetadata {
        request_id: ctx.request_id.clone(),
        tool: metadata.name.clone(),
        category: metadata.category.clone(),
        duration_ms,
        cache_hit,
        attempts,
        mock_mode: ctx.mock_mode,
    }
}
