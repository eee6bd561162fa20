//! Tool contract and metadata
//!
//! A tool is any unit of domain work wrapped by the execution engine. It
//! supplies static metadata (limits, retry and cache policy) and an async
//! `execute` body.

use crate::config::ToolOverride;
use crate::engine::InvocationContext;
use crate::errors::ToolFailure;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Named invocation parameters
pub type ToolParams = Map<String, Value>;

/// Static configuration of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub category: String,
    pub description: String,

    /// Named limit the tool's calls draw from
    pub rate_limit_type: String,

    /// Tokens consumed per call
    pub rate_limit_cost: f64,

    /// Total attempts for retryable failures
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry
    pub retry_base_delay: Duration,

    /// Cap on a single backoff delay
    pub retry_max_delay: Option<Duration>,

    /// Spread backoff delays by ±25%
    pub retry_jitter: bool,

    pub cache_enabled: bool,

    /// `None` uses the engine's default TTL
    pub cache_ttl: Option<Duration>,

    /// Parameters that form the cache key; `None` means all non-internal ones
    pub cache_key_params: Option<Vec<String>>,
}

impl ToolMetadata {
    /// Create metadata with default policies
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: String::new(),
            rate_limit_type: "default".to_string(),
            rate_limit_cost: 1.0,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: None,
            retry_jitter: false,
            cache_enabled: false,
            cache_ttl: None,
            cache_key_params: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rate_limit(mut self, limit_type: impl Into<String>, cost: f64) -> Self {
        self.rate_limit_type = limit_type.into();
        self.rate_limit_cost = cost;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_retry_max_delay(mut self, max_delay: Duration) -> Self {
        self.retry_max_delay = Some(max_delay);
        self
    }

    pub fn with_retry_jitter(mut self, enable: bool) -> Self {
        self.retry_jitter = enable;
        self
    }

    /// Enable result caching
    pub fn with_cache(mut self, ttl: Option<Duration>) -> Self {
        self.cache_enabled = true;
        self.cache_ttl = ttl;
        self
    }

    /// Restrict the cache key to the listed parameters
    pub fn with_cache_key_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_key_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    /// Copy of this metadata with configured overrides applied
    pub fn apply_override(&self, over: &ToolOverride) -> Self {
        let mut meta = self.clone();
        if let Some(category) = &over.category {
            meta.category = category.clone();
        }
        if let Some(limit_type) = &over.rate_limit_type {
            meta.rate_limit_type = limit_type.clone();
        }
        if let Some(cost) = over.rate_limit_cost {
            meta.rate_limit_cost = cost;
        }
        if let Some(retries) = over.max_retries {
            meta.max_retries = retries;
        }
        if let Some(ms) = over.retry_base_delay_ms {
            meta.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = over.retry_max_delay_ms {
            meta.retry_max_delay = Some(Duration::from_millis(ms));
        }
        if let Some(jitter) = over.retry_jitter {
            meta.retry_jitter = jitter;
        }
        if let Some(enabled) = over.cache_enabled {
            meta.cache_enabled = enabled;
        }
        if let Some(secs) = over.cache_ttl_secs {
            meta.cache_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(params) = &over.cache_key_params {
            meta.cache_key_params = Some(params.clone());
        }
        meta
    }
}

/// A unit of domain work
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    /// Run the domain logic once. Return `ToolFailure::Domain` for declared
    /// errors; anything else is reported as unexpected and never retried.
    async fn execute(&self, params: &ToolParams, ctx: &InvocationContext)
        -> Result<Value, ToolFailure>;
}
