//! Result cache for tool invocations
//!
//! Backends share one contract: a miss is never an error. `CacheManager`
//! picks one active backend at construction (remote, then local, then none)
//! and delegates every call to it.

pub mod key;
pub mod local;
pub mod manager;
pub mod remote;

pub use key::derive_key;
pub use local::LocalCache;
pub use manager::{CacheManager, CacheStats};
pub use remote::{HttpStore, RemoteCache, RemoteError, RemoteStore};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Longest TTL honoured; larger values are clamped to it
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Expiry deadline for an entry written at `now`
pub fn expiry_deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_CACHE_TTL)).unwrap_or(now)
}

/// Stored value with its expiry deadline
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: expiry_deadline(Instant::now(), ttl),
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Common contract for every cache backend
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> bool;

    async fn clear(&self);

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

/// Backend that stores nothing and always misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheBackend for NoopCache {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn clear(&self) {}

    async fn exists(&self, _key: &str) -> bool {
        false
    }
}
