//! Backend selection and delegation

use super::{CacheBackend, HttpStore, LocalCache, NoopCache, RemoteCache};
use crate::config::{CacheBackendKind, CacheConfig};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Owns the active cache backend
///
/// The backend is chosen once: remote when it answered the startup probe,
/// otherwise local, otherwise none.
pub struct CacheManager {
    active: Arc<dyn CacheBackend>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheManager {
    fn with_backend(active: Arc<dyn CacheBackend>) -> Self {
        info!("Cache backend: {}", active.name());
        Self {
            active,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Pick the first usable backend in remote → local → none order
    pub fn select(remote: Option<RemoteCache>, local: Option<LocalCache>) -> Self {
        let active: Arc<dyn CacheBackend> = match (remote, local) {
            (Some(remote), _) if remote.is_available() => Arc::new(remote),
            (remote, Some(local)) => {
                if remote.is_some() {
                    warn!("Remote cache unavailable, falling back to local cache");
                }
                Arc::new(local)
            }
            (Some(_), None) => {
                warn!("Remote cache unavailable and no local fallback, caching disabled");
                Arc::new(NoopCache)
            }
            (None, None) => Arc::new(NoopCache),
        };
        Self::with_backend(active)
    }

    /// Build from configuration, probing the remote store if one is configured
    pub async fn from_config(config: &CacheConfig) -> Self {
        match config.backend {
            CacheBackendKind::None => Self::disabled(),
            CacheBackendKind::Local => Self::local(config.max_size),
            CacheBackendKind::Remote => {
                let timeout = Duration::from_millis(config.connect_timeout_ms);
                let remote = match config.remote_url.as_deref() {
                    Some(url) => match HttpStore::new(url, config.key_prefix.as_str(), timeout) {
                        Ok(store) => Some(RemoteCache::connect(store, timeout).await),
                        Err(e) => {
                            warn!("Could not build remote cache client: {}", e);
                            None
                        }
                    },
                    None => None,
                };
                Self::select(remote, Some(LocalCache::new(config.max_size)))
            }
        }
    }

    pub fn local(max_size: usize) -> Self {
        Self::select(None, Some(LocalCache::new(max_size)))
    }

    pub fn disabled() -> Self {
        Self::select(None, None)
    }

    /// `remote`, `local` or `none`
    pub fn backend_name(&self) -> &'static str {
        self.active.name()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let value = self.active.get(key).await;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.active.set(key, value, ttl).await;
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.active.delete(key).await
    }

    pub async fn clear(&self) {
        self.active.clear().await;
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.active.exists(key).await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}
