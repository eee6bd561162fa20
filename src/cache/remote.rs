//! Best-effort remote cache backend
//!
//! `RemoteStore` is the narrow key/value interface to an external service;
//! its calls report failures explicitly. `RemoteCache` wraps a store,
//! bounds every call by a short timeout and turns each failure into a miss
//! or a no-op at the `CacheBackend` boundary.
//!
//! Availability is probed once, at construction. A store that goes away
//! later degrades every call to a miss until the process restarts.

use super::CacheBackend;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound for any single remote call
pub const MAX_REMOTE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote store unavailable")]
    Unavailable,

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote store returned status {0}")]
    Status(u16),

    #[error("remote transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote value could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal external key/value store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Connectivity check
    async fn ping(&self) -> Result<(), RemoteError>;

    async fn get(&self, key: &str) -> Result<Option<String>, RemoteError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), RemoteError>;

    async fn delete(&self, key: &str) -> Result<bool, RemoteError>;

    async fn clear(&self) -> Result<(), RemoteError>;
}

/// `RemoteStore` over a plain HTTP key/value API
///
/// - `GET {base}/health` for the probe
/// - `GET|PUT|DELETE {base}/keys/{prefix}{key}`, TTL as `?ttl=<secs>`
/// - `DELETE {base}/keys?prefix={prefix}` to clear
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    prefix: String,
}

impl HttpStore {
    pub fn new(
        base_url: impl Into<String>,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let timeout = timeout.min(MAX_REMOTE_TIMEOUT);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefix: prefix.into(),
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/keys/{}{}", self.base_url, self.prefix, key)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn ping(&self) -> Result<(), RemoteError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status(response.status().as_u16()))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RemoteError> {
        let response = self.client.get(self.key_url(key)).send().await?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(RemoteError::Status(status.as_u16())),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.key_url(key))
            .query(&[("ttl", ttl.as_secs())])
            .body(value)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status(response.status().as_u16()))
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, RemoteError> {
        let response = self.client.delete(self.key_url(key)).send().await?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(RemoteError::Status(status.as_u16())),
        }
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(format!("{}/keys", self.base_url))
            .query(&[("prefix", self.prefix.as_str())])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status(response.status().as_u16()))
        }
    }
}

/// Cache backend over a `RemoteStore`
pub struct RemoteCache {
    store: Box<dyn RemoteStore>,
    timeout: Duration,
    available: bool,
}

impl RemoteCache {
    /// Wrap `store` and probe it once
    pub async fn connect(store: impl RemoteStore + 'static, timeout: Duration) -> Self {
        let timeout = timeout.min(MAX_REMOTE_TIMEOUT);
        let available = match tokio::time::timeout(timeout, store.ping()).await {
            Ok(Ok(())) => {
                info!("Remote cache reachable");
                true
            }
            Ok(Err(e)) => {
                warn!("Remote cache probe failed: {}", e);
                false
            }
            Err(_) => {
                warn!("Remote cache probe timed out after {:?}", timeout);
                false
            }
        };
        Self {
            store: Box::new(store),
            timeout,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>> + Send,
    {
        if !self.available {
            return Err(RemoteError::Unavailable);
        }
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RemoteError::Timeout(self.timeout))?
    }

    pub async fn try_get(&self, key: &str) -> Result<Option<Value>, RemoteError> {
        match self.guarded(self.store.get(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn try_set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), RemoteError> {
        let raw = serde_json::to_string(value)?;
        self.guarded(self.store.set(key, raw, ttl)).await
    }

    pub async fn try_delete(&self, key: &str) -> Result<bool, RemoteError> {
        self.guarded(self.store.delete(key)).await
    }

    pub async fn try_clear(&self) -> Result<(), RemoteError> {
        self.guarded(self.store.clear()).await
    }
}

#[async_trait]
impl CacheBackend for RemoteCache {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.try_get(key).await.unwrap_or_else(|e| {
            debug!("Remote cache get degraded to miss: {}", e);
            None
        })
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        if let Err(e) = self.try_set(key, &value, ttl).await {
            debug!("Remote cache set skipped: {}", e);
        }
    }

    async fn delete(&self, key: &str) -> bool {
        self.try_delete(key).await.unwrap_or_else(|e| {
            debug!("Remote cache delete skipped: {}", e);
            false
        })
    }

    async fn clear(&self) {
        if let Err(e) = self.try_clear().await {
            debug!("Remote cache clear skipped: {}", e);
        }
    }
}
