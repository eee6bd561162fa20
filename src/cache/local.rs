//! Bounded in-process cache with TTL expiry
//!
//! Expired entries are removed lazily on read, and in bulk when an insert
//! finds the cache full. If purging is not enough, the entries closest to
//! expiry are evicted first.

use super::{expiry_deadline, CacheBackend, CacheEntry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default capacity
pub const DEFAULT_MAX_SIZE: usize = 1000;

pub struct LocalCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_size: usize,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl LocalCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        Self::purge_locked(&mut entries, Instant::now())
    }

    fn purge_locked(entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    fn evict_soonest_expiring(entries: &mut HashMap<String, CacheEntry>, count: usize) {
        let mut by_expiry: Vec<(Instant, String)> = entries
            .values()
            .map(|entry| (entry.expires_at, entry.key.clone()))
            .collect();
        by_expiry.sort();
        for (_, key) in by_expiry.into_iter().take(count) {
            entries.remove(&key);
        }
    }

    pub fn get_entry(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set_entry(&self, key: &str, value: Value, ttl: Duration) {
        if self.max_size == 0 {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains_key(key) && entries.len() >= self.max_size {
            let purged = Self::purge_locked(&mut entries, now);
            if entries.len() >= self.max_size {
                let overflow = entries.len() + 1 - self.max_size;
                Self::evict_soonest_expiring(&mut entries, overflow);
                debug!(purged, evicted = overflow, "Local cache at capacity");
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value,
                expires_at: expiry_deadline(now, ttl),
            },
        );
    }

    pub fn delete_entry(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear_all(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl CacheBackend for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.get_entry(key)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.set_entry(key, value, ttl);
    }

    async fn delete(&self, key: &str) -> bool {
        self.delete_entry(key)
    }

    async fn clear(&self) {
        self.clear_all();
    }
}
