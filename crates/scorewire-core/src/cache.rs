//! In-memory cache of the last good result per dataset.
//!
//! Expiry is advisory: an entry past its TTL is a miss for [`DatasetCache::get`]
//! but stays readable through [`DatasetCache::get_stale`] until the next
//! `set` replaces it or `clear` removes it. Entries are always replaced
//! wholesale, never edited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::{DatasetResult, UtcDateTime};

/// Process-wide default TTL: 30 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: DatasetResult,
    stored_at: UtcDateTime,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: UtcDateTime) -> bool {
        now.elapsed_since(self.stored_at) <= self.ttl
    }
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn get(&self, key: &str, now: UtcDateTime) -> Option<DatasetResult> {
        self.map
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.data.clone())
    }

    fn get_stale(&self, key: &str) -> Option<DatasetResult> {
        self.map.get(key).map(|entry| entry.data.clone())
    }

    fn set(&mut self, key: String, data: DatasetResult, ttl_override: Option<Duration>, now: UtcDateTime) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        self.map.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
                ttl,
            },
        );
    }

    fn clear(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.map.remove(key);
            }
            None => self.map.clear(),
        }
    }
}

/// Thread-safe dataset cache. Clones share the same store.
#[derive(Debug, Clone)]
pub struct DatasetCache {
    inner: Arc<RwLock<CacheInner>>,
    clock: Arc<dyn Clock>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl DatasetCache {
    /// Create a cache with the given default TTL on the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new(default_ttl))),
            clock,
        }
    }

    /// Store `data` under `key`, replacing any previous entry.
    ///
    /// `ttl_override` applies to this entry only; otherwise the default TTL
    /// is used.
    pub async fn set(&self, key: impl Into<String>, data: DatasetResult, ttl_override: Option<Duration>) {
        let mut store = self.inner.write().await;
        // Stamped under the lock so the last writer holds the latest time.
        let now = self.clock.now();
        store.set(key.into(), data, ttl_override, now);
    }

    /// The stored data if it is within its TTL.
    ///
    /// Returns `None` if:
    /// - No entry exists for the key
    /// - The entry is older than its TTL (it is kept for `get_stale`)
    pub async fn get(&self, key: &str) -> Option<DatasetResult> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.get(key, now)
    }

    /// The stored data regardless of age. Last-resort read when live
    /// acquisition failed.
    pub async fn get_stale(&self, key: &str) -> Option<DatasetResult> {
        let store = self.inner.read().await;
        store.get_stale(key)
    }

    /// Remove one entry, or every entry when `key` is `None`.
    pub async fn clear(&self, key: Option<&str>) {
        let mut store = self.inner.write().await;
        store.clear(key);
    }

    /// How long ago the entry for `key` was stored.
    pub async fn entry_age(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store
            .map
            .get(key)
            .map(|entry| now.elapsed_since(entry.stored_at))
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.map.is_empty()
    }

    pub async fn default_ttl(&self) -> Duration {
        self.inner.read().await.default_ttl
    }
}
