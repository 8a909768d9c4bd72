//! Response cache with read-time staleness.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

/// Default number of entries kept before the oldest is evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// Short-lived memoization of successful API responses.
///
/// Values are stored as JSON so one cache can hold every response type.
/// Freshness is decided by the reader: `get` takes the staleness window, and
/// an entry older than that window is evicted on the spot. The cache is
/// bounded; inserting past `max_entries` evicts the oldest entry.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<RwLock<ResponseCacheInner>>,
}

struct ResponseCacheInner {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
}

struct CacheEntry {
    data: serde_json::Value,
    stored_at: Instant,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.len())
            .finish()
    }
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ResponseCacheInner {
                entries: HashMap::new(),
                max_entries: max_entries.max(1),
            })),
        }
    }

    /// Cached value for `key` if it is at most `stale_time` old.
    ///
    /// Stale entries are removed, so a later call with a longer window does
    /// not bring them back.
    pub fn get<T: DeserializeOwned>(&self, key: &str, stale_time: Duration) -> Option<T> {
        let mut inner = self.write();
        let entry = inner.entries.get(key)?;
        if entry.stored_at.elapsed() > stale_time {
            inner.entries.remove(key);
            tracing::debug!(key, "Cache entry expired");
            return None;
        }
        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, error = %error, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Store `data` under `key`, replacing any previous value.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(key, error = %error, "Value not cacheable");
                return;
            }
        };

        let mut inner = self.write();
        if !inner.entries.contains_key(key) && inner.entries.len() >= inner.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove everything, or only keys containing `pattern` (plain substring match).
    pub fn invalidate(&self, pattern: Option<&str>) {
        let mut inner = self.write();
        match pattern {
            None => inner.entries.clear(),
            Some(pattern) => inner.entries.retain(|key, _| !key.contains(pattern)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResponseCacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
