// Cache store for memoized results.
// Holds JSON-encoded values with an expiry that is checked lazily on read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};

/// Default timeout for memoized results: 5 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    /// The cached data.
    pub data: T,
    /// When the data was cached.
    pub cached_at: DateTime<Utc>,
    /// First instant at which the data is no longer visible.
    pub expires_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    /// Create a new entry cached at `now` and living for `timeout`.
    pub fn new(data: T, now: DateTime<Utc>, timeout: Duration) -> Self {
        let ttl = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        Self {
            data,
            cached_at: now,
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Check if this cached data has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if this cached data is still valid at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }
}

/// Key-value store with per-entry timeouts.
///
/// Implementations must treat expired entries as absent.
pub trait CacheStore: Send + Sync {
    /// Return the stored value, or `None` on a miss or an expired entry.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key` for `timeout`, replacing any previous entry.
    fn set(&self, key: &str, value: Value, timeout: Duration);

    /// Drop the entry for `key`. Returns whether a live entry was removed.
    fn remove(&self, key: &str) -> bool;
}

/// Process-local store backed by a mutex-guarded map.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CachedData<Value>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of entries held, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedData<Value>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_valid(now) => Some(entry.data.clone()),
            Some(_) => {
                debug!(key, "dropping expired cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Expired entries are pruned on every write.
    fn set(&self, key: &str, value: Value, timeout: Duration) {
        let now = self.clock.now();
        let mut entries = self.lock();

        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, "pruned expired cache entries");
        }

        entries.insert(key.to_string(), CachedData::new(value, now, timeout));
    }

    fn remove(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.lock()
            .remove(key)
            .is_some_and(|entry| entry.is_valid(now))
    }
}

/// Read a cached value, returning `None` if it is missing, expired, or of another shape.
pub fn read_if_valid<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
            warn!(key, error = %err, "cached value does not decode, treating as a miss");
            None
        }
    }
}

/// Write a value to the store. Returns `false` when the value cannot be encoded.
pub fn write_cached<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    data: &T,
    timeout: Duration,
) -> bool {
    match serde_json::to_value(data) {
        Ok(value) => {
            store.set(key, value, timeout);
            true
        }
        Err(err) => {
            warn!(key, error = %err, "value does not encode, not caching it");
            false
        }
    }
}
