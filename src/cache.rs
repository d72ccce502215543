//! Result cache for loaded resources.
//!
//! Entries are keyed by resource name and carry the time they were
//! fetched. Callers pass `now` and the freshness window explicitly.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Default freshness window, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 300;

pub fn default_ttl() -> Duration {
    Duration::seconds(DEFAULT_TTL_SECS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn put(&self, key: &str, value: V, fetched_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), CacheEntry { value, fetched_at });
    }

    /// True if `key` is cached and younger than `ttl` at `now`.
    pub fn is_valid(&self, key: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.get(key)
            .is_some_and(|entry| now - entry.fetched_at < ttl)
    }

    /// The cached value if it is still fresh.
    pub fn fresh(&self, key: &str, now: DateTime<Utc>, ttl: Duration) -> Option<V> {
        self.get(key)
            .filter(|entry| now - entry.fetched_at < ttl)
            .map(|entry| entry.value)
    }
}
