//! Response cache with explicit expiry.
//!
//! Keyed by endpoint and query parameters. The caller passes the current time
//! on every call, so the cache holds no clock and no global state; it is
//! owned by whatever component performs the fetch.

use agrimarket_core::config::CacheConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Identity of one API request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Endpoint path, e.g. `beef/prices`.
    pub endpoint: String,
    /// Query parameters; sorted, so insertion order is irrelevant.
    pub params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Build a key from an endpoint and parameter pairs.
    pub fn new<I, K, V>(endpoint: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            endpoint: endpoint.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

/// Time-boxed cache of decoded responses.
#[derive(Debug, Clone)]
pub struct ResponseCache<V> {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry<V>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        let secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
        Self::new(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) < self.ttl
    }

    /// Cached value for `key` if it has not expired at `now`.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` as of `now`, replacing any previous entry.
    pub fn insert(&mut self, key: CacheKey, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CacheEntry {
                stored_at: now,
                value,
            },
        );
    }

    /// Cached value, or the loader's result which is then stored.
    ///
    /// Loader errors are returned and nothing is cached.
    pub fn get_or_insert_with<E, F>(&mut self, key: CacheKey, now: DateTime<Utc>, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key, now) {
            return Ok(value);
        }
        let value = load()?;
        self.insert(key, value.clone(), now);
        Ok(value)
    }

    /// Drop every entry expired at `now`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
