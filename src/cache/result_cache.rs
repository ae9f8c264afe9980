//! TTL-bounded result cache (in-memory).
//!
//! Keyed by the query [`Fingerprint`]. Expiry is checked against the insertion time on
//! every lookup and a stale entry is dropped on the spot, so no background sweep runs.
//! Capacity eviction is left to moka.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::time::Instant;
use tracing::debug;

use super::types::CacheStatus;
use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS};
use crate::hashing::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheLookup<V> {
    value: V,
    age: Duration,
}

impl<V> CacheLookup<V> {
    #[inline]
    pub fn status(&self) -> CacheStatus {
        CacheStatus::Hit
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Time since the entry was written.
    #[inline]
    pub fn age(&self) -> Duration {
        self.age
    }
}

/// Fingerprint → value map whose entries expire `ttl` after insertion.
pub struct ResultCache<V> {
    entries: Cache<Fingerprint, CacheEntry<V>>,
    ttl: Duration,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Cache::builder().max_capacity(config.max_capacity).build(),
            ttl: config.ttl,
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the entry if it is younger than the TTL. An expired entry is removed and
    /// reported as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheLookup<V>> {
        let entry = self.entries.get(fingerprint)?;
        let age = entry.inserted_at.elapsed();

        if age >= self.ttl {
            // A put racing with this invalidate only costs one extra miss.
            self.entries.invalidate(fingerprint);
            debug!(
                fingerprint = %fingerprint,
                age_ms = age.as_millis() as u64,
                "Evicted stale cache entry"
            );
            return None;
        }

        Some(CacheLookup {
            value: entry.value,
            age,
        })
    }

    /// Stores `value`, replacing any previous entry and restarting its TTL.
    pub fn put(&self, fingerprint: Fingerprint, value: V) {
        self.entries.insert(
            fingerprint,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.entries.remove(fingerprint).map(|entry| entry.value)
    }

    /// Returns `true` if a live entry exists.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries
            .get(fingerprint)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl)
    }

    /// Approximate number of stored entries, stale ones included until looked up.
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Runs any pending maintenance tasks in the underlying cache.
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Shared handle to a [`ResultCache`].
pub struct ResultCacheHandle<V> {
    inner: Arc<ResultCache<V>>,
}

impl<V> Clone for ResultCacheHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> ResultCacheHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(ResultCache::new(config)),
        }
    }

    #[inline]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheLookup<V>> {
        self.inner.get(fingerprint)
    }

    #[inline]
    pub fn put(&self, fingerprint: Fingerprint, value: V) {
        self.inner.put(fingerprint, value)
    }

    #[inline]
    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.inner.remove(fingerprint)
    }

    #[inline]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.contains(fingerprint)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn clear(&self) {
        self.inner.clear();
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl()
    }

    #[inline]
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }

    /// Returns the number of strong references to the underlying cache.
    #[inline]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<V> Default for ResultCacheHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V> std::fmt::Debug for ResultCacheHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCacheHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}
