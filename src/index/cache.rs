//! Per-index LRU cache of search results.
//!
//! Keyed by a hash of the request's JSON encoding. The owning index clears
//! the cache on every mutation while holding its write lock, so a cached
//! page never outlives the records it was computed from.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::query::{SearchHit, SearchRequest, SearchResult};

/// Cached page with bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedQueryResult {
    pub result: SearchResult<SearchHit>,
    pub cached_at: Instant,
    pub hit_count: u64,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: Option<Mutex<LruCache<u64, CachedQueryResult>>>,
    capacity: usize,
}

impl QueryCache {
    /// A disabled config, or a zero capacity, yields a cache that stores
    /// nothing.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let entries = NonZeroUsize::new(config.capacity)
            .filter(|_| config.enabled)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));
        Self {
            capacity: if entries.is_some() { config.capacity } else { 0 },
            entries,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest per-entry hit count and age of the oldest entry, over the
    /// entries currently held.
    #[must_use]
    pub fn entry_summary(&self) -> (u64, Duration) {
        let Some(entries) = &self.entries else {
            return (0, Duration::ZERO);
        };
        entries
            .lock()
            .iter()
            .fold((0, Duration::ZERO), |(hits, age), (_, entry)| {
                (hits.max(entry.hit_count), age.max(entry.cached_at.elapsed()))
            })
    }

    /// Hash key for a request; `None` when caching is off.
    #[must_use]
    pub fn key(&self, request: &SearchRequest) -> Option<u64> {
        self.entries.as_ref()?;
        let encoded = serde_json::to_string(request).ok()?;
        let mut hasher = DefaultHasher::new();
        encoded.hash(&mut hasher);
        Some(hasher.finish())
    }

    pub fn get(&self, key: u64) -> Option<SearchResult<SearchHit>> {
        let mut entries = self.entries.as_ref()?.lock();
        let entry = entries.get_mut(&key)?;
        entry.hit_count += 1;
        Some(entry.result.clone())
    }

    pub fn put(&self, key: u64, result: SearchResult<SearchHit>) {
        if let Some(entries) = &self.entries {
            entries.lock().put(
                key,
                CachedQueryResult {
                    result,
                    cached_at: Instant::now(),
                    hit_count: 0,
                },
            );
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }
}
