//! Result caching for validation runs.
//!
//! Caches whole validation results so re-validating an unchanged value skips
//! rule execution. Entries are not invalidated when the rule set changes;
//! the engine's owner must clear the cache after mutating rules.

use crate::core::types::Value;
use crate::validation::ValidationResult;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// A cache key combining the value with an optional explicit rule list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Stringified value.
    pub value: String,
    /// Type name of the value, so `1` and `"1"` do not collide.
    pub type_name: &'static str,
    /// Explicit rule subset, if one was requested.
    pub rule_names: Option<Vec<String>>,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(value: &Value, rule_names: Option<&[&str]>) -> Self {
        Self {
            value: value.to_string(),
            type_name: value.type_name(),
            rule_names: rule_names.map(|names| names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

/// Cached entry with metadata.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: ValidationResult,
    computation_time: Duration,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted.
    pub evictions: u64,
    /// Total time saved by cache hits.
    pub time_saved: Duration,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Bounded LRU cache of validation results.
#[derive(Debug)]
pub struct ResultCache {
    cache: LruCache<CacheKey, CacheEntry>,
    stats: CacheStats,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results.
    ///
    /// A zero capacity falls back to [`DEFAULT_CACHE_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Get a cached result.
    pub fn get(&mut self, key: &CacheKey) -> Option<ValidationResult> {
        match self.cache.get(key) {
            Some(entry) => {
                self.stats.hits += 1;
                self.stats.time_saved += entry.computation_time;
                Some(entry.result.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a result in the cache.
    pub fn put(&mut self, key: CacheKey, result: ValidationResult) {
        let entry = CacheEntry {
            computation_time: result.duration,
            result,
        };
        if let Some((evicted, _)) = self.cache.push(key.clone(), entry) {
            if evicted != key {
                self.stats.evictions += 1;
            }
        }
    }

    /// Clear the entire cache.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Reset statistics, keeping entries.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
