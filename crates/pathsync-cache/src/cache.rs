//! Resource cache keyed by path.
//!
//! The cache stores the last known value of each resource. Entries live
//! until they are deleted, or until the configured [`EvictionPolicy`] drops
//! them to stay within bounds.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use pathsync_core::{Payload, ResourcePath};
use tracing::{debug, trace};

use crate::eviction::{EvictionPolicy, LruPolicy, Unbounded};
use crate::stats::CacheStats;

/// Concurrent map from [`ResourcePath`] to last known value.
///
/// ## Thread Safety
///
/// Entries live in a `DashMap`, which locks per shard rather than globally.
/// Values are handed out as `Arc<Payload>` clones so no map guard outlives a
/// call. Bounded policies are driven under their own lock; a shard lock is
/// never held while that lock is acquired.
#[derive(Debug)]
pub struct ResourceCache {
    /// Cached values keyed by path.
    entries: DashMap<ResourcePath, Arc<Payload>>,
    /// Eviction policy, `None` when unbounded.
    policy: Option<Mutex<Box<dyn EvictionPolicy>>>,
    /// Statistics.
    stats: CacheStats,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create an unbounded cache with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, Unbounded)
    }

    /// Create a cache that keeps at most `max_entries`, dropping the least
    /// recently used entry first.
    pub fn lru(max_entries: usize) -> Self {
        Self::with_policy(max_entries, LruPolicy::new(max_entries))
    }

    /// Create a cache driven by a custom eviction policy.
    pub fn with_policy(capacity: usize, policy: impl EvictionPolicy + 'static) -> Self {
        let policy: Option<Mutex<Box<dyn EvictionPolicy>>> = if policy.is_bounded() {
            Some(Mutex::new(Box::new(policy)))
        } else {
            None
        };

        Self {
            entries: DashMap::with_capacity(capacity),
            policy,
            stats: CacheStats::new(),
        }
    }

    /// Get cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Whether an eviction policy bounds this cache.
    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.policy.is_some()
    }

    /// Look up the cached value for `path`.
    pub fn get(&self, path: &str) -> Option<Arc<Payload>> {
        // Clone the Arc and drop the shard guard before touching the policy.
        let entry = self
            .entries
            .get(path)
            .map(|r| (r.key().clone(), Arc::clone(r.value())));

        match entry {
            Some((key, value)) => {
                self.stats.record_hit();
                trace!(path = %key, "cache hit");
                if let Some(policy) = &self.policy {
                    lock(policy).on_access(&key);
                }
                Some(value)
            }
            None => {
                self.stats.record_miss();
                trace!(path = %path, "cache miss");
                None
            }
        }
    }

    /// Check if a value is cached for `path`.
    ///
    /// Does not count as a hit or refresh recency.
    pub fn has(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Store `value` as the last known value of `path`.
    ///
    /// Returns the previous value, if any. With a bounded policy this may
    /// evict other entries.
    pub fn set(&self, path: ResourcePath, value: impl Into<Arc<Payload>>) -> Option<Arc<Payload>> {
        let value = value.into();

        let Some(policy) = &self.policy else {
            let previous = self.entries.insert(path.clone(), value);
            self.stats.record_set();
            debug!(path = %path, "cached value");
            return previous;
        };

        let mut policy = lock(policy);
        let previous = self.entries.insert(path.clone(), value);
        self.stats.record_set();
        policy.on_insert(&path);

        while let Some(victim) = policy.victim(self.entries.len()) {
            if self.entries.remove(&victim).is_some() {
                self.stats.record_eviction();
                debug!(path = %victim, "evicted by policy");
            }
        }
        drop(policy);

        debug!(path = %path, "cached value");
        previous
    }

    /// Remove the cached value for `path`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn delete(&self, path: &str) -> bool {
        let mut policy = self.policy.as_ref().map(lock);

        match self.entries.remove(path) {
            Some((key, _)) => {
                if let Some(policy) = policy.as_mut() {
                    policy.on_remove(&key);
                }
                self.stats.record_delete();
                debug!(path = %key, "deleted cached value");
                true
            }
            None => false,
        }
    }

    /// Remove every cached value.
    pub fn clear(&self) {
        let mut policy = self.policy.as_ref().map(lock);
        let paths = self.paths();
        for path in &paths {
            if self.entries.remove(path).is_some() {
                if let Some(policy) = policy.as_mut() {
                    policy.on_remove(path);
                }
                self.stats.record_delete();
            }
        }
        debug!(count = paths.len(), "cleared cache");
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached paths.
    pub fn paths(&self) -> Vec<ResourcePath> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    /// Iterate over all cached entries.
    ///
    /// Note: This acquires read locks on all shards.
    pub fn iter(&self) -> impl Iterator<Item = (ResourcePath, Arc<Payload>)> + '_ {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
    }
}

fn lock(
    policy: &Mutex<Box<dyn EvictionPolicy>>,
) -> std::sync::MutexGuard<'_, Box<dyn EvictionPolicy>> {
    policy.lock().unwrap_or_else(PoisonError::into_inner)
}
