//! Eviction policies for bounding the resource cache.
//!
//! The cache consults its policy on every insert, hit and removal. After an
//! insert it asks for victims until the policy is satisfied. Evicting an
//! entry only forgets the cached value: subscriptions stay in place and the
//! next `get` for the path goes back to the resolver.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use pathsync_core::ResourcePath;

/// Strategy deciding which cache entries to drop.
///
/// Methods take `&mut self`; the cache serializes calls behind a lock.
pub trait EvictionPolicy: Send + fmt::Debug {
    /// Whether the policy ever evicts anything.
    ///
    /// Unbounded policies let the cache skip policy bookkeeping entirely.
    fn is_bounded(&self) -> bool {
        true
    }

    /// A path was written (created or replaced).
    fn on_insert(&mut self, path: &ResourcePath);

    /// A path was read from the cache.
    fn on_access(&mut self, path: &ResourcePath);

    /// A path was removed from the cache for any reason.
    fn on_remove(&mut self, path: &ResourcePath);

    /// Next path to drop given the current entry count, or `None` when the
    /// cache is within bounds.
    fn victim(&mut self, len: usize) -> Option<ResourcePath>;
}

impl<P: EvictionPolicy + ?Sized> EvictionPolicy for Box<P> {
    fn is_bounded(&self) -> bool {
        (**self).is_bounded()
    }

    fn on_insert(&mut self, path: &ResourcePath) {
        (**self).on_insert(path)
    }

    fn on_access(&mut self, path: &ResourcePath) {
        (**self).on_access(path)
    }

    fn on_remove(&mut self, path: &ResourcePath) {
        (**self).on_remove(path)
    }

    fn victim(&mut self, len: usize) -> Option<ResourcePath> {
        (**self).victim(len)
    }
}

/// Keep every entry until it is deleted or invalidated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn is_bounded(&self) -> bool {
        false
    }

    fn on_insert(&mut self, _path: &ResourcePath) {}

    fn on_access(&mut self, _path: &ResourcePath) {}

    fn on_remove(&mut self, _path: &ResourcePath) {}

    fn victim(&mut self, _len: usize) -> Option<ResourcePath> {
        None
    }
}

/// Least-recently-used eviction with a fixed entry capacity.
///
/// Recency is a monotonically increasing tick; the smallest tick is the
/// least recently used path.
#[derive(Debug)]
pub struct LruPolicy {
    capacity: usize,
    tick: u64,
    /// Path to its last-use tick.
    ticks: HashMap<ResourcePath, u64>,
    /// Last-use tick to path, oldest first.
    order: BTreeMap<u64, ResourcePath>,
}

impl LruPolicy {
    /// Create an LRU policy holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            ticks: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn touch(&mut self, path: &ResourcePath) {
        self.tick += 1;
        if let Some(old) = self.ticks.insert(path.clone(), self.tick) {
            self.order.remove(&old);
        }
        self.order.insert(self.tick, path.clone());
    }
}

impl EvictionPolicy for LruPolicy {
    fn on_insert(&mut self, path: &ResourcePath) {
        self.touch(path);
    }

    fn on_access(&mut self, path: &ResourcePath) {
        // Reads racing a removal must not resurrect the path.
        if self.ticks.contains_key(path) {
            self.touch(path);
        }
    }

    fn on_remove(&mut self, path: &ResourcePath) {
        if let Some(tick) = self.ticks.remove(path) {
            self.order.remove(&tick);
        }
    }

    fn victim(&mut self, len: usize) -> Option<ResourcePath> {
        if len <= self.capacity {
            return None;
        }
        let (_, path) = self.order.pop_first()?;
        self.ticks.remove(&path);
        Some(path)
    }
}
