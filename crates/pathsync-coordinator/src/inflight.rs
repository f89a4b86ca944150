//! Single-flight table of fetches in progress.
//!
//! Concurrent `update`s of one path share the first caller's fetch instead
//! of each issuing a resolver call. Every fetch gets a generation number.
//! A refresh after a mutation must not reuse a read that began before the
//! write, so it always starts a new generation that replaces the table
//! entry. The replaced fetch still answers its own callers but is no longer
//! current, and its result is not applied.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use pathsync_core::{ResourcePath, Response};

/// A fetch that any number of callers can await.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Response>>;

struct Slot {
    generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
pub(crate) struct InFlight {
    fetches: DashMap<ResourcePath, Slot>,
    generation: AtomicU64,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Join the fetch in progress for `path`, or start one with `start`.
    ///
    /// `start` receives the new fetch's generation; it only builds the
    /// future, which is not polled under the shard lock. Returns the shared
    /// fetch and whether an existing one was joined.
    pub(crate) fn join_or_start<F>(&self, path: &ResourcePath, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce(u64) -> BoxFuture<'static, Response>,
    {
        match self.fetches.entry(path.clone()) {
            Entry::Occupied(entry) => (entry.get().fetch.clone(), true),
            Entry::Vacant(entry) => {
                let generation = self.next_generation();
                let fetch = start(generation).shared();
                entry.insert(Slot {
                    generation,
                    fetch: fetch.clone(),
                });
                (fetch, false)
            }
        }
    }

    /// Start a new fetch for `path` that replaces any fetch in progress.
    ///
    /// Later `join_or_start` calls join the new fetch. The replaced one
    /// keeps running for the callers already awaiting it.
    pub(crate) fn restart<F>(&self, path: &ResourcePath, start: F) -> SharedFetch
    where
        F: FnOnce(u64) -> BoxFuture<'static, Response>,
    {
        let generation = self.next_generation();
        let fetch = start(generation).shared();
        let replaced = self.fetches.insert(
            path.clone(),
            Slot {
                generation,
                fetch: fetch.clone(),
            },
        );
        // Dropped outside the shard lock.
        drop(replaced);
        fetch
    }

    /// Leave the table once the resolver has answered.
    ///
    /// Returns `true` if `generation` was still the current fetch for
    /// `path`. A fetch only ever removes its own entry, so `false` means a
    /// newer fetch replaced it.
    pub(crate) fn finish(&self, path: &ResourcePath, generation: u64) -> bool {
        self.fetches
            .remove_if(path, |_, slot| slot.generation == generation)
            .is_some()
    }

    /// Number of paths with a fetch in progress.
    pub(crate) fn len(&self) -> usize {
        self.fetches.len()
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("paths", &self.fetches.len())
            .finish()
    }
}
