//! In-memory reference resolver.
//!
//! [`MemoryResolver`] is a small CRUD store for tests and demos. It answers
//! with the status codes a typical REST backend would use, so the coordinator
//! can be exercised end to end without a real backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use pathsync_core::{Payload, ResourcePath, Resolver, Response, Verb};
use tracing::trace;

/// CRUD store backed by a `DashMap`.
///
/// | verb   | present           | absent       |
/// |--------|-------------------|--------------|
/// | GET    | 200 + value       | 404          |
/// | POST   | 201 (replace)     | 201          |
/// | PUT    | 200 (replace)     | 201          |
/// | PATCH  | 200 (merge)       | 404          |
/// | DELETE | 200 + old value   | 404          |
///
/// `POST`, `PUT` and `PATCH` without data answer `400`.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    store: DashMap<ResourcePath, Payload>,
    calls: [AtomicU64; Verb::ALL.len()],
    latency: Option<Duration>,
    failure: Mutex<Option<u16>>,
}

impl MemoryResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store `value` at `path` without counting a call.
    pub fn insert(&self, path: impl Into<ResourcePath>, value: Payload) {
        self.store.insert(path.into(), value);
    }

    /// Remove `path` without counting a call.
    pub fn remove(&self, path: &str) -> Option<Payload> {
        self.store.remove(path).map(|(_, value)| value)
    }

    /// Current stored value of `path`.
    pub fn value(&self, path: &str) -> Option<Payload> {
        self.store.get(path).map(|r| r.value().clone())
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Answer every call with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<u16>) {
        *self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = status;
    }

    /// Number of calls made with `verb`.
    pub fn calls(&self, verb: Verb) -> u64 {
        self.calls[verb_index(verb)].load(Ordering::Relaxed)
    }

    /// Number of calls made with any verb.
    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    fn failure(&self) -> Option<u16> {
        *self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn apply(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response {
        match (verb, data) {
            (Verb::Get, _) => match self.value(path.as_str()) {
                Some(value) => Response::ok(value),
                None => Response::not_found(),
            },
            (Verb::Delete, _) => match self.remove(path.as_str()) {
                Some(old) => Response::ok(old),
                None => Response::not_found(),
            },
            (Verb::Post | Verb::Put | Verb::Patch, None) => Response::error(Response::BAD_REQUEST),
            (Verb::Post, Some(data)) => {
                self.store.insert(path.clone(), data.clone());
                Response::created(data)
            }
            (Verb::Put, Some(data)) => match self.store.insert(path.clone(), data.clone()) {
                Some(_) => Response::ok(data),
                None => Response::created(data),
            },
            (Verb::Patch, Some(data)) => match self.store.get_mut(path.as_str()) {
                Some(mut entry) => {
                    merge(entry.value_mut(), data);
                    Response::ok(entry.value().clone())
                }
                None => Response::not_found(),
            },
        }
    }
}

#[async_trait]
impl Resolver for MemoryResolver {
    async fn execute(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response {
        self.calls[verb_index(verb)].fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(status) = self.failure() {
            return Response::error(status);
        }

        let response = self.apply(verb, path, data);
        trace!(verb = %verb, path = %path, status = response.status(), "memory resolver");
        response
    }
}

fn verb_index(verb: Verb) -> usize {
    match verb {
        Verb::Get => 0,
        Verb::Post => 1,
        Verb::Put => 2,
        Verb::Patch => 3,
        Verb::Delete => 4,
    }
}

/// Shallow merge: object keys in `patch` overwrite those in `target`.
/// Anything other than two objects replaces `target` outright.
fn merge(target: &mut Payload, patch: Payload) {
    match (target, patch) {
        (Payload::Object(target), Payload::Object(patch)) => {
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}
