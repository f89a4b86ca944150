//! Metrics for the update coordinator.
//!
//! Every event is reported twice: to the `metrics` facade (Prometheus or any
//! other installed recorder) and to local atomic counters that tests and
//! health endpoints can read without a recorder.
//!
//! # Example
//!
//! ```rust,ignore
//! use pathsync_coordinator::metrics::SyncMetrics;
//! use pathsync_core::Verb;
//!
//! let metrics = SyncMetrics::new();
//! let timer = metrics.start_resolver_call(Verb::Get);
//! // ... call the resolver ...
//! timer.finish(200);
//! assert_eq!(metrics.resolver_calls(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use pathsync_core::Verb;

/// Metrics for the coordinator.
#[derive(Debug, Clone)]
pub struct SyncMetrics {
    inner: Arc<SyncMetricsInner>,
}

#[derive(Debug, Default)]
struct SyncMetricsInner {
    /// Resolver calls issued, all verbs.
    resolver_calls: AtomicU64,
    /// `update` calls that joined an in-flight fetch.
    coalesced_fetches: AtomicU64,
    /// 404-driven eviction cascades.
    eviction_cascades: AtomicU64,
    /// Fan-out rounds, one per applied fetch.
    fanouts: AtomicU64,
    /// Notifications delivered to sinks.
    notifications: AtomicU64,
    /// Currently registered clients.
    registered_clients: AtomicU64,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SyncMetricsInner::default()),
        }
    }

    /// Start timing a resolver call.
    pub fn start_resolver_call(&self, verb: Verb) -> ResolverTimer {
        self.inner.resolver_calls.fetch_add(1, Ordering::Relaxed);
        ResolverTimer {
            start: Instant::now(),
            verb,
        }
    }

    /// Record a cache hit served without the resolver.
    pub fn cache_hit(&self) {
        counter!("pathsync_cache_hits_total").increment(1);
    }

    /// Record a cache miss that fell through to the resolver.
    pub fn cache_miss(&self) {
        counter!("pathsync_cache_misses_total").increment(1);
    }

    /// Record an `update` that shared another caller's fetch.
    pub fn fetch_coalesced(&self) {
        self.inner.coalesced_fetches.fetch_add(1, Ordering::Relaxed);
        counter!("pathsync_fetches_coalesced_total").increment(1);
    }

    /// Record a fan-out round.
    pub fn fanned_out(&self, delivered: usize) {
        self.inner.fanouts.fetch_add(1, Ordering::Relaxed);
        self.inner
            .notifications
            .fetch_add(delivered as u64, Ordering::Relaxed);
        counter!("pathsync_fanouts_total").increment(1);
        counter!("pathsync_notifications_total").increment(delivered as u64);
    }

    /// Record an eviction cascade that removed `subscribers` edges.
    pub fn eviction_cascade(&self, subscribers: usize) {
        self.inner.eviction_cascades.fetch_add(1, Ordering::Relaxed);
        counter!("pathsync_eviction_cascades_total").increment(1);
        histogram!("pathsync_eviction_cascade_subscribers").record(subscribers as f64);
    }

    /// Record a client registration.
    pub fn client_registered(&self) {
        let count = self.inner.registered_clients.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("pathsync_registered_clients").set(count as f64);
    }

    /// Record a client deregistration.
    pub fn client_deregistered(&self) {
        let count = self
            .inner
            .registered_clients
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        gauge!("pathsync_registered_clients").set(count as f64);
    }

    /// Resolver calls issued so far.
    pub fn resolver_calls(&self) -> u64 {
        self.inner.resolver_calls.load(Ordering::Relaxed)
    }

    /// `update` calls that joined an in-flight fetch.
    pub fn coalesced_fetches(&self) -> u64 {
        self.inner.coalesced_fetches.load(Ordering::Relaxed)
    }

    /// Eviction cascades so far.
    pub fn eviction_cascades(&self) -> u64 {
        self.inner.eviction_cascades.load(Ordering::Relaxed)
    }

    /// Fan-out rounds so far, including rounds with no subscribers.
    pub fn fanouts(&self) -> u64 {
        self.inner.fanouts.load(Ordering::Relaxed)
    }

    /// Notifications delivered so far.
    pub fn notifications(&self) -> u64 {
        self.inner.notifications.load(Ordering::Relaxed)
    }

    /// Currently registered clients.
    pub fn registered_clients(&self) -> u64 {
        self.inner.registered_clients.load(Ordering::Relaxed)
    }
}

/// Timer for one resolver call.
///
/// Call [`finish`](Self::finish) with the response status once the resolver
/// returns.
#[derive(Debug)]
#[must_use = "call finish() to record the resolver latency"]
pub struct ResolverTimer {
    start: Instant,
    verb: Verb,
}

impl ResolverTimer {
    /// Finish the timer and record latency and outcome.
    pub fn finish(self, status: u16) {
        let elapsed = self.start.elapsed();
        counter!(
            "pathsync_resolver_calls_total",
            "verb" => self.verb.as_str(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!("pathsync_resolver_latency_seconds", "verb" => self.verb.as_str())
            .record(elapsed.as_secs_f64());
    }
}
