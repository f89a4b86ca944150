//! The update coordinator.
//!
//! [`UpdateCoordinator`] sits between callers, the resolver, the cache and
//! the subscribers. Reads are served from the cache when possible. Every
//! fetch that reaches the resolver is applied the same way:
//!
//! - success: cache the payload, notify every dependent with the value
//! - `404`: drop the cache entry, unsubscribe every dependent, notify each
//!   with `None`
//! - any other error: change nothing
//!
//! Mutations go to the resolver first and, when they succeed, refresh the
//! mutated path through the same fetch cycle.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use pathsync_cache::{ResourceCache, SubscriptionGraph};
use pathsync_core::{ClientId, Payload, ResourcePath, Resolver, Response, SharedResolver, Verb};
use tracing::{debug, instrument, trace, warn};

use crate::builder::UpdateCoordinatorBuilder;
use crate::clients::{ChannelSink, ClientRegistry, Delivery, NotificationSink, Subscriber};
use crate::config::{CoordinatorConfig, RefreshMode};
use crate::inflight::InFlight;
use crate::metrics::SyncMetrics;

/// Orchestrates resolver calls, cache mutation and subscriber fan-out.
///
/// Cloning is cheap; clones share all state.
///
/// # Example
///
/// ```rust,ignore
/// use pathsync_coordinator::{MemoryResolver, UpdateCoordinator};
/// use serde_json::json;
///
/// let coordinator = UpdateCoordinator::new(MemoryResolver::new());
/// let mut alice = coordinator.register_channel();
/// coordinator.subscribe(alice.id(), "/users/1");
///
/// coordinator.post("/users/1", json!({ "name": "Alice" })).await;
/// let update = alice.recv().await.unwrap();
/// assert_eq!(update.value.as_deref(), Some(&json!({ "name": "Alice" })));
/// ```
#[derive(Clone)]
pub struct UpdateCoordinator {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    resolver: SharedResolver,
    cache: ResourceCache,
    graph: SubscriptionGraph,
    clients: ClientRegistry,
    inflight: InFlight,
    metrics: SyncMetrics,
    config: CoordinatorConfig,
}

impl fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("cache", &self.inner.cache)
            .field("graph", &self.inner.graph)
            .field("clients", &self.inner.clients)
            .field("inflight", &self.inner.inflight)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl UpdateCoordinator {
    /// Create a coordinator with default configuration.
    pub fn new(resolver: impl Resolver) -> Self {
        Self::from_parts(Arc::new(resolver), CoordinatorConfig::default(), None)
    }

    /// Create a new coordinator builder.
    pub fn builder() -> UpdateCoordinatorBuilder {
        UpdateCoordinatorBuilder::new()
    }

    pub(crate) fn from_parts(
        resolver: SharedResolver,
        config: CoordinatorConfig,
        cache: Option<ResourceCache>,
    ) -> Self {
        let cache = cache.unwrap_or_else(|| match config.max_entries {
            Some(max) => ResourceCache::lru(max),
            None => ResourceCache::with_capacity(config.initial_capacity),
        });

        Self {
            inner: Arc::new(Inner {
                resolver,
                cache,
                graph: SubscriptionGraph::new(),
                clients: ClientRegistry::new(),
                inflight: InFlight::new(),
                metrics: SyncMetrics::new(),
                config,
            }),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Get the resource cache.
    pub fn cache(&self) -> &ResourceCache {
        &self.inner.cache
    }

    /// Get the subscription graph.
    pub fn graph(&self) -> &SubscriptionGraph {
        &self.inner.graph
    }

    /// Get the registered clients.
    pub fn clients(&self) -> &ClientRegistry {
        &self.inner.clients
    }

    /// Get the metrics.
    pub fn metrics(&self) -> &SyncMetrics {
        &self.inner.metrics
    }

    /// Number of paths with a resolver fetch in progress.
    pub fn in_flight(&self) -> usize {
        self.inner.inflight.len()
    }

    // === Reads ===

    /// Return the cached value of `path`, fetching it if it is not cached.
    ///
    /// A cache hit answers `200` without contacting the resolver.
    pub async fn get(&self, path: impl Into<ResourcePath>) -> Response {
        let path = path.into();
        if let Some(value) = self.inner.cache.get(path.as_str()) {
            self.inner.metrics.cache_hit();
            trace!(path = %path, "served from cache");
            return Response::ok(Payload::clone(&value));
        }
        self.inner.metrics.cache_miss();
        self.update(path).await
    }

    /// Fetch `path` from the resolver and propagate the outcome.
    ///
    /// With single-flight enabled, concurrent calls for the same path share
    /// one resolver call and one fan-out.
    #[instrument(level = "debug", skip_all, fields(path = tracing::field::Empty))]
    pub async fn update(&self, path: impl Into<ResourcePath>) -> Response {
        let path = path.into();
        tracing::Span::current().record("path", path.as_str());

        if !self.inner.config.single_flight {
            return self.fetch_and_apply(&path).await;
        }

        let (fetch, joined) = self
            .inner
            .inflight
            .join_or_start(&path, |generation| self.start_fetch(path.clone(), generation));
        if joined {
            self.inner.metrics.fetch_coalesced();
            debug!(path = %path, "joined fetch in progress");
        }
        fetch.await
    }

    /// Refetch `path` after a mutation.
    ///
    /// Unlike `update`, this never joins a fetch already in progress: that
    /// read may predate the mutation. The new fetch replaces it in the
    /// in-flight table, and the replaced one no longer applies its result.
    async fn refresh(&self, path: ResourcePath) -> Response {
        if !self.inner.config.single_flight {
            return self.fetch_and_apply(&path).await;
        }

        let fetch = self
            .inner
            .inflight
            .restart(&path, |generation| self.start_fetch(path.clone(), generation));
        fetch.await
    }

    async fn fetch_and_apply(&self, path: &ResourcePath) -> Response {
        let response = self.inner.resolve(Verb::Get, path, None).await;
        self.inner.apply(path, &response);
        response
    }

    // The fetch holds only a weak reference so an abandoned fetch cannot
    // keep the coordinator alive through the in-flight table.
    fn start_fetch(&self, path: ResourcePath, generation: u64) -> BoxFuture<'static, Response> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let resolver = Arc::clone(&self.inner.resolver);
        let metrics = self.inner.metrics.clone();

        async move {
            // A panic inside a shared future would poison every caller that
            // joins it, so a panicking resolver becomes a 500.
            let response = AssertUnwindSafe(resolve(&resolver, &metrics, Verb::Get, &path, None))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!(path = %path, "resolver panicked during fetch");
                    Response::error(Response::INTERNAL_ERROR)
                });

            let Some(inner) = inner.upgrade() else {
                return response;
            };
            // Leave the table before touching cache or subscribers.
            if inner.inflight.finish(&path, generation) {
                inner.apply(&path, &response);
            } else {
                debug!(path = %path, generation, "fetch superseded, result not applied");
            }
            response
        }
        .boxed()
    }

    // === Mutations ===

    /// Create `path` with `data`, then refresh it on success.
    pub async fn post(&self, path: impl Into<ResourcePath>, data: Payload) -> Response {
        self.mutate(Verb::Post, path.into(), Some(data)).await
    }

    /// Replace `path` with `data`, then refresh it on success.
    pub async fn put(&self, path: impl Into<ResourcePath>, data: Payload) -> Response {
        self.mutate(Verb::Put, path.into(), Some(data)).await
    }

    /// Partially update `path` with `data`, then refresh it on success.
    pub async fn patch(&self, path: impl Into<ResourcePath>, data: Payload) -> Response {
        self.mutate(Verb::Patch, path.into(), Some(data)).await
    }

    /// Delete `path`, then refresh it on success.
    ///
    /// The refresh is what evicts and notifies: a resolver that really
    /// deleted the resource answers the refresh with `404`.
    pub async fn delete(&self, path: impl Into<ResourcePath>) -> Response {
        self.mutate(Verb::Delete, path.into(), None).await
    }

    /// Dispatch `verb` on `path`.
    ///
    /// `Get` goes through the cache; `data` is ignored for `Get` and
    /// `Delete`.
    pub async fn execute(
        &self,
        verb: Verb,
        path: impl Into<ResourcePath>,
        data: Option<Payload>,
    ) -> Response {
        let path = path.into();
        match verb {
            Verb::Get => self.get(path).await,
            Verb::Delete => self.mutate(Verb::Delete, path, None).await,
            Verb::Post | Verb::Put | Verb::Patch => self.mutate(verb, path, data).await,
        }
    }

    #[instrument(level = "debug", skip(self, path, data), fields(path = %path))]
    async fn mutate(&self, verb: Verb, path: ResourcePath, data: Option<Payload>) -> Response {
        let response = self.inner.resolve(verb, &path, data).await;

        // A failed mutation, 404 included, leaves cache and subscribers alone.
        if response.is_error() {
            debug!(status = response.status(), "mutation failed, skipping refresh");
            return response;
        }

        match self.inner.config.refresh_mode {
            RefreshMode::Awaited => {
                let _ = self.refresh(path).await;
            }
            RefreshMode::Detached => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let this = self.clone();
                    handle.spawn(async move {
                        let _ = this.refresh(path).await;
                    });
                }
                Err(_) => {
                    warn!("no Tokio runtime for detached refresh, refreshing inline");
                    let _ = self.refresh(path).await;
                }
            },
        }
        response
    }

    /// Drop the cached value of `path` without notifying anyone.
    ///
    /// The next `get` fetches from the resolver. Returns `true` if a value
    /// was cached.
    pub fn invalidate(&self, path: &str) -> bool {
        self.inner.cache.delete(path)
    }

    // === Clients and subscriptions ===

    /// Register a notification sink and return the new client's handle.
    pub fn register(&self, sink: impl NotificationSink + 'static) -> ClientId {
        let client = ClientId::next();
        self.inner.clients.insert(client, Arc::new(sink));
        self.inner.metrics.client_registered();
        debug!(client = %client, "registered client");
        client
    }

    /// Register a closure as a client.
    pub fn register_fn<F>(&self, f: F) -> ClientId
    where
        F: Fn(&ResourcePath, Option<Arc<Payload>>) + Send + Sync + 'static,
    {
        self.register(f)
    }

    /// Register a channel-backed client and return its receiving end.
    pub fn register_channel(&self) -> Subscriber {
        let client = ClientId::next();
        let (sink, subscriber) = ChannelSink::pair(client, self.inner.config.client_buffer_size);
        self.inner.clients.insert(client, Arc::new(sink));
        self.inner.metrics.client_registered();
        debug!(client = %client, "registered channel client");
        subscriber
    }

    /// Remove every subscription and the sink of `client`.
    ///
    /// Returns `true` if the client had a registered sink.
    pub fn deregister(&self, client: ClientId) -> bool {
        self.inner.deregister(client)
    }

    /// Subscribe `client` to `path`. Idempotent.
    ///
    /// Returns `true` if a new subscription was created. A client without a
    /// registered sink (never registered, or deregistered) is not
    /// subscribed.
    pub fn subscribe(&self, client: ClientId, path: impl Into<ResourcePath>) -> bool {
        let path = path.into();
        if !self.inner.clients.contains(client) {
            trace!(client = %client, path = %path, "client not registered, not subscribing");
            return false;
        }
        self.inner.graph.subscribe(client, path)
    }

    /// Unsubscribe `client` from `path`, or from everything when `path` is
    /// `None`. Idempotent; returns the number of subscriptions removed.
    pub fn unsubscribe(&self, client: ClientId, path: Option<&str>) -> usize {
        self.inner.graph.unsubscribe(client, path)
    }

    /// Unsubscribe `client` from every path.
    pub fn unsubscribe_all(&self, client: ClientId) -> usize {
        self.inner.graph.unsubscribe(client, None)
    }
}

impl Inner {
    async fn resolve(&self, verb: Verb, path: &ResourcePath, data: Option<Payload>) -> Response {
        resolve(&self.resolver, &self.metrics, verb, path, data).await
    }

    /// Apply a fetch outcome to the cache and subscribers.
    ///
    /// Runs without suspending, so the cache write and the notifications of
    /// one fetch are never interleaved with another operation's.
    fn apply(&self, path: &ResourcePath, response: &Response) {
        if !response.is_error() {
            let value = Arc::new(response.payload().cloned().unwrap_or(Payload::Null));
            self.cache.set(path.clone(), Arc::clone(&value));
            let dependents = self.graph.dependents_of(path.as_str());
            self.fan_out(path, dependents, Some(value));
        } else if response.is_not_found() {
            let removed = self.cache.delete(path.as_str());
            let dependents = self.graph.take_dependents(path.as_str());
            self.metrics.eviction_cascade(dependents.len());
            debug!(
                path = %path,
                cached = removed,
                subscribers = dependents.len(),
                "resource not found, evicting"
            );
            self.fan_out(path, dependents, None);
        } else {
            debug!(
                path = %path,
                status = response.status(),
                "resolver error, state unchanged"
            );
        }
    }

    fn fan_out(
        &self,
        path: &ResourcePath,
        clients: impl IntoIterator<Item = ClientId>,
        value: Option<Arc<Payload>>,
    ) {
        let mut delivered = 0usize;
        let mut closed = Vec::new();

        for client in clients {
            match self.clients.deliver(client, path, value.clone()) {
                Delivery::Delivered => delivered += 1,
                Delivery::Closed => closed.push(client),
                Delivery::NoSink | Delivery::Failed => {}
            }
        }

        for client in closed {
            debug!(client = %client, "client closed, deregistering");
            self.deregister(client);
        }

        self.cache.stats().record_notifications(delivered as u64);
        self.metrics.fanned_out(delivered);
        trace!(path = %path, delivered, "fan-out complete");
    }

    fn deregister(&self, client: ClientId) -> bool {
        let edges = self.graph.unsubscribe(client, None);
        let had_sink = self.clients.remove(client);
        if had_sink {
            self.metrics.client_deregistered();
        }
        debug!(client = %client, edges, "deregistered client");
        had_sink
    }
}

async fn resolve(
    resolver: &SharedResolver,
    metrics: &SyncMetrics,
    verb: Verb,
    path: &ResourcePath,
    data: Option<Payload>,
) -> Response {
    let timer = metrics.start_resolver_call(verb);
    let response = resolver.execute(verb, path, data).await;
    timer.finish(response.status());
    trace!(verb = %verb, path = %path, status = response.status(), "resolver call");
    response
}
