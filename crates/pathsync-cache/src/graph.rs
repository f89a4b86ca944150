//! Subscription graph between clients and resource paths.
//!
//! The graph is a bidirectional index: for every edge `(client, path)` the
//! client is recorded as a dependent of the path and the path as a
//! subscription of the client. Both directions live behind one lock, so a
//! reader never observes one half of an edge without the other.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pathsync_core::{ClientId, ResourcePath};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct Edges {
    /// Path to the clients subscribed to it.
    dependents: HashMap<ResourcePath, HashSet<ClientId>>,
    /// Client to the paths it is subscribed to.
    subscriptions: HashMap<ClientId, HashSet<ResourcePath>>,
}

impl Edges {
    fn remove_edge(&mut self, client: ClientId, path: &str) -> bool {
        let Some(clients) = self.dependents.get_mut(path) else {
            return false;
        };
        if !clients.remove(&client) {
            return false;
        }
        if clients.is_empty() {
            self.dependents.remove(path);
        }

        if let Some(paths) = self.subscriptions.get_mut(&client) {
            paths.remove(path);
            if paths.is_empty() {
                self.subscriptions.remove(&client);
            }
        }
        true
    }
}

/// Many-to-many index of subscriptions.
///
/// Every operation is idempotent and infallible: subscribing twice leaves
/// one edge, and removing an edge that does not exist is a no-op.
///
/// # Example
///
/// ```rust
/// use pathsync_cache::SubscriptionGraph;
/// use pathsync_core::ClientId;
///
/// let graph = SubscriptionGraph::new();
/// let client = ClientId::next();
///
/// graph.subscribe(client, "/users/1".into());
/// assert!(graph.dependents_of("/users/1").contains(&client));
/// assert!(graph.subscriptions_of(client).contains("/users/1"));
///
/// graph.unsubscribe(client, None);
/// assert!(graph.dependents_of("/users/1").is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionGraph {
    edges: Mutex<Edges>,
}

impl SubscriptionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // Lock is held briefly, no I/O and no callbacks.
    fn edges(&self) -> MutexGuard<'_, Edges> {
        self.edges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `client` depends on `path`.
    ///
    /// Returns `true` if the edge was newly created.
    pub fn subscribe(&self, client: ClientId, path: ResourcePath) -> bool {
        let mut edges = self.edges();
        let created = edges
            .dependents
            .entry(path.clone())
            .or_default()
            .insert(client);
        if created {
            edges.subscriptions.entry(client).or_default().insert(path.clone());
            debug!(client = %client, path = %path, "subscribed");
        } else {
            trace!(client = %client, path = %path, "already subscribed");
        }
        created
    }

    /// Remove the edge `(client, path)`, or every edge of `client` when
    /// `path` is `None`.
    ///
    /// Returns the number of edges removed.
    pub fn unsubscribe(&self, client: ClientId, path: Option<&str>) -> usize {
        let mut edges = self.edges();
        let removed = match path {
            Some(path) => usize::from(edges.remove_edge(client, path)),
            None => {
                let paths = edges.subscriptions.remove(&client).unwrap_or_default();
                for path in &paths {
                    if let Some(clients) = edges.dependents.get_mut(path) {
                        clients.remove(&client);
                        if clients.is_empty() {
                            edges.dependents.remove(path);
                        }
                    }
                }
                paths.len()
            }
        };
        drop(edges);

        if removed > 0 {
            debug!(client = %client, path = ?path, removed, "unsubscribed");
        }
        removed
    }

    /// Remove every edge incident to `path` and return the clients that were
    /// subscribed.
    ///
    /// The removal is atomic: no client can be observed as still subscribed
    /// once this returns.
    pub fn take_dependents(&self, path: &str) -> HashSet<ClientId> {
        let mut edges = self.edges();
        let clients = edges.dependents.remove(path).unwrap_or_default();
        for client in &clients {
            if let Some(paths) = edges.subscriptions.get_mut(client) {
                paths.remove(path);
                if paths.is_empty() {
                    edges.subscriptions.remove(client);
                }
            }
        }
        clients
    }

    /// Clients subscribed to `path`.
    pub fn dependents_of(&self, path: &str) -> HashSet<ClientId> {
        self.edges().dependents.get(path).cloned().unwrap_or_default()
    }

    /// Paths `client` is subscribed to.
    pub fn subscriptions_of(&self, client: ClientId) -> HashSet<ResourcePath> {
        self.edges()
            .subscriptions
            .get(&client)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the edge `(client, path)` exists.
    pub fn is_subscribed(&self, client: ClientId, path: &str) -> bool {
        self.edges()
            .dependents
            .get(path)
            .is_some_and(|clients| clients.contains(&client))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges().dependents.values().map(HashSet::len).sum()
    }

    /// Number of paths with at least one subscriber.
    pub fn path_count(&self) -> usize {
        self.edges().dependents.len()
    }

    /// Number of clients with at least one subscription.
    pub fn client_count(&self) -> usize {
        self.edges().subscriptions.len()
    }

    /// Check that both directions of the index agree.
    ///
    /// Used by tests; cheap enough for debug assertions on small graphs.
    pub fn is_symmetric(&self) -> bool {
        let edges = self.edges();
        let forward = edges.dependents.iter().all(|(path, clients)| {
            !clients.is_empty()
                && clients.iter().all(|client| {
                    edges
                        .subscriptions
                        .get(client)
                        .is_some_and(|paths| paths.contains(path))
                })
        });
        let backward = edges.subscriptions.iter().all(|(client, paths)| {
            !paths.is_empty()
                && paths.iter().all(|path| {
                    edges
                        .dependents
                        .get(path)
                        .is_some_and(|clients| clients.contains(client))
                })
        });
        forward && backward
    }
}
