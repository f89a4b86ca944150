//! # pathsync-coordinator
//!
//! The update coordinator for pathsync.
//!
//! This crate ties the resolver, the cache and the subscription graph
//! together:
//!
//! - [`UpdateCoordinator`] - Reads through the cache, refreshes after mutations
//! - [`UpdateCoordinatorBuilder`] - Builder for configuring the coordinator
//! - [`NotificationSink`] - Where a client's notifications go (closures, channels)
//! - [`MemoryResolver`] - In-memory CRUD resolver for tests and demos
//! - Single-flight fetches so concurrent updates of a path share one call
//! - `metrics` counters and histograms for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use pathsync_coordinator::{MemoryResolver, UpdateCoordinator};
//! use serde_json::json;
//!
//! let coordinator = UpdateCoordinator::builder()
//!     .resolver(MemoryResolver::new())
//!     .build()?;
//!
//! let mut bob = coordinator.register_channel();
//! coordinator.subscribe(bob.id(), "/todos/7");
//!
//! coordinator.put("/todos/7", json!({ "done": false })).await;
//! coordinator.delete("/todos/7").await;
//!
//! // One update, then one eviction.
//! assert!(!bob.recv().await.unwrap().is_eviction());
//! assert!(bob.recv().await.unwrap().is_eviction());
//! ```
//!
//! ## Notification Semantics
//!
//! Every resolver fetch that succeeds notifies each subscriber of the path
//! exactly once with the new value. A `404` removes the cache entry,
//! unsubscribes every subscriber of the path and notifies each with `None`.
//! Any other failure changes nothing.
//!
//! ## Metrics
//!
//! The coordinator records through the `metrics` facade; install any
//! recorder (Prometheus exporter, etc.) to collect:
//!
//! - `pathsync_resolver_calls_total{verb, status}`
//! - `pathsync_resolver_latency_seconds{verb}`
//! - `pathsync_cache_hits_total`, `pathsync_cache_misses_total`
//! - `pathsync_fetches_coalesced_total`
//! - `pathsync_fanouts_total`, `pathsync_notifications_total`
//! - `pathsync_eviction_cascades_total`, `pathsync_eviction_cascade_subscribers`
//! - `pathsync_registered_clients`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod clients;
mod config;
mod coordinator;
mod inflight;
pub mod memory;
pub mod metrics;

pub use builder::UpdateCoordinatorBuilder;
pub use clients::{ChannelSink, ClientRegistry, Notification, NotificationSink, Subscriber};
pub use config::{CoordinatorConfig, RefreshMode};
pub use coordinator::UpdateCoordinator;
pub use memory::MemoryResolver;
pub use metrics::SyncMetrics;
