//! # pathsync-cache
//!
//! In-memory state for pathsync: last known resource values and the
//! subscription graph between clients and paths.
//!
//! - [`ResourceCache`] - DashMap-based concurrent map from path to value
//! - [`SubscriptionGraph`] - Bidirectional client/path subscription index
//! - [`EvictionPolicy`] - Pluggable bound on cache size ([`Unbounded`], [`LruPolicy`])
//! - [`CacheStats`] - Lock-free counters for monitoring
//!
//! ## Key Design Decisions
//!
//! - Values are stored as `Arc<Payload>` so fan-out never copies a payload
//! - No `DashMap` reference is held across an `.await` or a policy call
//! - Both directions of a subscription edge change under one lock
//! - The cache is unbounded unless a policy says otherwise
//!
//! ## Example
//!
//! ```rust
//! use pathsync_cache::{ResourceCache, SubscriptionGraph};
//! use pathsync_core::ClientId;
//! use serde_json::json;
//!
//! let cache = ResourceCache::new();
//! cache.set("/users/1".into(), json!({ "name": "Alice" }));
//! assert!(cache.has("/users/1"));
//!
//! let graph = SubscriptionGraph::new();
//! let client = ClientId::next();
//! graph.subscribe(client, "/users/1".into());
//! assert_eq!(graph.edge_count(), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod eviction;
mod graph;
mod stats;

pub use cache::ResourceCache;
pub use eviction::{EvictionPolicy, LruPolicy, Unbounded};
pub use graph::SubscriptionGraph;
pub use stats::CacheStats;
