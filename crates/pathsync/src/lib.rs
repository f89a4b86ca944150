//! # pathsync
//!
//! Keep a local cache of path-addressed resources coherent with a resolver
//! and push every change to the clients subscribed to it.
//!
//! A path like `/users/42` names a resource. Clients subscribe to paths.
//! Reads are served from the cache; mutations go to the resolver, then the
//! mutated path is refetched and every subscriber receives the fresh value.
//! When the resolver reports a path as gone (`404`), its cache entry and all
//! of its subscriptions are dropped and each former subscriber is told so.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pathsync::prelude::*;
//! use serde_json::json;
//!
//! let coordinator = UpdateCoordinator::builder()
//!     .resolver(MemoryResolver::new())
//!     .build()?;
//!
//! let alice = coordinator.register_fn(|path, value| {
//!     println!("{path} -> {value:?}");
//! });
//! coordinator.subscribe(alice, "/users/42");
//!
//! coordinator.post("/users/42", json!({ "name": "Alice" })).await;
//! ```
//!
//! ## Architecture
//!
//! This library is organized into several crates:
//!
//! - `pathsync-core` - Paths, verbs, responses, the `Resolver` trait and errors
//! - `pathsync-cache` - Resource cache, eviction policies and subscription graph
//! - `pathsync-coordinator` - The update coordinator and notification sinks
//!
//! This crate (`pathsync`) re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **No panics in library code** - Errors are statuses or `Result`s
//! 2. **No locks held across await points** - Resolver calls are the only suspension
//! 3. **Pluggable seams** - Resolvers, notification sinks and eviction policies are traits
//! 4. **Observable** - `tracing` spans and `metrics` counters throughout

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export all sub-crates
pub use pathsync_cache as cache;
pub use pathsync_coordinator as coordinator;
pub use pathsync_core as core;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pathsync::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use pathsync_core::{
        ClientId, Payload, ResourcePath, Resolver, Response, SharedResolver, SyncError,
        SyncResult, Verb,
    };

    // Cache types
    pub use pathsync_cache::{
        CacheStats, EvictionPolicy, LruPolicy, ResourceCache, SubscriptionGraph, Unbounded,
    };

    // Coordinator types
    pub use pathsync_coordinator::{
        ChannelSink, CoordinatorConfig, MemoryResolver, Notification, NotificationSink,
        RefreshMode, Subscriber, SyncMetrics, UpdateCoordinator, UpdateCoordinatorBuilder,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("pathsync {} (MSRV {})", VERSION, MSRV)
    }
}
