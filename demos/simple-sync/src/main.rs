//! Simple pathsync example
//!
//! This example walks a few resources through their lifecycle:
//! - Two clients subscribe, one through a closure and one through a channel
//! - A resource is created, patched and deleted
//! - Each subscriber prints what it receives
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p simple-sync
//! ```

use std::sync::Arc;
use std::time::Duration;

use pathsync::prelude::*;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Configuration for the example.
struct Config {
    /// Simulated resolver latency.
    latency: Duration,
    /// Number of concurrent readers in the single-flight demo.
    readers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(25),
            readers: 16,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", pathsync::version::version_string());

    let config = Config::default();
    let resolver = Arc::new(MemoryResolver::new().with_latency(config.latency));
    let coordinator = UpdateCoordinator::builder()
        .shared_resolver(resolver.clone())
        .max_entries(1_000)
        .build()?;

    // A closure client prints inline.
    let printer = coordinator.register_fn(|path, value| match value {
        Some(value) => info!(%path, %value, "printer: updated"),
        None => info!(%path, "printer: removed"),
    });
    coordinator.subscribe(printer, "/users/1");
    coordinator.subscribe(printer, "/users/2");

    // A channel client is drained by its own task.
    let mut auditor = coordinator.register_channel();
    coordinator.subscribe(auditor.id(), "/users/1");
    let audit = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(notification) = auditor.recv().await {
            received += 1;
            if notification.is_eviction() {
                info!(path = %notification.path, "auditor: removed, stopping");
                break;
            }
            info!(path = %notification.path, "auditor: updated");
        }
        received
    });

    let response = coordinator
        .post("/users/1", json!({ "name": "Alice", "role": "admin" }))
        .await;
    info!(status = response.status(), "created /users/1");

    let response = coordinator.patch("/users/1", json!({ "role": "owner" })).await;
    info!(status = response.status(), "patched /users/1");

    let response = coordinator.put("/users/2", json!({ "name": "Bob" })).await;
    info!(status = response.status(), "created /users/2");

    // Served from the cache: no resolver call.
    let before = resolver.calls(Verb::Get);
    let response = coordinator.get("/users/2").await;
    info!(
        status = response.status(),
        resolver_gets = resolver.calls(Verb::Get) - before,
        "read /users/2"
    );

    // Many readers of an uncached path share one resolver call.
    resolver.insert("/config", json!({ "theme": "dark" }));
    let before = resolver.calls(Verb::Get);
    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.update("/config").await })
        })
        .collect();
    for reader in readers {
        reader.await?;
    }
    info!(
        readers = config.readers,
        resolver_gets = resolver.calls(Verb::Get) - before,
        coalesced = coordinator.metrics().coalesced_fetches(),
        "concurrent reads of /config"
    );

    let response = coordinator.delete("/users/1").await;
    info!(status = response.status(), "deleted /users/1");

    let received = audit.await?;
    info!(received, "auditor finished");

    let stats = coordinator.cache().stats();
    info!(
        entries = coordinator.cache().len(),
        hits = stats.hits(),
        misses = stats.misses(),
        notifications = stats.notifications_sent(),
        clients = coordinator.clients().len(),
        edges = coordinator.graph().edge_count(),
        "final state"
    );

    Ok(())
}
