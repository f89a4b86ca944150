//! Load tests for the coordinator with many clients and paths.
//!
//! These tests verify the system under concurrency:
//! - 1000 subscribers on one hot path
//! - Concurrent updates across many paths
//! - Single-flight under a thundering herd
//! - Readers racing writers and evictions
//!
//! Run with: `cargo test --package integration-tests load_tests -- --nocapture`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pathsync::prelude::*;
use serde_json::json;
use tokio::sync::Barrier;

#[tokio::test]
async fn test_1000_subscribers_one_path() {
    let resolver = Arc::new(MemoryResolver::new());
    resolver.insert("/hot", json!({"v": 0}));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));

    let delivered = Arc::new(AtomicU64::new(0));
    for _ in 0..1000 {
        let delivered = Arc::clone(&delivered);
        let client = coordinator.register_fn(move |_, _| {
            delivered.fetch_add(1, Ordering::Relaxed);
        });
        coordinator.subscribe(client, "/hot");
    }

    let start = Instant::now();
    coordinator.update("/hot").await;
    println!("Fan-out to 1000 subscribers in {:?}", start.elapsed());

    assert_eq!(delivered.load(Ordering::Relaxed), 1000);
    assert_eq!(coordinator.metrics().notifications(), 1000);

    resolver.remove("/hot");
    coordinator.update("/hot").await;
    assert_eq!(delivered.load(Ordering::Relaxed), 2000);
    assert_eq!(coordinator.graph().edge_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_many_paths() {
    let resolver = Arc::new(MemoryResolver::new());
    let num_paths = 500;
    for i in 0..num_paths {
        resolver.insert(format!("/items/{i}"), json!(i));
    }
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let mut subscribers = Vec::new();
    for i in 0..num_paths {
        let subscriber = coordinator.register_channel();
        coordinator.subscribe(subscriber.id(), format!("/items/{i}"));
        subscribers.push(subscriber);
    }

    let start = Instant::now();
    let tasks: Vec<_> = (0..num_paths)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.update(format!("/items/{i}")).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().status(), 200);
    }
    println!("{} concurrent updates in {:?}", num_paths, start.elapsed());

    assert_eq!(coordinator.cache().len(), num_paths);
    for (i, mut subscriber) in subscribers.into_iter().enumerate() {
        let notification = subscriber.try_recv().unwrap();
        assert_eq!(notification.path.as_str(), format!("/items/{i}"));
        assert_eq!(notification.value.as_deref(), Some(&json!(i)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_thundering_herd_single_flight() {
    let resolver = Arc::new(MemoryResolver::new().with_latency(Duration::from_millis(100)));
    resolver.insert("/herd", json!("value"));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let subscriber = coordinator.register_channel();
    coordinator.subscribe(subscriber.id(), "/herd");

    let num_callers = 100;
    let barrier = Arc::new(Barrier::new(num_callers));
    let tasks: Vec<_> = (0..num_callers)
        .map(|_| {
            let coordinator = coordinator.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                coordinator.update("/herd").await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), Response::ok(json!("value")));
    }

    assert_eq!(resolver.calls(Verb::Get), 1);
    assert_eq!(coordinator.metrics().coalesced_fetches(), num_callers as u64 - 1);
    assert_eq!(coordinator.cache().stats().notifications_sent(), 1);
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_writers_and_deletes() {
    let resolver = Arc::new(MemoryResolver::new());
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let num_paths = 20;
    let rounds = 50;

    let mut tasks = Vec::new();
    for writer in 0..4u64 {
        let coordinator = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..rounds {
                let path = format!("/rw/{}", (writer * 7 + round) % num_paths);
                if round % 5 == 4 {
                    coordinator.delete(path).await;
                } else {
                    coordinator.put(path, json!({ "writer": writer, "round": round })).await;
                }
            }
        }));
    }
    for _ in 0..4 {
        let coordinator = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..rounds {
                let response = coordinator.get(format!("/rw/{}", round % num_paths)).await;
                assert!(matches!(response.status(), 200 | 404));
            }
        }));
    }
    for _ in 0..2 {
        let coordinator = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..rounds {
                let client = coordinator.register_fn(|_, _| {});
                coordinator.subscribe(client, format!("/rw/{}", round % num_paths));
                if round % 3 == 0 {
                    coordinator.deregister(client);
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(coordinator.graph().is_symmetric());

    // Settle every path, then the cache must agree with the backend.
    for i in 0..num_paths {
        coordinator.update(format!("/rw/{i}")).await;
    }
    for (path, value) in coordinator.cache().iter() {
        assert_eq!(resolver.value(path.as_str()), Some(Payload::clone(&value)));
    }
    for i in 0..num_paths {
        let path = format!("/rw/{i}");
        assert_eq!(resolver.value(&path).is_some(), coordinator.cache().has(&path));
    }
}

#[tokio::test]
async fn test_bounded_cache_under_churn() {
    let resolver = Arc::new(MemoryResolver::new());
    let coordinator = UpdateCoordinator::builder()
        .shared_resolver(resolver.clone())
        .max_entries(100)
        .build()
        .unwrap();

    let start = Instant::now();
    for i in 0..5000 {
        coordinator.put(format!("/churn/{i}"), json!(i)).await;
    }
    println!("5000 puts through a 100-entry cache in {:?}", start.elapsed());

    assert_eq!(coordinator.cache().len(), 100);
    assert_eq!(coordinator.cache().stats().evictions(), 4900);
    assert!(coordinator.cache().has("/churn/4999"));
    assert!(!coordinator.cache().has("/churn/0"));
}
