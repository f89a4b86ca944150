//! The user lifecycle from first read to deletion, seen by one subscriber.

use std::sync::{Arc, Mutex};

use pathsync::prelude::*;
use serde_json::json;

type Seen = Arc<Mutex<Vec<(String, Option<Payload>)>>>;

struct Fixture {
    coordinator: UpdateCoordinator,
    resolver: Arc<MemoryResolver>,
    alice: ClientId,
    seen: Seen,
}

fn fixture() -> Fixture {
    let resolver = Arc::new(MemoryResolver::new());
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));

    let seen: Seen = Arc::default();
    let log = Arc::clone(&seen);
    let alice = coordinator.register_fn(move |path, value| {
        log.lock()
            .unwrap()
            .push((path.to_string(), value.map(|v| Payload::clone(&v))));
    });

    Fixture {
        coordinator,
        resolver,
        alice,
        seen,
    }
}

fn last(seen: &Seen) -> Option<(String, Option<Payload>)> {
    seen.lock().unwrap().last().cloned()
}

#[tokio::test]
async fn subscribed_get_caches_and_notifies() {
    let f = fixture();
    f.resolver.insert("/users/1", json!({"name": "Alice"}));

    f.coordinator.subscribe(f.alice, "/users/1");
    let response = f.coordinator.get("/users/1").await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        *f.coordinator.cache().get("/users/1").unwrap(),
        json!({"name": "Alice"})
    );
    assert_eq!(
        last(&f.seen),
        Some(("/users/1".to_string(), Some(json!({"name": "Alice"}))))
    );
}

#[tokio::test]
async fn post_refreshes_and_notifies() {
    let f = fixture();
    f.resolver.insert("/users/1", json!({"name": "Alice"}));
    f.coordinator.subscribe(f.alice, "/users/1");
    f.coordinator.get("/users/1").await;

    let response = f.coordinator.post("/users/1", json!({"name": "Bob"})).await;

    assert!(!response.is_error());
    assert_eq!(
        *f.coordinator.cache().get("/users/1").unwrap(),
        json!({"name": "Bob"})
    );
    assert_eq!(
        last(&f.seen),
        Some(("/users/1".to_string(), Some(json!({"name": "Bob"}))))
    );
    assert_eq!(f.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_evicts_and_unsubscribes() {
    let f = fixture();
    f.resolver.insert("/users/1", json!({"name": "Bob"}));
    f.coordinator.subscribe(f.alice, "/users/1");
    f.coordinator.get("/users/1").await;

    let response = f.coordinator.delete("/users/1").await;

    assert!(!response.is_error());
    assert!(!f.coordinator.cache().has("/users/1"));
    assert!(!f.coordinator.graph().is_subscribed(f.alice, "/users/1"));
    assert_eq!(last(&f.seen), Some(("/users/1".to_string(), None)));

    // Nobody is subscribed any more; recreating the user is silent.
    let before = f.seen.lock().unwrap().len();
    f.coordinator.post("/users/1", json!({"name": "Carol"})).await;
    assert_eq!(f.seen.lock().unwrap().len(), before);
}

#[tokio::test]
async fn unsubscribe_everything_silences_client() {
    let f = fixture();
    f.resolver.insert("/users/1", json!(1));
    f.resolver.insert("/users/2", json!(2));
    f.coordinator.subscribe(f.alice, "/users/1");
    f.coordinator.subscribe(f.alice, "/users/2");

    assert_eq!(f.coordinator.unsubscribe(f.alice, None), 2);
    assert!(f.coordinator.graph().dependents_of("/users/1").is_empty());
    assert!(f.coordinator.graph().dependents_of("/users/2").is_empty());

    f.coordinator.update("/users/1").await;
    f.coordinator.put("/users/2", json!(22)).await;
    f.coordinator.delete("/users/1").await;

    assert!(f.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn full_lifecycle_in_order() {
    let f = fixture();
    f.coordinator.subscribe(f.alice, "/users/1");

    f.coordinator.post("/users/1", json!({"name": "Alice"})).await;
    f.coordinator.patch("/users/1", json!({"age": 30})).await;
    f.coordinator.delete("/users/1").await;

    let seen = f.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("/users/1".to_string(), Some(json!({"name": "Alice"}))),
            ("/users/1".to_string(), Some(json!({"name": "Alice", "age": 30}))),
            ("/users/1".to_string(), None),
        ]
    );
}
