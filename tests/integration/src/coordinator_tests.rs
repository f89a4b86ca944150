//! Coordinator behavior against custom resolvers and sinks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pathsync::prelude::*;
use proptest::prelude::*;
use serde_json::json;

/// Resolver that answers from a script, then with 503.
#[derive(Default)]
struct ScriptedResolver {
    script: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<(Verb, String)>>,
}

impl ScriptedResolver {
    fn new(responses: impl IntoIterator<Item = Response>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<(Verb, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn execute(&self, verb: Verb, path: &ResourcePath, _data: Option<Payload>) -> Response {
        self.calls.lock().unwrap().push((verb, path.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Response::error(Response::UNAVAILABLE))
    }
}

fn counting_client(coordinator: &UpdateCoordinator) -> (ClientId, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let client = coordinator.register_fn(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (client, count)
}

#[tokio::test]
async fn mutation_refresh_uses_get() {
    let resolver = Arc::new(ScriptedResolver::new([
        Response::created(json!({"id": 1})),
        Response::ok(json!({"id": 1, "server": true})),
    ]));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));

    let response = coordinator.post("/items/1", json!({"id": 1})).await;

    // The caller sees the mutation's own response; the cache holds the
    // refreshed value.
    assert_eq!(response, Response::created(json!({"id": 1})));
    assert_eq!(
        *coordinator.cache().get("/items/1").unwrap(),
        json!({"id": 1, "server": true})
    );
    assert_eq!(
        resolver.calls(),
        vec![
            (Verb::Post, "/items/1".to_string()),
            (Verb::Get, "/items/1".to_string()),
        ]
    );
}

#[tokio::test]
async fn mutation_not_found_does_not_evict() {
    let resolver = Arc::new(ScriptedResolver::new([
        Response::ok(json!("cached")),
        Response::not_found(),
    ]));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let (client, count) = counting_client(&coordinator);
    coordinator.subscribe(client, "/x");
    coordinator.get("/x").await;

    let response = coordinator.put("/x", json!("new")).await;

    assert!(response.is_not_found());
    assert_eq!(*coordinator.cache().get("/x").unwrap(), json!("cached"));
    assert!(coordinator.graph().is_subscribed(client, "/x"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.calls().len(), 2);
}

#[tokio::test]
async fn failed_refresh_leaves_state() {
    let resolver = Arc::new(ScriptedResolver::new([
        Response::ok(json!(1)),
        Response::ok(json!(2)),
        Response::error(Response::INTERNAL_ERROR),
    ]));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let (client, count) = counting_client(&coordinator);
    coordinator.subscribe(client, "/x");
    coordinator.get("/x").await;

    // The mutation succeeds but its refresh fails: nothing changes.
    let response = coordinator.put("/x", json!(2)).await;

    assert_eq!(response, Response::ok(json!(2)));
    assert_eq!(*coordinator.cache().get("/x").unwrap(), json!(1));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_content_caches_null() {
    let resolver = ScriptedResolver::new([Response::no_content()]);
    let coordinator = UpdateCoordinator::new(resolver);
    let mut subscriber = coordinator.register_channel();
    coordinator.subscribe(subscriber.id(), "/empty");

    coordinator.update("/empty").await;

    assert_eq!(*coordinator.cache().get("/empty").unwrap(), Payload::Null);
    let notification = subscriber.recv().await.unwrap();
    assert_eq!(notification.value.as_deref(), Some(&Payload::Null));
}

#[tokio::test]
async fn cascade_only_touches_the_missing_path() {
    let resolver = Arc::new(MemoryResolver::new());
    resolver.insert("/a", json!("a"));
    resolver.insert("/b", json!("b"));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));

    let clients: Vec<_> = (0..3).map(|_| coordinator.register_channel()).collect();
    for subscriber in &clients {
        coordinator.subscribe(subscriber.id(), "/a");
        coordinator.subscribe(subscriber.id(), "/b");
    }
    coordinator.get("/a").await;
    coordinator.get("/b").await;

    resolver.remove("/a");
    coordinator.update("/a").await;

    assert!(!coordinator.cache().has("/a"));
    assert!(coordinator.cache().has("/b"));
    assert!(coordinator.graph().dependents_of("/a").is_empty());
    assert_eq!(coordinator.graph().dependents_of("/b").len(), 3);
    assert!(coordinator.graph().is_symmetric());

    for mut subscriber in clients {
        let mut evictions = 0;
        while let Ok(notification) = subscriber.try_recv() {
            if notification.is_eviction() {
                assert_eq!(notification.path.as_str(), "/a");
                evictions += 1;
            }
        }
        assert_eq!(evictions, 1);
    }
}

#[tokio::test]
async fn failing_sink_stays_registered() {
    struct Broken;

    impl NotificationSink for Broken {
        fn notify(&self, _path: &ResourcePath, _value: Option<Arc<Payload>>) -> SyncResult<()> {
            Err(SyncError::Internal {
                message: "socket buffer full".into(),
                source: None,
            })
        }
    }

    let resolver = Arc::new(MemoryResolver::new());
    resolver.insert("/a", json!(1));
    let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
    let broken = coordinator.register(Broken);
    let (healthy, count) = counting_client(&coordinator);
    coordinator.subscribe(broken, "/a");
    coordinator.subscribe(healthy, "/a");

    coordinator.update("/a").await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(coordinator.clients().contains(broken));
    assert!(coordinator.graph().is_subscribed(broken, "/a"));
}

#[tokio::test]
async fn lru_bound_holds_through_coordinator() {
    let resolver = Arc::new(MemoryResolver::new());
    let coordinator = UpdateCoordinator::builder()
        .shared_resolver(resolver.clone())
        .max_entries(3)
        .build()
        .unwrap();
    let mut subscriber = coordinator.register_channel();
    coordinator.subscribe(subscriber.id(), "/k/0");

    for i in 0..10 {
        coordinator.put(format!("/k/{i}"), json!(i)).await;
        assert!(coordinator.cache().len() <= 3);
    }

    // Capacity eviction neither notifies nor unsubscribes.
    assert_eq!(subscriber.try_recv().unwrap().value.as_deref(), Some(&json!(0)));
    assert!(subscriber.try_recv().is_err());
    assert!(coordinator.graph().is_subscribed(subscriber.id(), "/k/0"));
    assert!(!coordinator.cache().has("/k/0"));

    let response = coordinator.get("/k/0").await;
    assert_eq!(response, Response::ok(json!(0)));
}

#[tokio::test]
async fn detached_mode_without_waiting() {
    let resolver = Arc::new(MemoryResolver::new().with_latency(Duration::from_millis(20)));
    let coordinator = UpdateCoordinator::builder()
        .shared_resolver(resolver.clone())
        .config(CoordinatorConfig::unsynchronized())
        .build()
        .unwrap();
    let mut subscriber = coordinator.register_channel();
    coordinator.subscribe(subscriber.id(), "/d");

    let response = coordinator.put("/d", json!("x")).await;
    assert_eq!(response.status(), Response::CREATED);

    let notification = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.value.as_deref(), Some(&json!("x")));
    assert!(coordinator.cache().has("/d"));
}

#[derive(Debug, Clone)]
enum Op {
    Get(usize),
    Put(usize, i64),
    Patch(usize, i64),
    Delete(usize),
    Subscribe(usize, usize),
    Unsubscribe(usize, Option<usize>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let path = 0..4usize;
    let client = 0..3usize;
    prop_oneof![
        path.clone().prop_map(Op::Get),
        (path.clone(), any::<i64>()).prop_map(|(p, v)| Op::Put(p, v)),
        (path.clone(), any::<i64>()).prop_map(|(p, v)| Op::Patch(p, v)),
        path.clone().prop_map(Op::Delete),
        (client.clone(), path.clone()).prop_map(|(c, p)| Op::Subscribe(c, p)),
        (client, proptest::option::of(path)).prop_map(|(c, p)| Op::Unsubscribe(c, p)),
    ]
}

proptest! {
    /// With awaited refreshes, whatever is cached matches the backend and
    /// the subscription graph stays symmetric.
    #[test]
    fn cache_tracks_backend(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let resolver = Arc::new(MemoryResolver::new());
            let coordinator = UpdateCoordinator::new(Arc::clone(&resolver));
            let clients: Vec<_> = (0..3).map(|_| coordinator.register_fn(|_, _| {})).collect();
            let path = |i: usize| format!("/p/{i}");

            for op in ops {
                match op {
                    Op::Get(p) => {
                        coordinator.get(path(p)).await;
                    }
                    Op::Put(p, v) => {
                        coordinator.put(path(p), json!({ "v": v })).await;
                    }
                    Op::Patch(p, v) => {
                        coordinator.patch(path(p), json!({ "w": v })).await;
                    }
                    Op::Delete(p) => {
                        coordinator.delete(path(p)).await;
                    }
                    Op::Subscribe(c, p) => {
                        coordinator.subscribe(clients[c], path(p));
                    }
                    Op::Unsubscribe(c, p) => {
                        let p = p.map(path);
                        coordinator.unsubscribe(clients[c], p.as_deref());
                    }
                }

                prop_assert!(coordinator.graph().is_symmetric());
                for (cached_path, value) in coordinator.cache().iter() {
                    prop_assert_eq!(resolver.value(cached_path.as_str()), Some(Payload::clone(&value)));
                }
            }
            Ok(())
        })?;
    }
}
