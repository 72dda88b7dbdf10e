//! End-to-end behaviour of a wired message center: registration, dispatch,
//! notifiers, graceful shutdown and recovery.

use async_trait::async_trait;
use mcenter_core::impls::{InMemoryStore, ManualShutdown};
use mcenter_core::ports::{IdGenerator, StoreClient, StoreError};
use mcenter_core::{
    Config, HandlerError, McenterError, MessageCenter, MessageId, Notification, ResultMap, TypeOutcome, TypeSpec,
    listener_fn,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store that counts writes.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    sets: AtomicUsize,
}

#[async_trait]
impl StoreClient for CountingStore {
    async fn set(&self, bucket: &str, id: &str, record: String) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(bucket, id, record).await
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<u64, StoreError> {
        self.inner.delete(bucket, id).await
    }

    async fn get_all(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError> {
        self.inner.get_all(bucket).await
    }
}

/// Hands out one fixed id, so notifications can be matched to the item.
struct FixedId(&'static str);

impl IdGenerator for FixedId {
    fn generate(&self) -> MessageId {
        MessageId::new(self.0)
    }
}

fn counter(calls: &Arc<AtomicUsize>, value: Value) -> Arc<dyn mcenter_core::Listener> {
    let calls = Arc::clone(calls);
    listener_fn(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        async move { Ok(value) }
    })
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(3), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

#[tokio::test]
async fn registration_ordinals_and_errors() {
    let center = MessageCenter::builder().build().unwrap();

    assert_eq!(center.register("test", None, vec![TypeSpec::new("save")]).unwrap(), 1);
    assert_eq!(center.register("test2", None, vec![TypeSpec::new("save")]).unwrap(), 2);

    let err = center.register("test", None, vec![]).unwrap_err();
    assert!(matches!(err, McenterError::DuplicateRegistration { .. }));

    center.subscribe("test", "save", listener_fn(|d| async move { Ok(d) })).unwrap();
    assert!(!center.check_ready());
    center.subscribe("test2", "save", listener_fn(|d| async move { Ok(d) })).unwrap();
    assert!(center.check_ready());
    assert!(center.check_ready());

    let err = center.register("late", None, vec![TypeSpec::new("save")]).unwrap_err();
    assert!(matches!(err, McenterError::RegisterAfterReady { .. }));
    assert!(center.get_unlinked().is_empty());
}

#[tokio::test]
async fn callback_receives_every_type_result() {
    let center = MessageCenter::builder().build().unwrap();
    center
        .register("test", None, vec![TypeSpec::new("A"), TypeSpec::new("B")])
        .unwrap();
    center
        .subscribe(
            "test",
            "A",
            listener_fn(|d| async move { Ok(json!({ "a": d["name"] })) }),
        )
        .unwrap();
    center
        .subscribe(
            "test",
            "B",
            listener_fn(|d| async move { Ok(json!({ "b": d["index"] })) }),
        )
        .unwrap();

    let result = center
        .publish_and_wait("test", json!({ "name": "stonephp", "index": 2 }))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result["A"].error, None);
    assert_eq!(result["A"].value, Some(json!({ "a": "stonephp" })));
    assert_eq!(result["B"].value, Some(json!({ "b": 2 })));
}

#[tokio::test]
async fn handler_error_is_isolated_and_notified_once() {
    let center = MessageCenter::builder().id_generator(Arc::new(FixedId("item-1"))).build().unwrap();
    center
        .register("test", None, vec![TypeSpec::new("A"), TypeSpec::new("B")])
        .unwrap();

    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notified);
    center
        .set_notifier("error", move |n: &Notification<'_>| {
            if let Notification::Error {
                error,
                id,
                name,
                type_name,
                data,
            } = n
            {
                sink.lock().push((
                    error.to_string(),
                    id.to_string(),
                    name.to_string(),
                    type_name.to_string(),
                    (*data).clone(),
                ));
            }
        })
        .unwrap();

    let b_calls = Arc::new(AtomicUsize::new(0));
    center
        .subscribe("test", "A", listener_fn(|_| async { Err(HandlerError::failed("A broke")) }))
        .unwrap();
    center.subscribe("test", "B", counter(&b_calls, json!("b"))).unwrap();

    let payload = json!({ "name": "stonephp" });
    let result = center.publish_and_wait("test", payload.clone()).await.unwrap();

    assert_eq!(result["A"].error, Some(HandlerError::failed("A broke")));
    assert_eq!(result["A"].value, None);
    assert_eq!(result["B"], TypeOutcome { error: None, value: Some(json!("b")), elapsed_ms: result["B"].elapsed_ms });
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *notified.lock(),
        vec![(
            "A broke".to_string(),
            "item-1".to_string(),
            "test".to_string(),
            "A".to_string(),
            payload
        )]
    );
}

#[tokio::test]
async fn slow_handler_fires_timeout_notifier() {
    let center = MessageCenter::builder().id_generator(Arc::new(FixedId("item-2"))).build().unwrap();
    center
        .register("test", None, vec![TypeSpec::new("save").timeout_ms(30)])
        .unwrap();

    let timeouts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&timeouts);
    center
        .set_notifier("timeout", move |n: &Notification<'_>| {
            if let Notification::Timeout {
                elapsed_ms,
                id,
                name,
                type_name,
            } = n
            {
                sink.lock().push((*elapsed_ms, id.to_string(), name.to_string(), type_name.to_string()));
            }
        })
        .unwrap();
    center
        .subscribe(
            "test",
            "save",
            listener_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(json!("slow"))
            }),
        )
        .unwrap();

    let result = center.publish_and_wait("test", json!(null)).await.unwrap();

    assert_eq!(result["save"].value, Some(json!("slow")));
    let timeouts = timeouts.lock().clone();
    assert_eq!(timeouts.len(), 1);
    assert!(timeouts[0].0 > 30);
    assert_eq!(timeouts[0].1, "item-2");
    assert_eq!(timeouts[0].2, "test");
    assert_eq!(timeouts[0].3, "save");
}

#[tokio::test]
async fn recovered_item_only_runs_missing_types() {
    let store = Arc::new(InMemoryStore::new());
    store
        .set(
            "mcenter",
            "message uuid",
            r#"{"id":"message uuid","name":"test","data":{"name":"recover message"},"result":{"A":[null,{"value":"testSave"},301]}}"#.to_string(),
        )
        .await
        .unwrap();

    let center = MessageCenter::builder().store(store.clone()).build().unwrap();
    center
        .register("test", None, vec![TypeSpec::new("A"), TypeSpec::new("B")])
        .unwrap();

    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    center.subscribe("test", "A", counter(&a_calls, json!("a"))).unwrap();
    center.subscribe("test", "B", counter(&b_calls, json!("b"))).unwrap();

    eventually("recovered B run", || center.get_stats()["test"]["B"].done == 1).await;

    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert!(store.get_all("mcenter").await.unwrap().is_empty());
}

#[tokio::test]
async fn idle_shutdown_completes_without_store_writes() {
    let store = Arc::new(CountingStore::default());
    let shutdown = ManualShutdown::new();
    let center = MessageCenter::builder()
        .store(store.clone())
        .shutdown(&shutdown)
        .build()
        .unwrap();
    center.register("test", None, vec![TypeSpec::new("save")]).unwrap();
    center.subscribe("test", "save", listener_fn(|d| async move { Ok(d) })).unwrap();

    let drain = shutdown.trigger();
    assert!(center.is_exited());
    assert!(!center.is_exiting());
    drain.await;

    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    center.close().await;
}

#[tokio::test]
async fn shutdown_drains_in_flight_items_and_parks_them_once() {
    let store = Arc::new(CountingStore::default());
    let shutdown = ManualShutdown::new();
    let center = MessageCenter::builder()
        .config(Config::default().with_max_concurrency(10))
        .store(store.clone())
        .shutdown(&shutdown)
        .build()
        .unwrap();
    center
        .register("test", None, vec![TypeSpec::new("A"), TypeSpec::new("B")])
        .unwrap();

    let b_calls = Arc::new(AtomicUsize::new(0));
    center
        .subscribe(
            "test",
            "A",
            listener_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(json!({ "value": "testSave" }))
            }),
        )
        .unwrap();
    center.subscribe("test", "B", counter(&b_calls, json!("b"))).unwrap();

    let callbacks = Arc::new(Mutex::new(Vec::<ResultMap>::new()));
    for index in 0..3 {
        let sink = Arc::clone(&callbacks);
        center
            .publish(
                "test",
                json!({ "name": "stonephp", "index": index }),
                Some(Box::new(move |r: &ResultMap| sink.lock().push(r.clone()))),
            )
            .unwrap();
    }
    eventually("A running for every item", || center.get_stats()["test"]["A"].doing == 3).await;
    assert_eq!(center.in_flight(), 3);

    let drain = shutdown.trigger();
    assert!(center.is_exiting());
    assert!(!center.is_exited());

    tokio::time::timeout(Duration::from_secs(3), drain).await.unwrap();
    assert!(center.is_exited());
    assert!(!center.is_exiting());

    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    assert_eq!(callbacks.lock().len(), 3);
    assert!(callbacks.lock().iter().all(|r| r.len() == 1 && r.contains_key("A")));

    assert_eq!(store.sets.load(Ordering::SeqCst), 3);
    let parked = store.get_all("mcenter").await.unwrap();
    assert_eq!(parked.len(), 3);
    for (id, raw) in &parked {
        assert_eq!(id.len(), 36);
        let record: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(record["id"], json!(id));
        assert_eq!(record["name"], json!("test"));
        assert_eq!(record["data"]["name"], json!("stonephp"));
        assert_eq!(record["result"]["A"][1], json!({ "value": "testSave" }));
        assert!(record["result"].get("B").is_none());
    }

    center.close().await;
}
