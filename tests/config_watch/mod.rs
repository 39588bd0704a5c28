use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use fogbeacon::BeaconConfig;
use fogbeacon::Client;
use fogbeacon::Collection;
use fogbeacon::WatchError;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::common::assert_quiet;
use crate::common::client;
use crate::common::new_store;
use crate::common::recv;
use crate::common::QUIET_PERIOD;
use crate::common::RECV_DEADLINE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Upstream {
    host: String,
    port: u16,
    weights: Vec<f64>,
    fallback: Option<String>,
}

#[tokio::test]
async fn test_set_get_round_trip() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();

    config.set("retries", &3i64).await.unwrap();
    config.set("ratio", &0.25f64).await.unwrap();
    config.set("enabled", &true).await.unwrap();
    config.set("motd", "hello fog").await.unwrap();
    let upstream = Upstream {
        host: "db.internal".to_string(),
        port: 5432,
        weights: vec![0.5, 1.5],
        fallback: None,
    };
    config.set("upstream", &upstream).await.unwrap();

    assert_eq!(config.get::<i64>("retries").await.unwrap(), Some(3));
    assert_eq!(config.get::<f64>("ratio").await.unwrap(), Some(0.25));
    assert_eq!(config.get::<bool>("enabled").await.unwrap(), Some(true));
    assert_eq!(config.get::<String>("motd").await.unwrap().as_deref(), Some("hello fog"));
    assert_eq!(config.get::<Upstream>("upstream").await.unwrap(), Some(upstream));
    assert_eq!(config.get::<Value>("unset").await.unwrap(), None);
}

#[tokio::test]
async fn test_watch_seeds_without_any_change() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    client.config().set("mode", "active").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = client.config().watch("mode", move |mode: String| {
        let _ = tx.send(mode);
        async { Ok(()) }
    });

    assert_eq!(recv(&mut rx).await, "active");
    assert_quiet(&mut rx).await;
    handle.end();
}

#[tokio::test]
async fn test_watch_delivers_one_notification_per_change() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();
    config.set("level", &0u32).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = config.watch("level", move |level: u32| {
        let _ = tx.send(level);
        async { Ok(()) }
    });
    assert_eq!(recv(&mut rx).await, 0);

    for level in 1..=3u32 {
        config.set("level", &level).await.unwrap();
        assert_eq!(recv(&mut rx).await, level);
    }
    assert_quiet(&mut rx).await;

    // a sibling key of the same program does not wake the watch
    config.set("other", &9u32).await.unwrap();
    assert_quiet(&mut rx).await;

    handle.end();
}

#[tokio::test]
async fn test_no_notification_after_end_returns() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();
    config.set("level", &0u32).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let handle = {
        let calls = calls.clone();
        config.watch("level", move |_: u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
    };
    timeout(RECV_DEADLINE, async {
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    config.set("level", &1u32).await.unwrap();
    handle.end();
    let seen_at_end = calls.load(Ordering::SeqCst);

    tokio::time::sleep(QUIET_PERIOD).await;
    assert_eq!(calls.load(Ordering::SeqCst), seen_at_end);

    handle.end();
    assert_eq!(handle.done().await, Ok(()));
    assert_eq!(calls.load(Ordering::SeqCst), seen_at_end);
}

#[tokio::test]
async fn test_collection_round_trip() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();

    config
        .set_collection("limits", [("a", 1), ("b", 2)])
        .await
        .unwrap();

    let collection: Collection<i32> = config.get_collection("limits").await.unwrap();
    assert_eq!(collection, BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]));
}

#[tokio::test]
async fn test_watch_collection_updates_single_entry() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();
    config
        .set_collection("listener", [("host", json!("0.0.0.0")), ("port", json!(80))])
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = config.watch_collection("listener", move |collection: Collection<Value>| {
        let _ = tx.send(collection);
        async { Ok(()) }
    });

    let seed = recv(&mut rx).await;
    assert_eq!(
        seed,
        BTreeMap::from([
            ("host".to_string(), json!("0.0.0.0")),
            ("port".to_string(), json!(80)),
        ])
    );

    config.set("listener/port", &1024).await.unwrap();
    let updated = recv(&mut rx).await;
    assert_eq!(
        updated,
        BTreeMap::from([
            ("host".to_string(), json!("0.0.0.0")),
            ("port".to_string(), json!(1024)),
        ])
    );

    handle.end();
    handle.end();
    assert_eq!(handle.done().await, Ok(()));
}

#[tokio::test]
async fn test_consumer_failure_ends_session_only() {
    let store = new_store();
    let client = client(&store, "default", "gateway", "gw-0");
    let config = client.config();
    config.set("level", &0u32).await.unwrap();

    let handle = config.watch("level", |level: u32| async move {
        if level > 0 {
            return Err(fogbeacon::Error::Fatal(format!("cannot apply level {level}")));
        }
        Ok(())
    });

    config.set("level", &5u32).await.unwrap();
    match timeout(RECV_DEADLINE, handle.done()).await.unwrap() {
        Err(WatchError::Consumer { message, .. }) => assert!(message.contains("level 5")),
        other => panic!("unexpected outcome: {other:?}"),
    }

    // the client keeps working
    assert_eq!(config.get::<u32>("level").await.unwrap(), Some(5));
}

#[tokio::test]
async fn test_clusters_are_isolated() {
    let store = new_store();
    let blue = client(&store, "blue", "gateway", "gw-0");
    let green = client(&store, "green", "gateway", "gw-0");

    blue.config().set("color", "blue").await.unwrap();
    assert_eq!(green.config().get::<String>("color").await.unwrap(), None);
}

#[tokio::test]
async fn test_client_from_loaded_config() {
    let mut config = BeaconConfig::default();
    config.scope.namespace = "haze".to_string();
    config.scope.cluster = "lab".to_string();

    let store = new_store();
    let client = Client::builder(store.clone())
        .set_config(config.validate().unwrap())
        .program("gateway")
        .instance("gw-0")
        .build()
        .unwrap();

    assert_eq!(client.config().path("k"), "haze/lab/config/gateway/k");
    client.config().set("k", &1).await.unwrap();
    assert_eq!(store.current_index(), 1);
}
