use std::sync::Arc;
use std::time::Duration;

use fogbeacon::Client;
use fogbeacon::MemoryStore;
use fogbeacon::StoreClient;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const RECV_DEADLINE: Duration = Duration::from_secs(5);

/// How long to wait before concluding nothing else will arrive
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

pub fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn client(
    store: &Arc<MemoryStore>,
    cluster: &str,
    program: &str,
    instance: &str,
) -> Client {
    let store: Arc<dyn StoreClient> = store.clone();
    Client::builder(store)
        .cluster(cluster)
        .program(program)
        .instance(instance)
        .build()
        .expect("valid client settings")
}

pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("notification should arrive")
        .expect("session should still be running")
}

/// Asserts nothing is delivered within the quiet period
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    if let Ok(Some(unexpected)) = timeout(QUIET_PERIOD, rx.recv()).await {
        panic!("unexpected notification: {unexpected:?}");
    }
}
