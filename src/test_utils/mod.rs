//! Helpers shared by unit tests

use std::time::Duration;

use futures::future::ready;
use futures::future::Ready;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::mapper_fn;
use crate::BackoffPolicy;
use crate::Node;
use crate::NodeMapper;
use crate::Result;
use crate::WatchConfig;

pub(crate) const RECV_DEADLINE: Duration = Duration::from_secs(5);

/// Maps every node to its raw value
pub(crate) fn value_mapper() -> impl NodeMapper<Output = Option<String>> {
    mapper_fn(
        |node: Node| async move { Ok(node.value().map(str::to_string)) },
        |node: Node| async move { Ok(node.value().map(str::to_string)) },
    )
}

/// Consumer forwarding every notification into `tx`
pub(crate) fn forward<V: Send + 'static>(
    tx: mpsc::UnboundedSender<V>
) -> impl FnMut(V) -> Ready<Result<()>> + Send + 'static {
    move |value| {
        let _ = tx.send(value);
        ready(Ok(()))
    }
}

/// Next notification, failing the test if none arrives in time
pub(crate) async fn next<V>(rx: &mut mpsc::UnboundedReceiver<V>) -> V {
    timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("notification should arrive")
        .expect("session should still be running")
}

pub(crate) fn watch_config(max_retries: usize) -> WatchConfig {
    WatchConfig {
        fault_backoff: BackoffPolicy {
            max_retries,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        },
    }
}
