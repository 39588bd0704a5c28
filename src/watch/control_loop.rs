use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::gate::SessionGate;
use super::NodeMapper;
use super::WatchHandle;
use super::WatchSession;
use crate::Result;
use crate::StoreClient;
use crate::WatchConfig;

/// Starts watch sessions against a shared store
#[derive(Clone)]
pub struct WatchLoop {
    store: Arc<dyn StoreClient>,
    config: WatchConfig,
}

impl WatchLoop {
    pub fn new(
        store: Arc<dyn StoreClient>,
        config: WatchConfig,
    ) -> Self {
        Self { store, config }
    }

    /// Store shared by every session started from this loop
    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Starts watching `path` and returns immediately
    ///
    /// The initial snapshot goes through `mapper.initial`, every later change
    /// through `mapper.change`, and each result is handed to `on_notify`.
    /// The session runs on its own Tokio task until the handle ends it or it
    /// fails; must be called from within a Tokio runtime.
    ///
    /// # Arguments
    /// * `recursive` - watch every descendant of `path` instead of `path`
    ///   itself
    pub fn start<M, N, Fut>(
        &self,
        path: impl Into<String>,
        recursive: bool,
        mapper: M,
        on_notify: N,
    ) -> WatchHandle
    where
        M: NodeMapper,
        N: FnMut(M::Output) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let path = path.into();
        let gate = Arc::new(SessionGate::new());
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let session = WatchSession::new(
            path.clone(),
            recursive,
            self.config.fault_backoff,
            gate.clone(),
        );
        let store = self.store.clone();

        debug!(%path, recursive, "starting watch session");
        tokio::spawn(async move {
            let outcome = session.run(store, mapper, on_notify).await;
            outcome_tx.send_replace(Some(outcome));
        });

        WatchHandle::new(path, gate, outcome_rx)
    }
}
