use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::gate::SessionGate;
use crate::WatchError;

pub(crate) type SessionOutcome = std::result::Result<(), WatchError>;

/// Controls a running watch session
///
/// Dropping the handle ends the session.
#[must_use = "dropping a WatchHandle ends the watch session"]
#[derive(Debug)]
pub struct WatchHandle {
    path: String,
    gate: Arc<SessionGate>,
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

impl WatchHandle {
    pub(crate) fn new(
        path: String,
        gate: Arc<SessionGate>,
        outcome: watch::Receiver<Option<SessionOutcome>>,
    ) -> Self {
        Self {
            path,
            gate,
            outcome,
        }
    }

    /// Store path the session watches
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stops the session
    ///
    /// Cancels the outstanding store call, if any. Once this returns the
    /// consumer is not invoked again, even for a notification that was
    /// already computed. Calling it more than once, or on a session that
    /// already terminated, has no effect.
    ///
    /// Called from inside the consumer of another session, it does not wait
    /// for this session's consumer to return from a poll already running on
    /// another thread; that poll is the last one.
    pub fn end(&self) {
        if self.gate.close() {
            debug!(path = %self.path, "watch session ended by consumer");
        }
    }

    /// `false` once the session was ended or terminated on its own
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && self.outcome.borrow().is_none()
    }

    /// Waits for the session to terminate
    ///
    /// # Returns
    /// * `Ok(())` if it was ended through [`WatchHandle::end`]
    /// * `Err(_)` with the failure that terminated it otherwise
    pub async fn done(&self) -> std::result::Result<(), WatchError> {
        let mut outcome = self.outcome.clone();
        let settled = outcome.wait_for(Option::is_some).await;
        match settled {
            Ok(settled) => settled.as_ref().cloned().unwrap_or(Ok(())),
            Err(_) => Err(WatchError::Aborted {
                path: self.path.clone(),
                message: "session task stopped without reporting an outcome".to_string(),
            }),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.gate.close();
    }
}
