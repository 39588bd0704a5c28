use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::gate::SessionGate;
use super::NodeMapper;
use crate::BackoffPolicy;
use crate::FetchOptions;
use crate::Node;
use crate::PollOptions;
use crate::Result;
use crate::StoreClient;
use crate::StoreError;
use crate::WatchError;

/// Lifecycle of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fetching the initial snapshot
    Init,
    /// Mapping a node and waiting for the consumer to handle it
    Notifying,
    /// A long-poll for the next change is outstanding
    WaitingPoll,
    /// Terminal
    Ended,
}

enum Update {
    Initial(Node),
    Change(Node),
}

/// State owned by the task driving one watch
pub(crate) struct WatchSession {
    path: String,
    recursive: bool,
    policy: BackoffPolicy,
    state: SessionState,
    /// Highest store index already delivered
    last_seen_index: u64,
    /// Cancel token of the outstanding long-poll, paired with
    /// `last_seen_index`. It is a child of the gate token, so
    /// [`SessionGate::close`] cancels it without touching this field; `run`
    /// cancels it directly when the session terminates on its own.
    pending_cancel: Option<CancellationToken>,
    gate: Arc<SessionGate>,
}

impl WatchSession {
    pub(crate) fn new(
        path: String,
        recursive: bool,
        policy: BackoffPolicy,
        gate: Arc<SessionGate>,
    ) -> Self {
        Self {
            path,
            recursive,
            policy,
            state: SessionState::Init,
            last_seen_index: 0,
            pending_cancel: None,
            gate,
        }
    }

    /// Runs the session until it is ended or fails
    pub(crate) async fn run<M, N, Fut>(
        mut self,
        store: Arc<dyn StoreClient>,
        mut mapper: M,
        mut on_notify: N,
    ) -> std::result::Result<(), WatchError>
    where
        M: NodeMapper,
        N: FnMut(M::Output) -> Fut + Send,
        Fut: Future<Output = Result<()>> + Send,
    {
        let outcome = self.drive(store.as_ref(), &mut mapper, &mut on_notify).await;

        if let Some(pending) = self.pending_cancel.take() {
            pending.cancel();
        }
        self.transition(SessionState::Ended);
        self.gate.close();

        if let Err(e) = &outcome {
            error!(path = %self.path, last_seen_index = self.last_seen_index, "watch session failed: {}", e);
        }
        outcome
    }

    async fn drive<M, N, Fut>(
        &mut self,
        store: &dyn StoreClient,
        mapper: &mut M,
        on_notify: &mut N,
    ) -> std::result::Result<(), WatchError>
    where
        M: NodeMapper,
        N: FnMut(M::Output) -> Fut + Send,
        Fut: Future<Output = Result<()>> + Send,
    {
        let Some(snapshot) = self.fetch_snapshot(store).await? else {
            return Ok(());
        };
        self.last_seen_index = snapshot.max_modified_index();

        let mut update = Update::Initial(snapshot);
        loop {
            self.transition(SessionState::Notifying);
            if !self.notify(mapper, on_notify, update).await? {
                return Ok(());
            }

            self.transition(SessionState::WaitingPoll);
            let Some(change) = self.next_change(store).await? else {
                return Ok(());
            };
            self.last_seen_index = change.modified_index;
            update = Update::Change(change);
        }
    }

    /// Returns `Ok(false)` if the session was ended before the consumer
    /// finished
    async fn notify<M, N, Fut>(
        &self,
        mapper: &mut M,
        on_notify: &mut N,
        update: Update,
    ) -> std::result::Result<bool, WatchError>
    where
        M: NodeMapper,
        N: FnMut(M::Output) -> Fut + Send,
        Fut: Future<Output = Result<()>> + Send,
    {
        let mapped = match update {
            Update::Initial(node) => self.gate.run(mapper.initial(node)).await,
            Update::Change(node) => self.gate.run(mapper.change(node)).await,
        };
        let value = match mapped {
            None => return Ok(false),
            Some(Err(e)) => {
                return Err(WatchError::Mapper {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
            Some(Ok(value)) => value,
        };

        let Some(notified) = self.gate.enter(|| on_notify(value)) else {
            return Ok(false);
        };
        match self.gate.run(notified).await {
            None => Ok(false),
            Some(Err(e)) => Err(WatchError::Consumer {
                path: self.path.clone(),
                message: e.to_string(),
            }),
            Some(Ok(())) => {
                trace!(path = %self.path, index = self.last_seen_index, "consumer notified");
                Ok(true)
            }
        }
    }

    /// `Ok(None)` means the session was ended while fetching
    async fn fetch_snapshot(
        &self,
        store: &dyn StoreClient,
    ) -> std::result::Result<Option<Node>, WatchError> {
        let options = FetchOptions {
            recursive: self.recursive,
            consistent: true,
        };

        let mut faults = 0;
        loop {
            let fetched = tokio::select! {
                biased;
                _ = self.gate.token().cancelled() => return Ok(None),
                fetched = store.fetch(&self.path, options) => fetched,
            };

            match fetched {
                Ok(Some(node)) => {
                    debug!(path = %self.path, index = node.max_modified_index(), "initial snapshot fetched");
                    return Ok(Some(node));
                }
                Ok(None) => return Err(WatchError::NotFound(self.path.clone())),
                Err(e) if e.is_transient() => continue,
                Err(e) => {
                    faults += 1;
                    if !self.back_off(e, faults).await? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// `Ok(None)` means the session was ended while waiting
    async fn next_change(
        &mut self,
        store: &dyn StoreClient,
    ) -> std::result::Result<Option<Node>, WatchError> {
        let mut faults = 0;
        loop {
            if !self.gate.is_open() {
                return Ok(None);
            }

            let options = PollOptions {
                wait_index: self.last_seen_index + 1,
                recursive: self.recursive,
                consistent: true,
            };
            let cancel = self.gate.token().child_token();
            self.pending_cancel = Some(cancel.clone());

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StoreError::Cancelled),
                polled = store.long_poll(&self.path, options, cancel.clone()) => polled,
            };
            self.pending_cancel = None;

            match polled {
                Ok(node) => return Ok(Some(node)),
                Err(e) if e.is_transient() => {
                    trace!(path = %self.path, wait_index = options.wait_index, "long-poll timed out, re-issuing");
                }
                Err(StoreError::Cancelled) if !self.gate.is_open() => return Ok(None),
                Err(e) => {
                    faults += 1;
                    if !self.back_off(e, faults).await? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Waits before retrying fault number `attempt`
    ///
    /// Returns `Ok(false)` if the session was ended while waiting.
    async fn back_off(
        &self,
        fault: StoreError,
        attempt: usize,
    ) -> std::result::Result<bool, WatchError> {
        if !fault.is_retryable() {
            return Err(WatchError::Store {
                path: self.path.clone(),
                source: fault,
            });
        }
        if attempt > self.policy.max_retries {
            return Err(WatchError::RetriesExhausted {
                path: self.path.clone(),
                attempts: attempt,
                source: fault,
            });
        }

        let delay = self.policy.delay_for(attempt);
        warn!(path = %self.path, attempt, ?delay, "store fault, retrying: {}", fault);
        tokio::select! {
            biased;
            _ = self.gate.token().cancelled() => Ok(false),
            _ = tokio::time::sleep(delay) => Ok(true),
        }
    }

    fn transition(
        &mut self,
        next: SessionState,
    ) {
        if self.state != next {
            trace!(path = %self.path, from = ?self.state, to = ?next, "watch session transition");
            self.state = next;
        }
    }
}
