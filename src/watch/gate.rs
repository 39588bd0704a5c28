use std::cell::Cell;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::task::Poll;

use parking_lot::ReentrantMutex;
use tokio_util::sync::CancellationToken;

thread_local! {
    /// Number of gates whose dispatch lock this thread currently holds
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

struct DispatchScope;

impl DispatchScope {
    fn enter() -> Self {
        DISPATCHING.with(|depth| depth.set(depth.get() + 1));
        DispatchScope
    }

    fn active() -> bool {
        DISPATCHING.with(|depth| depth.get() > 0)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Liveness switch shared by a session task and its handle
///
/// Consumer futures are only polled while holding `dispatch`, and
/// [`SessionGate::close`] waits for that lock after flipping `active`. Once
/// `close` returns, no consumer code of the session runs again. The lock is
/// reentrant so a consumer ending its own session from inside a poll does
/// not deadlock.
///
/// A consumer ending a *different* session never blocks on that session's
/// lock: the other session stops before its next poll, but a poll already
/// running on another thread may still be finishing when `close` returns.
/// Two consumers ending each other's sessions therefore cannot deadlock.
#[derive(Debug)]
pub(crate) struct SessionGate {
    active: AtomicBool,
    dispatch: ReentrantMutex<()>,
    cancel: CancellationToken,
}

impl SessionGate {
    pub(crate) fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            dispatch: ReentrantMutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns `true` for the call that actually closed the gate
    pub(crate) fn close(&self) -> bool {
        let was_open = self.active.swap(false, Ordering::AcqRel);
        self.cancel.cancel();

        // Wait out a poll in flight on another thread, unless this thread is
        // itself dispatching for some session.
        if !DispatchScope::active() {
            drop(self.dispatch.lock());
        }
        was_open
    }

    /// Session-wide token; store calls run under child tokens of it
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `f` under the dispatch lock unless the gate is closed
    pub(crate) fn enter<R>(
        &self,
        f: impl FnOnce() -> R,
    ) -> Option<R> {
        let _dispatch = self.dispatch.lock();
        let _scope = DispatchScope::enter();
        self.is_open().then(f)
    }

    /// Drives `fut` to completion as long as the gate stays open
    ///
    /// Returns `None` without polling `fut` again once the gate is closed,
    /// including when it closes while `fut` is pending.
    pub(crate) async fn run<F: Future>(
        &self,
        fut: F,
    ) -> Option<F::Output> {
        let mut fut = std::pin::pin!(fut);
        let guarded = futures::future::poll_fn(|cx| {
            let _dispatch = self.dispatch.lock();
            if !self.is_open() {
                return Poll::Ready(None);
            }
            let _scope = DispatchScope::enter();
            fut.as_mut().poll(cx).map(Some)
        });

        tokio::select! {
            biased;
            outcome = guarded => outcome,
            _ = self.cancel.cancelled() => None,
        }
    }
}
