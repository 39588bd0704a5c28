//! Watch control loop
//!
//! A watch session follows one store path (a single key, or a directory of
//! keys) and hands every state of it to a consumer, one at a time:
//!
//! ```text
//!  INIT ──fetch──▶ NOTIFYING ──▶ WAITING_POLL ──change──▶ NOTIFYING ──▶ ...
//!   │                 │               │  ▲
//!   │                 │               │  └── transport timeout: re-issue
//!   └─────────────────┴───── end() ───┴────────────────────────▶ ENDED
//! ```
//!
//! 1. The current snapshot is fetched and the change cursor is set to the
//!    highest `modified_index` found in it.
//! 2. The snapshot goes through [`NodeMapper::initial`] and the result is
//!    handed to the consumer.
//! 3. A long-poll is issued for `cursor + 1`. Each change it returns moves
//!    the cursor to the change's index, goes through [`NodeMapper::change`]
//!    and is handed to the consumer before the next poll is issued.
//!
//! # Guarantees
//!
//! - At most one store call and at most one consumer notification are in
//!   flight per session; notification `n + 1` is never dispatched before the
//!   consumer finished handling notification `n`.
//! - Transport timeouts ([`crate::StoreError::TransientTimeout`]) are retried
//!   immediately with the same wait index and never reach the consumer.
//! - Other store faults are retried according to
//!   [`crate::WatchConfig::fault_backoff`]; once the policy is exhausted, or
//!   for faults retrying cannot fix, the session terminates and reports the
//!   fault through [`WatchHandle::done`].
//! - A failing mapper or consumer terminates the session the same way.
//! - After [`WatchHandle::end`] returns no consumer code runs for the
//!   session, including notifications that were already computed. The one
//!   exception is `end` called from another session's consumer, which does
//!   not wait for a poll already running on a different thread.
//!
//! Sessions are independent: each owns its cursor and cancellation token and
//! only shares the [`crate::StoreClient`].

mod control_loop;
mod gate;
mod handle;
mod mapper;
mod session;

pub use control_loop::*;
pub use handle::*;
pub use mapper::*;
pub use session::*;
