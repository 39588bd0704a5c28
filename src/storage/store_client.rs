use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use super::Node;
use crate::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Options for a point-in-time fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Return the whole subtree instead of immediate children only
    pub recursive: bool,
    /// Require the read to reflect every acknowledged write
    pub consistent: bool,
}

impl FetchOptions {
    pub fn recursive(recursive: bool) -> Self {
        Self {
            recursive,
            consistent: false,
        }
    }
}

/// Options for a long-poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOptions {
    /// Smallest store index of interest
    pub wait_index: u64,
    /// Also report changes to descendants of the path
    pub recursive: bool,
    /// Require the answer to come from an up-to-date replica
    pub consistent: bool,
}

/// Hierarchical, versioned key-value store with index-based long-poll
///
/// Implementations must be safe for concurrent use: several watch sessions
/// and point reads/writes share one client.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Snapshot of `path`
    ///
    /// # Returns
    /// * `Ok(Some(node))` if the path exists
    /// * `Ok(None)` if it does not
    async fn fetch(
        &self,
        path: &str,
        options: FetchOptions,
    ) -> StoreResult<Option<Node>>;

    /// Stores `value` at `path`, overwriting any previous value and creating
    /// missing parent directories
    ///
    /// Returns the leaf as written.
    async fn write(
        &self,
        path: &str,
        value: String,
    ) -> StoreResult<Node>;

    /// Waits for the first change to `path` with index `>= options.wait_index`
    /// and returns the changed node
    ///
    /// # Errors
    /// - [`StoreError::TransientTimeout`] when the transport gives up before
    ///   the store answers; the same poll may simply be issued again
    /// - [`StoreError::Cancelled`] once `cancel` fires
    /// - any other [`StoreError`] for genuine faults
    async fn long_poll(
        &self,
        path: &str,
        options: PollOptions,
        cancel: CancellationToken,
    ) -> StoreResult<Node>;
}
