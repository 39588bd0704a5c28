//! Error hierarchy for the beacon client stack
//!
//! Absence of a key is never an error: lookups surface it as `None` or an
//! empty collection. Everything else is categorized by the layer that
//! produced it.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures reported by the backing key-value store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A watch session terminated abnormally
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Value (de)serialization failures
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A caller-supplied argument was rejected before reaching the store
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Some child writes of a collection failed; applied writes are kept
    #[error("{failed} of {total} collection writes failed, first error: {first}")]
    Collection {
        failed: usize,
        total: usize,
        first: Box<Error>,
    },

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The transport gave up on a long-poll before the store answered.
    ///
    /// Typically raised when requests are proxied and the proxy's idle
    /// timeout is shorter than the store's wait.
    #[error("Long-poll timed out at the transport")]
    TransientTimeout,

    /// Store could not be reached or refused to serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The requested wait index fell out of the retained change history
    #[error("Wait index {requested} is older than the retained history (oldest: {oldest})")]
    IndexCleared { requested: u64, oldest: u64 },

    /// Attempted to write a value onto a directory
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// Attempted to create a key underneath a leaf
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// The call was aborted through its cancellation token
    #[error("Request cancelled")]
    Cancelled,
}

impl StoreError {
    /// Transport-level timeouts that are indistinguishable from a real wait
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::TransientTimeout)
    }

    /// Faults that may succeed when the same request is issued again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::TransientTimeout | StoreError::Unavailable(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The watched path did not exist when the session started
    #[error("Watched path not found: {0}")]
    NotFound(String),

    /// Store faults persisted past the configured backoff policy
    #[error("Store fault on {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        path: String,
        attempts: usize,
        #[source]
        source: StoreError,
    },

    /// A store fault that retrying cannot fix
    #[error("Store fault on {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    /// Mapping a node into the consumer's value failed
    #[error("Mapping {path} failed: {message}")]
    Mapper { path: String, message: String },

    /// The consumer's handler returned an error
    #[error("Consumer handler for {path} failed: {message}")]
    Consumer { path: String, message: String },

    /// The session task panicked or was aborted by the runtime
    #[error("Watch task for {path} aborted: {message}")]
    Aborted { path: String, message: String },
}
