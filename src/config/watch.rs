use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::Result;

/// Watch session configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Retry policy applied to store faults (anything but a transport
    /// timeout) raised by the initial fetch or by a long-poll.
    ///
    /// Once retries are exhausted the session terminates and reports the
    /// fault through its handle. `max_retries = 0` terminates on the first
    /// fault.
    #[serde(default = "default_fault_backoff")]
    pub fault_backoff: BackoffPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            fault_backoff: default_fault_backoff(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        self.fault_backoff.validate("watch.fault_backoff")
    }
}

fn default_fault_backoff() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 3,
        base_delay_ms: 100,
        max_delay_ms: 2000,
    }
}
