//! Service registration and live configuration for processes sharing a
//! hierarchical, versioned key-value store.
//!
//! - [`Client`] - scoped entry point bound to one program instance
//! - [`ConfigClient`] - typed config values, collections and watches
//! - [`RegistryClient`] - expose and locate service instances
//! - [`WatchLoop`] - the long-poll watch engine behind every watch
//! - [`StoreClient`] - the store contract, with [`MemoryStore`] as an
//!   embedded implementation

mod client;
mod config;
mod constants;
mod errors;
mod path;
mod storage;
mod watch;

pub use client::*;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use path::*;
pub use storage::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
