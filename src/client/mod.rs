//! Scoped clients for configuration and service registration
//!
//! - [`Client`] - Main entry point bound to one program instance
//! - [`ClientBuilder`] - Configurable client construction
//! - [`ConfigClient`] - Typed config values, collections and watches
//! - [`RegistryClient`] - Service registration and discovery
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//! use fogbeacon::{Client, MemoryStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = Client::builder(Arc::new(MemoryStore::new()))
//!         .cluster("staging")
//!         .program("billing")
//!         .instance("billing-0")
//!         .build()
//!         .unwrap();
//!
//!     client.config().set("rate_limit", &250u32).await.unwrap();
//!     let limit: Option<u32> = client.config().get("rate_limit").await.unwrap();
//!     println!("rate limit: {:?}", limit);
//!
//!     client.registry().expose(8080, None).await.unwrap();
//!     let peers = client.registry().locate("billing", None).await.unwrap();
//!     println!("billing instances: {:?}", peers);
//! }
//! ```

mod builder;
mod config_client;
mod registry;

pub use builder::*;
pub use config_client::*;
pub use registry::*;


use std::sync::Arc;

use crate::PathScheme;
use crate::StoreClient;

/// Main entry point bound to one program instance
///
/// Provides access to specialized clients:
/// - Use [`config()`](Client::config) for configuration values
/// - Use [`registry()`](Client::registry) for registration and discovery
///
/// Created through the [`builder()`](Client::builder) method. Cloning is
/// cheap; clones share the store client.
#[derive(Clone)]
pub struct Client {
    pub(super) config: ConfigClient,
    pub(super) registry: RegistryClient,
    pub(super) paths: PathScheme,
}

impl Client {
    /// Access the configuration client
    ///
    /// # Examples
    /// ```rust,ignore
    /// client.config().set("timeout_ms", &500).await?;
    /// ```
    pub fn config(&self) -> &ConfigClient {
        &self.config
    }

    /// Access the registry client
    ///
    /// # Examples
    /// ```rust,ignore
    /// client.registry().expose(9000, None).await?;
    /// ```
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Namespace and cluster every path is scoped under
    pub fn paths(&self) -> &PathScheme {
        &self.paths
    }

    /// Create a configured client builder
    ///
    /// Chain configuration methods before calling
    /// [`build()`](ClientBuilder::build).
    ///
    /// # Arguments
    /// * `store` - Store client shared by every operation and watch session
    pub fn builder(store: Arc<dyn StoreClient>) -> ClientBuilder {
        ClientBuilder::new(store)
    }
}
