use std::sync::Arc;

use super::Client;
use super::ConfigClient;
use super::RegistryClient;
use crate::config::validate_segment;
use crate::BeaconConfig;
use crate::Error;
use crate::PathScheme;
use crate::Result;
use crate::StoreClient;
use crate::WatchConfig;
use crate::WatchLoop;

pub struct ClientBuilder {
    store: Arc<dyn StoreClient>,
    config: BeaconConfig,
    program: Option<String>,
    instance: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with default config on top of `store`
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            config: BeaconConfig::default(),
            program: None,
            instance: None,
        }
    }

    /// Set the root namespace (default: "fog")
    pub fn namespace(
        mut self,
        namespace: impl Into<String>,
    ) -> Self {
        self.config.scope.namespace = namespace.into();
        self
    }

    /// Set the cluster (default: "default")
    pub fn cluster(
        mut self,
        cluster: impl Into<String>,
    ) -> Self {
        self.config.scope.cluster = cluster.into();
        self
    }

    /// Program whose configuration is read and under which this process
    /// registers (required)
    pub fn program(
        mut self,
        program: impl Into<String>,
    ) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Name of this process among the program's instances (required)
    pub fn instance(
        mut self,
        instance: impl Into<String>,
    ) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the watch session configuration
    pub fn watch_config(
        mut self,
        config: WatchConfig,
    ) -> Self {
        self.config.watch = config;
        self
    }

    /// Completely replaces the default configuration
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through individual
    /// methods like [`cluster`](ClientBuilder::cluster) or
    /// [`watch_config`](ClientBuilder::watch_config).
    ///
    /// # Example: Configuration from file and environment
    /// ```ignore
    /// let client = Client::builder(store)
    ///     .set_config(BeaconConfig::new()?)
    ///     .program("billing")
    ///     .instance("billing-0")
    ///     .build()?;
    /// ```
    pub fn set_config(
        mut self,
        config: BeaconConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Build the client with current configuration
    pub fn build(self) -> Result<Client> {
        let config = self.config.validate()?;
        let program = required("program", self.program)?;
        let instance = required("instance", self.instance)?;

        let paths = PathScheme::from_scope(&config.scope);
        let watch_loop = WatchLoop::new(self.store.clone(), config.watch);

        Ok(Client {
            config: ConfigClient::new(paths.clone(), program.clone(), watch_loop),
            registry: RegistryClient::new(self.store, paths.clone(), program, instance),
            paths,
        })
    }
}

fn required(
    name: &str,
    value: Option<String>,
) -> Result<String> {
    let value = value.ok_or_else(|| Error::InvalidConfig(format!("{name} must be set")))?;
    validate_segment(name, &value)?;
    Ok(value)
}
