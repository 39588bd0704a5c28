use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::path::relative_key;
use crate::Error;
use crate::FetchOptions;
use crate::Node;
use crate::PathScheme;
use crate::Result;
use crate::StoreClient;

/// Record an instance publishes so others can find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub port: u16,

    /// Instance that published the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Purpose of the endpoint when an instance exposes several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Service registration and discovery
///
/// Registrations are stored under
/// `<namespace>/<cluster>/registry/<program>/<instance>[/<intent>]`. They
/// never expire; keeping them current is up to the caller.
#[derive(Clone)]
pub struct RegistryClient {
    store: Arc<dyn StoreClient>,
    paths: PathScheme,
    program: String,
    instance: String,
}

impl RegistryClient {
    pub(crate) fn new(
        store: Arc<dyn StoreClient>,
        paths: PathScheme,
        program: String,
        instance: String,
    ) -> Self {
        Self {
            store,
            paths,
            program,
            instance,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Publishes this instance on `port`, replacing an earlier registration
    /// for the same intent
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `port` is 0 or `intent` is not a
    ///   single path segment
    /// - [`Error::Store`] if the write fails
    pub async fn expose(
        &self,
        port: u16,
        intent: Option<&str>,
    ) -> Result<Registration> {
        if port == 0 {
            return Err(Error::InvalidArgument("port must be non-zero".to_string()));
        }
        if let Some(intent) = intent {
            if intent.is_empty() || intent.contains('/') {
                return Err(Error::InvalidArgument(format!(
                    "intent must be a single path segment: {intent:?}"
                )));
            }
        }

        let registration = Registration {
            port,
            instance: Some(self.instance.clone()),
            intent: intent.map(str::to_string),
        };
        let path = self.paths.registry(&self.program, &self.instance, intent);
        self.store
            .write(&path, serde_json::to_string(&registration)?)
            .await?;

        debug!(%path, port, "instance exposed");
        Ok(registration)
    }

    /// Every registration published for `program`, optionally narrowed to
    /// one intent
    ///
    /// Without an intent only registrations made without one are returned.
    /// Order is unspecified. An unknown program yields an empty list.
    /// Records that fail to decode are skipped.
    pub async fn locate(
        &self,
        program: &str,
        intent: Option<&str>,
    ) -> Result<Vec<Registration>> {
        let path = self.paths.registry_dir(program);
        let Some(dir) = self.store.fetch(&path, FetchOptions::recursive(true)).await? else {
            return Ok(Vec::new());
        };

        let leaves: Vec<&Node> = match intent {
            None => dir.children.iter().filter(|n| !n.is_directory).collect(),
            Some(intent) => dir
                .children
                .iter()
                .filter(|n| n.is_directory)
                .filter_map(|instance| {
                    instance
                        .children
                        .iter()
                        .find(|n| relative_key(&instance.key, &n.key) == Some(intent))
                })
                .collect(),
        };

        Ok(leaves.into_iter().filter_map(decode_registration).collect())
    }
}

fn decode_registration(node: &Node) -> Option<Registration> {
    let raw = node.value().filter(|raw| !raw.is_empty())?;
    match serde_json::from_str(raw) {
        Ok(registration) => Some(registration),
        Err(e) => {
            warn!(key = %node.key, "skipping malformed registration: {}", e);
            None
        }
    }
}
