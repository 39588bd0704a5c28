use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CLUSTER;
use crate::constants::DEFAULT_NAMESPACE;
use crate::Error;
use crate::Result;

/// Leading path segments shared by every key a client touches
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Root namespace of all registry and config keys
    /// Default: "fog"
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Cluster the process belongs to
    /// Default: "default"
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            cluster: default_cluster(),
        }
    }
}

impl ScopeConfig {
    pub fn validate(&self) -> Result<()> {
        validate_segment("scope.namespace", &self.namespace)?;
        validate_segment("scope.cluster", &self.cluster)?;
        Ok(())
    }
}

/// A path segment must be non-empty and must not contain the separator
pub(crate) fn validate_segment(
    name: &str,
    value: &str,
) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidConfig(format!("{name} cannot be empty")));
    }
    if value.contains('/') {
        return Err(Error::InvalidConfig(format!(
            "{name} must not contain '/': {value}"
        )));
    }
    Ok(())
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}
fn default_cluster() -> String {
    DEFAULT_CLUSTER.to_string()
}
