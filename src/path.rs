//! Store path naming
//!
//! Every key the clients touch is built from the same segment layout:
//!
//! ```text
//! <namespace>/<cluster>/registry/<program>/<instance>[/<intent>]
//! <namespace>/<cluster>/config/<program>/<key>[/<child_key>]
//! ```

use crate::config::ScopeConfig;
use crate::constants::CONFIG_SEGMENT;
use crate::constants::PATH_SEPARATOR;
use crate::constants::REGISTRY_SEGMENT;

/// Builds hierarchical store paths for a fixed namespace and cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    namespace: String,
    cluster: String,
}

impl Default for PathScheme {
    fn default() -> Self {
        Self::from_scope(&ScopeConfig::default())
    }
}

impl PathScheme {
    pub fn new(
        namespace: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            cluster: cluster.into(),
        }
    }

    pub fn from_scope(scope: &ScopeConfig) -> Self {
        Self::new(scope.namespace.clone(), scope.cluster.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Leaf holding one instance's registration, optionally per intent
    pub fn registry(
        &self,
        program: &str,
        instance: &str,
        intent: Option<&str>,
    ) -> String {
        let mut segments = vec![
            self.namespace.as_str(),
            self.cluster.as_str(),
            REGISTRY_SEGMENT,
            program,
            instance,
        ];
        segments.extend(intent);
        join(&segments)
    }

    /// Directory holding every instance registered for `program`
    pub fn registry_dir(
        &self,
        program: &str,
    ) -> String {
        join(&[
            self.namespace.as_str(),
            self.cluster.as_str(),
            REGISTRY_SEGMENT,
            program,
        ])
    }

    /// Config entry (leaf or collection directory) of `program`
    pub fn config(
        &self,
        program: &str,
        key: &str,
    ) -> String {
        join(&[
            self.namespace.as_str(),
            self.cluster.as_str(),
            CONFIG_SEGMENT,
            program,
            key,
        ])
    }

    /// One entry of the config collection stored under `key`
    pub fn config_child(
        &self,
        program: &str,
        key: &str,
        child_key: &str,
    ) -> String {
        join(&[self.config(program, key).as_str(), child_key])
    }
}

/// Joins segments with the path separator
pub fn join(segments: &[&str]) -> String {
    segments.join(PATH_SEPARATOR)
}

/// Key of `key` relative to the directory `dir_key`, i.e. the suffix after
/// the directory key and its trailing separator.
///
/// Returns `None` when `key` does not live underneath `dir_key`.
pub fn relative_key<'a>(
    dir_key: &str,
    key: &'a str,
) -> Option<&'a str> {
    key.strip_prefix(dir_key)?
        .strip_prefix(PATH_SEPARATOR)
        .filter(|rest| !rest.is_empty())
}
