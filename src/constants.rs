// -
// Path scheme

/// Root namespace used when none is configured
pub(crate) const DEFAULT_NAMESPACE: &str = "fog";

/// Cluster used when none is configured
pub(crate) const DEFAULT_CLUSTER: &str = "default";

/// Separator between path segments
pub const PATH_SEPARATOR: &str = "/";

/// Segment under which service registrations live
pub const REGISTRY_SEGMENT: &str = "registry";

/// Segment under which program configuration lives
pub const CONFIG_SEGMENT: &str = "config";

// -
// Embedded store

/// Number of change events kept by the in-memory store for long-poll catch-up
pub(crate) const DEFAULT_HISTORY_CAPACITY: usize = 1000;
