use serde::Deserialize;
use serde::Serialize;

/// Snapshot of one store path: either a leaf carrying a value or a
/// directory carrying children
///
/// Wire shape: `{key, isDirectory, value?, modifiedIndex, children?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Full path of the node
    pub key: String,

    #[serde(default)]
    pub is_directory: bool,

    /// Raw text; only set on leaves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Store index at which this node was last modified
    pub modified_index: u64,

    /// Ordered children; only set on directories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn leaf(
        key: impl Into<String>,
        value: impl Into<String>,
        modified_index: u64,
    ) -> Self {
        Self {
            key: key.into(),
            is_directory: false,
            value: Some(value.into()),
            modified_index,
            children: Vec::new(),
        }
    }

    pub fn directory(
        key: impl Into<String>,
        modified_index: u64,
        children: Vec<Node>,
    ) -> Self {
        Self {
            key: key.into(),
            is_directory: true,
            value: None,
            modified_index,
            children,
        }
    }

    /// Highest `modified_index` found on this node and every node below it
    pub fn max_modified_index(&self) -> u64 {
        self.children
            .iter()
            .map(Node::max_modified_index)
            .fold(self.modified_index, u64::max)
    }

    /// Raw value of a leaf, `None` for directories
    pub fn value(&self) -> Option<&str> {
        if self.is_directory {
            return None;
        }
        self.value.as_deref()
    }
}
