//! Work item type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One independent unit of batch work.
///
/// An item is an opaque identifier (file path, package name, repository
/// directory, feed URL) plus whatever parameters a tool needs to build its
/// command line. Items are built once and handed by value to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

impl WorkItem {
    /// Create an item with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
            params: BTreeMap::new(),
        }
    }

    /// Create an item for a filesystem path; the id is the displayed path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: path.display().to_string(),
            path: Some(path),
            params: BTreeMap::new(),
        }
    }

    /// Attach a filesystem path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach a named parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Item identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filesystem path, if the item has one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The path if present, else the id interpreted as a path.
    pub fn path_or_id(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.id))
    }

    /// Look up a parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// All parameters.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
