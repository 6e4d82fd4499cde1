//! External collaborators consulted while planning.
//!
//! All calls are synchronous and made from the planning thread. Failures are
//! reported as `anyhow::Error`; the planner attaches table, layout version and
//! step before surfacing them.

use std::sync::Arc;

use anyhow::Result;

use crate::layout::{Layout, Path};
use crate::table::TableKey;

/// Metadata service holding layout records.
pub trait MetadataService: Send + Sync {
    /// All readable layout versions of `table`, oldest first.
    fn layouts(&self, table: &TableKey) -> Result<Vec<Layout>>;
}

/// Directory listing of the distributed file system.
pub trait PathListing: Send + Sync {
    /// File names (not full paths) stored under `path`.
    fn list_files(&self, path: &Path) -> Result<Vec<String>>;
}

/// File status and block locality of the distributed file system.
pub trait StorageLocality: Send + Sync {
    fn file_length(&self, file_path: &str) -> Result<u64>;

    /// Hosts holding replicas of `file_path`, in preference order.
    fn replica_hosts(&self, file_path: &str) -> Result<Vec<String>>;
}

/// Files cached on one node for a given cache version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFileManifest {
    pub node: String,
    /// Semicolon-delimited full file paths.
    pub files: String,
}

impl NodeFileManifest {
    pub fn new(node: impl Into<String>, files: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            files: files.into(),
        }
    }

    /// Non-empty file entries of the manifest.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Cluster cache coordination store.
pub trait CacheCoordinator: Send + Sync {
    /// The current cache version token, `None` when no cache is published.
    fn current_cache_version(&self) -> Result<Option<String>>;

    fn node_file_manifests(&self, cache_version: &str) -> Result<Vec<NodeFileManifest>>;
}

/// Bundle of collaborators a planner talks to.
#[derive(Clone)]
pub struct PlannerServices {
    pub metadata: Arc<dyn MetadataService>,
    pub listing: Arc<dyn PathListing>,
    pub locality: Arc<dyn StorageLocality>,
    pub coordinator: Arc<dyn CacheCoordinator>,
}

impl PlannerServices {
    /// Uses one value implementing every collaborator role.
    pub fn from_cluster<C>(cluster: Arc<C>) -> Self
    where
        C: MetadataService + PathListing + StorageLocality + CacheCoordinator + 'static,
    {
        Self {
            metadata: cluster.clone(),
            listing: cluster.clone(),
            locality: cluster.clone(),
            coordinator: cluster,
        }
    }
}

impl std::fmt::Debug for PlannerServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerServices").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_skips_empty_entries() {
        let manifest = NodeFileManifest::new("node1", "a.pxl;; b.pxl ;");
        assert_eq!(manifest.file_names().collect::<Vec<_>>(), vec!["a.pxl", "b.pxl"]);
    }
}
