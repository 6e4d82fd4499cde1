//! JSON-described cluster snapshot implementing every planner collaborator.
//!
//! Used by `splitctl` and tests to plan against a fixed set of layouts,
//! directory listings, file locality and cache coordination entries.
//!
//! ```json
//! {
//!   "tables": { "tpch.orders": [ { "version": 1, ... } ] },
//!   "directories": { "1": ["part-0.pxl"] },
//!   "files": { "hdfs://nn/orders/part-0.pxl": { "length": 4096, "hosts": ["dn1"] } },
//!   "cacheKv": { "cache_version": "3", "location_3_node1": "..." }
//! }
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::coordination::{read_cache_version, read_node_manifests, MemoryKeyValueStore};
use crate::layout::{Layout, Path};
use crate::services::{
    CacheCoordinator, MetadataService, NodeFileManifest, PathListing, StorageLocality,
};
use crate::table::TableKey;

/// Status and replica locations of one stored file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub length: u64,
    #[serde(default)]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCluster {
    /// Layouts keyed by `schema.table`, oldest first.
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Layout>>,
    /// File names keyed by directory path id.
    #[serde(default)]
    pub directories: BTreeMap<u64, Vec<String>>,
    /// File status keyed by full file path.
    #[serde(default)]
    pub files: BTreeMap<String, FileStatus>,
    #[serde(default)]
    pub cache_kv: MemoryKeyValueStore,
}

impl StaticCluster {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse cluster fixture")
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read cluster fixture '{}'", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("load cluster fixture '{}'", path.display()))
    }

    /// Registers a layout for `table`, keeping layouts ordered by version.
    pub fn add_layout(&mut self, table: &TableKey, layout: Layout) {
        let layouts = self.tables.entry(table.to_string()).or_default();
        layouts.push(layout);
        layouts.sort_by_key(|layout| layout.version);
    }

    pub fn add_directory<S: Into<String>>(
        &mut self,
        path_id: u64,
        files: impl IntoIterator<Item = S>,
    ) {
        self.directories
            .insert(path_id, files.into_iter().map(Into::into).collect());
    }

    pub fn add_file<S: Into<String>>(
        &mut self,
        file_path: impl Into<String>,
        length: u64,
        hosts: impl IntoIterator<Item = S>,
    ) {
        self.files.insert(
            file_path.into(),
            FileStatus {
                length,
                hosts: hosts.into_iter().map(Into::into).collect(),
            },
        );
    }

    fn file(&self, file_path: &str) -> Result<&FileStatus> {
        self.files
            .get(file_path)
            .ok_or_else(|| anyhow!("file '{file_path}' not found"))
    }
}

impl MetadataService for StaticCluster {
    fn layouts(&self, table: &TableKey) -> Result<Vec<Layout>> {
        self.tables
            .iter()
            .find(|(name, _)| {
                name.parse::<TableKey>()
                    .map(|key| key == *table)
                    .unwrap_or(false)
            })
            .map(|(_, layouts)| layouts.clone())
            .ok_or_else(|| anyhow!("table '{table}' not found"))
    }
}

impl PathListing for StaticCluster {
    fn list_files(&self, path: &Path) -> Result<Vec<String>> {
        self.directories
            .get(&path.id)
            .cloned()
            .ok_or_else(|| anyhow!("directory {} ('{}') not found", path.id, path.uri))
    }
}

impl StorageLocality for StaticCluster {
    fn file_length(&self, file_path: &str) -> Result<u64> {
        Ok(self.file(file_path)?.length)
    }

    fn replica_hosts(&self, file_path: &str) -> Result<Vec<String>> {
        Ok(self.file(file_path)?.hosts.clone())
    }
}

impl CacheCoordinator for StaticCluster {
    fn current_cache_version(&self) -> Result<Option<String>> {
        read_cache_version(&self.cache_kv)
    }

    fn node_file_manifests(&self, cache_version: &str) -> Result<Vec<NodeFileManifest>> {
        read_node_manifests(&self.cache_kv, cache_version)
    }
}
