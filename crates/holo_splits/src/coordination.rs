//! Cache coordination on top of a key/value store.
//!
//! The cache daemon publishes the live cache version under
//! [`CACHE_VERSION_KEY`] and one manifest per node under
//! `location_<version>_<node>`, whose value lists the node's cached files
//! separated by `;`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::{CacheCoordinator, NodeFileManifest};

/// Key holding the current cache version.
pub const CACHE_VERSION_KEY: &str = "cache_version";
/// Prefix of per-node cache manifest keys.
pub const CACHE_LOCATION_PREFIX: &str = "location_";

/// Minimal read interface of the coordination key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

/// In-memory key/value snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl FromIterator<(String, String)> for MemoryKeyValueStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// [`CacheCoordinator`] reading the cache key scheme from a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct KvCacheCoordinator<S> {
    store: S,
}

impl<S: KeyValueStore> KvCacheCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> CacheCoordinator for KvCacheCoordinator<S> {
    fn current_cache_version(&self) -> Result<Option<String>> {
        read_cache_version(&self.store)
    }

    fn node_file_manifests(&self, cache_version: &str) -> Result<Vec<NodeFileManifest>> {
        read_node_manifests(&self.store, cache_version)
    }
}

/// Reads the live cache version; blank values count as absent.
pub fn read_cache_version(store: &dyn KeyValueStore) -> Result<Option<String>> {
    Ok(store
        .get(CACHE_VERSION_KEY)?
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty()))
}

/// Reads every node manifest published for `cache_version`.
pub fn read_node_manifests(
    store: &dyn KeyValueStore,
    cache_version: &str,
) -> Result<Vec<NodeFileManifest>> {
    // The trailing separator keeps version 1 from matching keys of version 10.
    let prefix = manifest_key_prefix(cache_version);
    let mut manifests = Vec::new();
    for (key, files) in store.scan_prefix(&prefix)? {
        let node = &key[prefix.len()..];
        if node.is_empty() {
            warn!(key = %key, "cache manifest key has no node identity; skipping");
            continue;
        }
        manifests.push(NodeFileManifest::new(node, files));
    }
    Ok(manifests)
}

/// Key of the manifest published by `node` for `cache_version`.
pub fn manifest_key(cache_version: &str, node: &str) -> String {
    format!("{}{node}", manifest_key_prefix(cache_version))
}

fn manifest_key_prefix(cache_version: &str) -> String {
    format!("{CACHE_LOCATION_PREFIX}{cache_version}_")
}
