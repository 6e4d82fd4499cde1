//! Cache-affinity placement for the cluster's cache-resident table.
//!
//! When a table is configured as cache-resident, compact-file tasks are pinned
//! to the node that holds the file's hot column chunks. The placement is a
//! snapshot taken once per planning call.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{CacheUnusableReason, PlanError, PlanStep};
use crate::layout::Layout;
use crate::services::CacheCoordinator;
use crate::table::TableKey;

/// Snapshot of which node caches which compact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePlacement {
    pub cache_version: String,
    /// Full file path to holding node.
    locations: HashMap<String, String>,
    /// Leading column-chunk orders eligible for caching.
    pub cache_ordered_column_chunks: Vec<String>,
}

impl CachePlacement {
    /// Node caching `file_path`, if the manifest lists it.
    pub fn holder(&self, file_path: &str) -> Option<&str> {
        self.locations.get(file_path).map(String::as_str)
    }

    pub fn cached_file_count(&self) -> usize {
        self.locations.len()
    }
}

/// Reads the current cache snapshot for `layout`.
///
/// A missing version or an empty manifest set fails the call: a table
/// configured as cache-resident whose cache cannot be reached is an
/// operational error, not a reason to plan cold reads silently.
pub fn resolve_placement(
    coordinator: &dyn CacheCoordinator,
    table: &TableKey,
    layout: &Layout,
) -> Result<CachePlacement, PlanError> {
    let version = layout.version;
    let cache_version = coordinator
        .current_cache_version()
        .map_err(|source| PlanError::Storage {
            table: table.clone(),
            version,
            step: PlanStep::ReadCacheVersion,
            source,
        })?
        .ok_or_else(|| PlanError::CacheUnusable {
            table: table.clone(),
            version,
            reason: CacheUnusableReason::MissingVersion,
        })?;

    let manifests = coordinator
        .node_file_manifests(&cache_version)
        .map_err(|source| PlanError::Storage {
            table: table.clone(),
            version,
            step: PlanStep::ReadCacheManifests {
                cache_version: cache_version.clone(),
            },
            source,
        })?;
    if manifests.is_empty() {
        return Err(PlanError::CacheUnusable {
            table: table.clone(),
            version,
            reason: CacheUnusableReason::EmptyManifest { cache_version },
        });
    }

    // Later manifests win when two nodes list the same file.
    let mut locations = HashMap::new();
    for manifest in &manifests {
        for file in manifest.file_names() {
            locations.insert(file.to_string(), manifest.node.clone());
        }
    }

    debug!(
        table = %table,
        layout_version = version,
        cache_version = %cache_version,
        nodes = manifests.len(),
        cached_files = locations.len(),
        "resolved cache placement"
    );

    Ok(CachePlacement {
        cache_version,
        locations,
        cache_ordered_column_chunks: layout.cache_ordered_column_chunks(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{
        manifest_key, KvCacheCoordinator, MemoryKeyValueStore, CACHE_VERSION_KEY,
    };
    use crate::layout::{Compact, Ordered, Splits};
    use anyhow::anyhow;

    fn layout() -> Layout {
        Layout {
            version: 2,
            ordered: Ordered {
                column_order: vec!["a".into(), "b".into()],
            },
            ordered_paths: Vec::new(),
            compact_paths: Vec::new(),
            projection_paths: Default::default(),
            splits: Splits {
                num_row_group_in_file: 4,
                split_patterns: Vec::new(),
            },
            projections: Default::default(),
            compact: Compact {
                column_chunk_order: vec!["0:0".into(), "0:1".into(), "1:0".into()],
                cache_border: 2,
            },
        }
    }

    fn table() -> TableKey {
        TableKey::new("tpch", "orders")
    }

    #[test]
    fn maps_files_to_nodes() {
        let mut store = MemoryKeyValueStore::new();
        store.insert(CACHE_VERSION_KEY, "9");
        store.insert(manifest_key("9", "n1"), "/d/f1;/d/f2");
        store.insert(manifest_key("9", "n2"), "/d/f3;/d/f2");
        let coordinator = KvCacheCoordinator::new(store);

        let placement = resolve_placement(&coordinator, &table(), &layout()).unwrap();
        assert_eq!(placement.cache_version, "9");
        assert_eq!(placement.holder("/d/f1"), Some("n1"));
        assert_eq!(placement.holder("/d/f2"), Some("n2"));
        assert_eq!(placement.holder("/d/missing"), None);
        assert_eq!(placement.cache_ordered_column_chunks, vec!["0:0", "0:1"]);
        assert_eq!(placement.cached_file_count(), 3);
    }

    #[test]
    fn missing_version_is_cache_unusable() {
        let coordinator = KvCacheCoordinator::new(MemoryKeyValueStore::new());
        let err = resolve_placement(&coordinator, &table(), &layout()).unwrap_err();
        assert!(matches!(
            err,
            PlanError::CacheUnusable {
                reason: CacheUnusableReason::MissingVersion,
                version: 2,
                ..
            }
        ));
    }

    #[test]
    fn empty_manifest_is_cache_unusable() {
        let mut store = MemoryKeyValueStore::new();
        store.insert(CACHE_VERSION_KEY, "3");
        let coordinator = KvCacheCoordinator::new(store);
        let err = resolve_placement(&coordinator, &table(), &layout()).unwrap_err();
        match err {
            PlanError::CacheUnusable {
                reason: CacheUnusableReason::EmptyManifest { cache_version },
                ..
            } => assert_eq!(cache_version, "3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    struct BrokenCoordinator;

    impl CacheCoordinator for BrokenCoordinator {
        fn current_cache_version(&self) -> anyhow::Result<Option<String>> {
            Err(anyhow!("coordination store unreachable"))
        }

        fn node_file_manifests(
            &self,
            _cache_version: &str,
        ) -> anyhow::Result<Vec<crate::services::NodeFileManifest>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn coordination_failure_is_storage_error() {
        let err = resolve_placement(&BrokenCoordinator, &table(), &layout()).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Storage {
                step: PlanStep::ReadCacheVersion,
                ..
            }
        ));
    }
}
