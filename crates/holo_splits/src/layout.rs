//! Physical table layouts as delivered by the metadata service.
//!
//! A layout describes one readable version of a table's storage: which
//! directories hold whole-file ("ordered") data, which hold row-group packed
//! ("compact") data, the narrower projection directories, and the recorded
//! access patterns used to tune split size and projection reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// One storage directory declared by a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Metadata id used for file listing.
    pub id: u64,
    /// Directory URI; file names are appended to it.
    pub uri: String,
}

impl Path {
    pub fn new(id: u64, uri: impl Into<String>) -> Self {
        Self {
            id,
            uri: uri.into(),
        }
    }

    /// Joins a file name onto this directory, inserting a separator if needed.
    pub fn join(&self, file_name: &str) -> String {
        if self.uri.ends_with('/') {
            format!("{}{}", self.uri, file_name)
        } else {
            format!("{}/{}", self.uri, file_name)
        }
    }
}

/// Declared column order of the table data files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ordered {
    pub column_order: Vec<String>,
}

/// One historically recorded split-size observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSplitPattern {
    /// Indexes into [`Ordered::column_order`].
    pub accessed_columns: Vec<usize>,
    pub num_row_group_in_split: u32,
}

/// Split configuration of a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Splits {
    pub num_row_group_in_file: u32,
    #[serde(default)]
    pub split_patterns: Vec<RecordedSplitPattern>,
}

/// One recorded projection: the column subset it serves and the paths holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedProjectionPattern {
    /// Indexes into [`Ordered::column_order`].
    pub accessed_columns: Vec<usize>,
    /// Keys into [`Layout::projection_paths`].
    pub path_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projections {
    #[serde(default)]
    pub projection_patterns: Vec<RecordedProjectionPattern>,
}

/// Compaction configuration of a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compact {
    /// Column-chunk order inside compact files.
    #[serde(default)]
    pub column_chunk_order: Vec<String>,
    /// Number of leading column-chunk orders eligible for the cluster cache.
    #[serde(default)]
    pub cache_border: usize,
}

/// One readable layout version of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Monotonically increasing layout version.
    pub version: u64,
    pub ordered: Ordered,
    #[serde(default)]
    pub ordered_paths: Vec<Path>,
    #[serde(default)]
    pub compact_paths: Vec<Path>,
    /// Projection directories keyed by path id.
    #[serde(default)]
    pub projection_paths: BTreeMap<u64, Path>,
    pub splits: Splits,
    #[serde(default)]
    pub projections: Projections,
    #[serde(default)]
    pub compact: Compact,
}

impl Layout {
    pub fn column_order(&self) -> &[String] {
        &self.ordered.column_order
    }

    pub fn row_groups_per_file(&self) -> u32 {
        self.splits.num_row_group_in_file
    }

    /// Leading column-chunk orders eligible for caching, clamped to the chunk order length.
    pub fn cache_ordered_column_chunks(&self) -> Vec<String> {
        let border = self
            .compact
            .cache_border
            .min(self.compact.column_chunk_order.len());
        self.compact.column_chunk_order[..border].to_vec()
    }

    /// Resolves projection path ids against the projection path table.
    pub fn resolve_projection_paths(&self, path_ids: &[u64]) -> Result<Vec<Path>, LayoutError> {
        path_ids
            .iter()
            .map(|id| {
                self.projection_paths
                    .get(id)
                    .cloned()
                    .ok_or(LayoutError::UnknownProjectionPath { path_id: *id })
            })
            .collect()
    }

    /// Validates fields the planner relies on before any index is built.
    pub fn validate(&self) -> Result<(), LayoutError> {
        // Compact and projection files are split by row group, so they need a
        // positive row-group count to derive the default split size.
        let needs_row_groups =
            !self.compact_paths.is_empty() || !self.projection_paths.is_empty();
        if needs_row_groups && self.splits.num_row_group_in_file == 0 {
            return Err(LayoutError::ZeroRowGroups);
        }
        for (key, path) in &self.projection_paths {
            if *key != path.id {
                return Err(LayoutError::ProjectionPathIdMismatch {
                    key: *key,
                    path_id: path.id,
                });
            }
        }
        for recorded in &self.projections.projection_patterns {
            if let Some(&path_id) = recorded
                .path_ids
                .iter()
                .find(|id| !self.projection_paths.contains_key(*id))
            {
                return Err(LayoutError::UnknownProjectionPath { path_id });
            }
        }
        for path in self
            .ordered_paths
            .iter()
            .chain(self.compact_paths.iter())
            .chain(self.projection_paths.values())
        {
            if path.uri.trim().is_empty() {
                return Err(LayoutError::EmptyPathUri { path_id: path.id });
            }
        }
        Ok(())
    }
}
