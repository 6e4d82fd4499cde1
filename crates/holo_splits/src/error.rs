//! Error types surfaced by split planning.
//!
//! Collaborator failures arrive as `anyhow::Error` and are wrapped into
//! [`PlanError`] together with the table, layout version and planning step
//! that failed. Nothing here is retried; callers own retry policy.

use std::fmt;

use thiserror::Error;

use crate::table::TableKey;

/// Structural problems in a layout record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout declares compact or projection paths but zero row groups per file")]
    ZeroRowGroups,

    #[error("projection path table key {key} does not match path id {path_id}")]
    ProjectionPathIdMismatch { key: u64, path_id: u64 },

    #[error("path {path_id} has an empty uri")]
    EmptyPathUri { path_id: u64 },

    #[error("projection path id {path_id} is not declared by the layout")]
    UnknownProjectionPath { path_id: u64 },

    #[error(
        "pattern {pattern} references column index {index} but the column order has {column_count} columns"
    )]
    ColumnIndexOutOfRange {
        pattern: usize,
        index: usize,
        column_count: usize,
    },

    #[error("split pattern {pattern} has a split size of zero")]
    ZeroSplitSize { pattern: usize },

    #[error("projection pattern {pattern} has no path ids")]
    EmptyProjectionPaths { pattern: usize },
}

/// Sub-step of planning that touched an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    ListFiles { path_id: u64 },
    FileLength { path: String },
    ReplicaHosts { path: String },
    ReadCacheVersion,
    ReadCacheManifests { cache_version: String },
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::ListFiles { path_id } => write!(f, "listing files of path {path_id}"),
            PlanStep::FileLength { path } => write!(f, "reading file length of {path}"),
            PlanStep::ReplicaHosts { path } => write!(f, "resolving replica hosts of {path}"),
            PlanStep::ReadCacheVersion => write!(f, "reading cache version"),
            PlanStep::ReadCacheManifests { cache_version } => {
                write!(f, "reading cache manifests for version {cache_version}")
            }
        }
    }
}

/// Why a table configured as cache-resident cannot use the cache right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheUnusableReason {
    /// The coordination store has no current cache version.
    MissingVersion,
    /// No node published a file manifest for the current version.
    EmptyManifest { cache_version: String },
}

impl fmt::Display for CacheUnusableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheUnusableReason::MissingVersion => write!(f, "cache version not found"),
            CacheUnusableReason::EmptyManifest { cache_version } => {
                write!(f, "no cached file manifests for cache version {cache_version}")
            }
        }
    }
}

/// Planning failure returned to the caller. No partial task list accompanies it.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("metadata resolution failed for {table}")]
    MetadataResolution {
        table: TableKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid layout version {version} for {table}")]
    InvalidLayout {
        table: TableKey,
        version: u64,
        #[source]
        source: LayoutError,
    },

    #[error("storage failure for {table} layout version {version} while {step}")]
    Storage {
        table: TableKey,
        version: u64,
        step: PlanStep,
        #[source]
        source: anyhow::Error,
    },

    #[error("cache unusable for {table} layout version {version}: {reason}")]
    CacheUnusable {
        table: TableKey,
        version: u64,
        reason: CacheUnusableReason,
    },
}

impl PlanError {
    pub fn table(&self) -> &TableKey {
        match self {
            PlanError::MetadataResolution { table, .. }
            | PlanError::InvalidLayout { table, .. }
            | PlanError::Storage { table, .. }
            | PlanError::CacheUnusable { table, .. } => table,
        }
    }

    /// Layout version the failure belongs to, when one had been resolved.
    pub fn layout_version(&self) -> Option<u64> {
        match self {
            PlanError::MetadataResolution { .. } => None,
            PlanError::InvalidLayout { version, .. }
            | PlanError::Storage { version, .. }
            | PlanError::CacheUnusable { version, .. } => Some(*version),
        }
    }

    /// Short stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::MetadataResolution { .. } => "metadata_resolution",
            PlanError::InvalidLayout { .. } => "invalid_layout",
            PlanError::Storage { .. } => "storage",
            PlanError::CacheUnusable { .. } => "cache_unusable",
        }
    }
}
