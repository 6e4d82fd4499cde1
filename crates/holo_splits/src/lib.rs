//! Column-aware split planning for columnar table scans.
//!
//! Given a table layout and the columns a query reads, the planner:
//! - matches the column set against recorded access patterns to choose the
//!   row-group split size and an optional projection-path substitution,
//! - caches the pattern indexes per table, rebuilding them when the layout
//!   version moves forward,
//! - emits deterministic read tasks (file, row-group range, candidate hosts),
//!   pinning compact files to the node caching their hot column chunks when
//!   the table is the cluster's cache-resident table.
//!
//! Metadata, file system and cache coordination are reached through the
//! traits in [`services`]; [`StaticCluster`] implements all of them from a
//! JSON snapshot.

pub mod column_set;
pub mod config;
pub mod coordination;
pub mod error;
pub mod index;
pub mod index_cache;
pub mod layout;
pub mod metrics;
pub mod pattern;
pub mod placement;
pub mod planner;
pub mod services;
pub mod static_cluster;
pub mod table;
pub mod task;

pub use column_set::ColumnSet;
pub use config::PlannerConfig;
pub use coordination::{KeyValueStore, KvCacheCoordinator, MemoryKeyValueStore};
pub use error::{CacheUnusableReason, LayoutError, PlanError, PlanStep};
pub use index::{Coverage, PatternIndex, ProjectionsIndex, SplitsIndex};
pub use index_cache::{CacheOutcome, IndexCache};
pub use layout::{Layout, Path};
pub use metrics::{PlannerMetrics, PlannerMetricsSnapshot};
pub use pattern::{AccessPattern, ProjectionPattern, SplitPattern};
pub use placement::{resolve_placement, CachePlacement};
pub use planner::{ReadChoice, SplitPlanner, SplitSizeSource};
pub use services::{
    CacheCoordinator, MetadataService, NodeFileManifest, PathListing, PlannerServices,
    StorageLocality,
};
pub use static_cluster::StaticCluster;
pub use table::TableKey;
pub use task::{row_group_ranges, ReadTask};
