//! Split planning for columnar table scans.
//!
//! For one table layout and a requested column set the planner:
//! - picks the row-group split size (fixed override or splits index),
//! - picks the directories to read (projection substitution or compact paths),
//! - lists files and expands compact files into row-group range tasks,
//! - assigns candidate hosts, pinning cached compact files to their cache node.
//!
//! Task order is deterministic: ordered files first, then compact files in
//! listing order, each file's ranges ascending. Indexes and the cache snapshot
//! are resolved once per call from the newest layout and shared by every
//! layout the call plans.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::column_set::ColumnSet;
use crate::config::PlannerConfig;
use crate::error::{LayoutError, PlanError, PlanStep};
use crate::index::{Coverage, ProjectionsIndex, SplitsIndex};
use crate::index_cache::IndexCache;
use crate::layout::{Layout, Path};
use crate::metrics::PlannerMetrics;
use crate::pattern::{build_projection_patterns, build_split_patterns};
use crate::placement::{resolve_placement, CachePlacement};
use crate::services::PlannerServices;
use crate::table::TableKey;
use crate::task::{row_group_ranges, ReadTask};

/// Where the chosen split size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSizeSource {
    /// The configured fixed split size.
    Fixed,
    /// The splits index, with the coverage of the matched pattern.
    Index(Coverage),
}

/// Split size and directories chosen for one layout and column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadChoice {
    pub split_size: u32,
    pub split_size_source: SplitSizeSource,
    /// Projection path ids when a projection substitutes the compact paths.
    pub projection_path_ids: Option<Vec<u64>>,
    /// Directories whose files become row-group range tasks.
    pub read_paths: Vec<Path>,
}

/// How one planning call sizes its splits.
enum SplitSizing {
    Fixed(u32),
    Index(Arc<SplitsIndex>),
}

/// Indexes shared by every layout planned in one call.
struct ResolvedIndexes {
    splits: SplitSizing,
    projections: Option<Arc<ProjectionsIndex>>,
}

/// Plans read tasks; shareable across planning threads.
#[derive(Debug)]
pub struct SplitPlanner {
    config: PlannerConfig,
    services: PlannerServices,
    split_indexes: IndexCache<SplitsIndex>,
    projection_indexes: IndexCache<ProjectionsIndex>,
    metrics: Arc<PlannerMetrics>,
}

impl SplitPlanner {
    pub fn new(config: PlannerConfig, services: PlannerServices) -> Self {
        Self {
            config,
            services,
            split_indexes: IndexCache::new(),
            projection_indexes: IndexCache::new(),
            metrics: Arc::new(PlannerMetrics::default()),
        }
    }

    /// Shares an externally owned metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<PlannerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<PlannerMetrics> {
        &self.metrics
    }

    pub fn split_indexes(&self) -> &IndexCache<SplitsIndex> {
        &self.split_indexes
    }

    pub fn projection_indexes(&self) -> &IndexCache<ProjectionsIndex> {
        &self.projection_indexes
    }

    /// Plans every readable layout of `table`, concatenating tasks in layout order.
    pub fn plan_table<S: AsRef<str>>(
        &self,
        table: &TableKey,
        requested_columns: &[S],
    ) -> Result<Vec<ReadTask>, PlanError> {
        let layouts = match self.services.metadata.layouts(table) {
            Ok(layouts) if !layouts.is_empty() => layouts,
            Ok(_) => {
                return Err(self.fail(PlanError::MetadataResolution {
                    table: table.clone(),
                    source: anyhow::anyhow!("no readable layouts"),
                }))
            }
            Err(source) => {
                return Err(self.fail(PlanError::MetadataResolution {
                    table: table.clone(),
                    source,
                }))
            }
        };
        self.plan_layouts(table, requested_columns, &layouts)
    }

    /// Plans read tasks for one layout. Fails as a whole; never returns a partial list.
    pub fn plan<S: AsRef<str>>(
        &self,
        table: &TableKey,
        requested_columns: &[S],
        layout: &Layout,
    ) -> Result<Vec<ReadTask>, PlanError> {
        self.plan_layouts(table, requested_columns, std::slice::from_ref(layout))
    }

    /// Chooses split size and read directories without touching storage.
    pub fn choose<S: AsRef<str>>(
        &self,
        table: &TableKey,
        requested_columns: &[S],
        layout: &Layout,
    ) -> Result<ReadChoice, PlanError> {
        let columns = requested_columns.iter().collect::<ColumnSet>();
        let indexes = self.resolve_indexes(table, layout)?;
        Ok(self.read_choice(table, &columns, layout, &indexes))
    }

    /// Resolves the indexes and the cache snapshot once, from the newest
    /// layout, and plans every layout against them.
    fn plan_layouts<S: AsRef<str>>(
        &self,
        table: &TableKey,
        requested_columns: &[S],
        layouts: &[Layout],
    ) -> Result<Vec<ReadTask>, PlanError> {
        let columns = requested_columns.iter().collect::<ColumnSet>();
        let Some(newest) = layouts.iter().max_by_key(|layout| layout.version) else {
            return Ok(Vec::new());
        };
        let indexes = self
            .resolve_indexes(table, newest)
            .map_err(|err| self.fail(err))?;
        let placement = self
            .resolve_cache_placement(table, newest)
            .map_err(|err| self.fail(err))?;

        let mut tasks = Vec::new();
        for layout in layouts {
            let started = Instant::now();
            let (layout_tasks, choice) = self
                .plan_layout(table, &columns, layout, &indexes, placement.as_ref())
                .map_err(|err| self.fail(err))?;
            let compact_tasks =
                layout_tasks.iter().filter(|task| task.compact_coded).count() as u64;
            let ordered_tasks = layout_tasks.len() as u64 - compact_tasks;
            self.metrics
                .record_plan(ordered_tasks, compact_tasks, started.elapsed());
            info!(
                table = %table,
                layout_version = layout.version,
                columns = %columns,
                split_size = choice.split_size,
                projection = choice.projection_path_ids.is_some(),
                ordered_tasks,
                compact_tasks,
                elapsed_us = started.elapsed().as_micros() as u64,
                "split planning completed"
            );
            tasks.extend(layout_tasks);
        }
        Ok(tasks)
    }

    fn resolve_cache_placement(
        &self,
        table: &TableKey,
        layout: &Layout,
    ) -> Result<Option<CachePlacement>, PlanError> {
        if !self.config.cache_table_matches(table) {
            return Ok(None);
        }
        resolve_placement(self.services.coordinator.as_ref(), table, layout).map(Some)
    }

    fn plan_layout(
        &self,
        table: &TableKey,
        columns: &ColumnSet,
        layout: &Layout,
        indexes: &ResolvedIndexes,
        placement: Option<&CachePlacement>,
    ) -> Result<(Vec<ReadTask>, ReadChoice), PlanError> {
        layout.validate().map_err(|source| invalid_layout(table, layout, source))?;
        let choice = self.read_choice(table, columns, layout, indexes);

        let ordered_files = self.resolve_files(table, layout.version, &layout.ordered_paths)?;
        let compact_files = self.resolve_files(table, layout.version, &choice.read_paths)?;

        let mut tasks = Vec::with_capacity(ordered_files.len() + compact_files.len());
        for file_path in ordered_files {
            let file_length = self.file_length(table, layout.version, &file_path)?;
            let candidate_hosts = self.replica_hosts(table, layout.version, &file_path)?;
            tasks.push(ReadTask {
                file_path,
                start_row_group: 0,
                row_group_span: 1,
                compact_coded: false,
                cache_ordered_column_chunks: Vec::new(),
                column_order: layout.column_order().to_vec(),
                file_length,
                candidate_hosts,
            });
        }

        let row_groups = layout.row_groups_per_file();
        let cache_chunks = match placement {
            Some(_) => layout.cache_ordered_column_chunks(),
            None => Vec::new(),
        };
        let mut cache_placed = 0u64;
        let mut cache_fallbacks = 0u64;
        for file_path in compact_files {
            let file_length = self.file_length(table, layout.version, &file_path)?;
            let ranges = row_group_ranges(row_groups, choice.split_size).collect::<Vec<_>>();
            let candidate_hosts = match placement {
                Some(placement) => match placement.holder(&file_path) {
                    Some(node) => {
                        cache_placed += ranges.len() as u64;
                        vec![node.to_string()]
                    }
                    None => {
                        cache_fallbacks += ranges.len() as u64;
                        warn!(
                            table = %table,
                            file = %file_path,
                            cache_version = %placement.cache_version,
                            "file missing from cache manifest; using replica hosts"
                        );
                        self.replica_hosts(table, layout.version, &file_path)?
                    }
                },
                None => self.replica_hosts(table, layout.version, &file_path)?,
            };

            for (start_row_group, row_group_span) in ranges {
                tasks.push(ReadTask {
                    file_path: file_path.clone(),
                    start_row_group,
                    row_group_span,
                    compact_coded: true,
                    cache_ordered_column_chunks: cache_chunks.clone(),
                    column_order: layout.column_order().to_vec(),
                    file_length,
                    candidate_hosts: candidate_hosts.clone(),
                });
            }
        }
        if placement.is_some() {
            self.metrics
                .record_cache_placement(cache_placed, cache_fallbacks);
        }

        Ok((tasks, choice))
    }

    /// Looks up both indexes for `layout`, building them on first use or
    /// when the cached ones predate it.
    fn resolve_indexes(
        &self,
        table: &TableKey,
        layout: &Layout,
    ) -> Result<ResolvedIndexes, PlanError> {
        layout.validate().map_err(|source| invalid_layout(table, layout, source))?;
        let splits = match self.config.fixed_split_size {
            Some(fixed) => SplitSizing::Fixed(fixed),
            None => SplitSizing::Index(self.split_index(table, layout)?),
        };
        let projections = if self.config.projection_read_enabled {
            Some(self.projection_index(table, layout)?)
        } else {
            None
        };
        Ok(ResolvedIndexes {
            splits,
            projections,
        })
    }

    fn split_index(
        &self,
        table: &TableKey,
        layout: &Layout,
    ) -> Result<Arc<SplitsIndex>, PlanError> {
        let (index, outcome) = self
            .split_indexes
            .get_or_build_with_outcome(table, layout.version, || {
                build_split_patterns(layout.column_order(), &layout.splits)
                    .map(|patterns| SplitsIndex::new(patterns, layout.row_groups_per_file()))
            })
            .map_err(|source| invalid_layout(table, layout, source))?;
        self.metrics.record_split_index_lookup(outcome);
        if outcome.is_build() {
            debug!(
                table = %table,
                layout_version = layout.version,
                patterns = index.len(),
                outcome = ?outcome,
                "built splits index"
            );
        }
        Ok(index)
    }

    fn projection_index(
        &self,
        table: &TableKey,
        layout: &Layout,
    ) -> Result<Arc<ProjectionsIndex>, PlanError> {
        let (index, outcome) = self
            .projection_indexes
            .get_or_build_with_outcome(table, layout.version, || {
                build_projection_patterns(layout.column_order(), &layout.projections)
                    .map(ProjectionsIndex::new)
            })
            .map_err(|source| invalid_layout(table, layout, source))?;
        self.metrics.record_projection_index_lookup(outcome);
        if outcome.is_build() {
            debug!(
                table = %table,
                layout_version = layout.version,
                patterns = index.len(),
                outcome = ?outcome,
                "built projections index"
            );
        }
        Ok(index)
    }

    fn read_choice(
        &self,
        table: &TableKey,
        columns: &ColumnSet,
        layout: &Layout,
        indexes: &ResolvedIndexes,
    ) -> ReadChoice {
        let (split_size, split_size_source) = match &indexes.splits {
            SplitSizing::Fixed(fixed) => {
                self.metrics.record_fixed_split_size();
                (*fixed, SplitSizeSource::Fixed)
            }
            SplitSizing::Index(index) => {
                let (pattern, coverage) = index.search_match(columns);
                debug!(
                    table = %table,
                    columns = %columns,
                    split_size = pattern.split_size,
                    coverage = ?coverage,
                    "split pattern selected"
                );
                (pattern.split_size, SplitSizeSource::Index(coverage))
            }
        };
        let (read_paths, projection_path_ids) =
            self.read_paths(table, columns, layout, indexes.projections.as_deref());
        ReadChoice {
            split_size,
            split_size_source,
            projection_path_ids,
            read_paths,
        }
    }

    fn read_paths(
        &self,
        table: &TableKey,
        columns: &ColumnSet,
        layout: &Layout,
        projections: Option<&ProjectionsIndex>,
    ) -> (Vec<Path>, Option<Vec<u64>>) {
        let Some(index) = projections else {
            return (layout.compact_paths.clone(), None);
        };

        // Only a projection holding every requested column may replace the compact files.
        let (pattern, coverage) = index.search_match(columns);
        if !pattern.is_substitution() || coverage != Coverage::Full {
            return (layout.compact_paths.clone(), None);
        }
        match layout.resolve_projection_paths(&pattern.path_ids) {
            Ok(paths) => {
                self.metrics.record_projection_substitution();
                debug!(
                    table = %table,
                    layout_version = layout.version,
                    path_ids = ?pattern.path_ids,
                    "projection substitutes compact paths"
                );
                (paths, Some(pattern.path_ids.clone()))
            }
            // The index may come from a newer layout whose projection paths this one lacks.
            Err(err) => {
                debug!(
                    table = %table,
                    layout_version = layout.version,
                    path_ids = ?pattern.path_ids,
                    error = %err,
                    "projection not declared by layout; reading compact paths"
                );
                (layout.compact_paths.clone(), None)
            }
        }
    }

    /// Lists every directory and joins file names onto the directory uri.
    fn resolve_files(
        &self,
        table: &TableKey,
        version: u64,
        directories: &[Path],
    ) -> Result<Vec<String>, PlanError> {
        let mut files = Vec::new();
        for directory in directories {
            let names = self
                .services
                .listing
                .list_files(directory)
                .map_err(|source| PlanError::Storage {
                    table: table.clone(),
                    version,
                    step: PlanStep::ListFiles {
                        path_id: directory.id,
                    },
                    source,
                })?;
            files.extend(names.iter().map(|name| directory.join(name)));
        }
        Ok(files)
    }

    fn file_length(
        &self,
        table: &TableKey,
        version: u64,
        file_path: &str,
    ) -> Result<u64, PlanError> {
        self.services
            .locality
            .file_length(file_path)
            .map_err(|source| PlanError::Storage {
                table: table.clone(),
                version,
                step: PlanStep::FileLength {
                    path: file_path.to_string(),
                },
                source,
            })
    }

    fn replica_hosts(
        &self,
        table: &TableKey,
        version: u64,
        file_path: &str,
    ) -> Result<Vec<String>, PlanError> {
        self.services
            .locality
            .replica_hosts(file_path)
            .map_err(|source| PlanError::Storage {
                table: table.clone(),
                version,
                step: PlanStep::ReplicaHosts {
                    path: file_path.to_string(),
                },
                source,
            })
    }

    fn fail(&self, err: PlanError) -> PlanError {
        self.metrics.record_failure(err.kind());
        warn!(
            table = %err.table(),
            layout_version = ?err.layout_version(),
            kind = err.kind(),
            error = %err,
            "split planning failed"
        );
        err
    }
}

fn invalid_layout(table: &TableKey, layout: &Layout, source: LayoutError) -> PlanError {
    PlanError::InvalidLayout {
        table: table.clone(),
        version: layout.version,
        source,
    }
}
