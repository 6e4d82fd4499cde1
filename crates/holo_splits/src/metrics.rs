//! In-process counters for split planning.
//!
//! Counters are lock-free atomics so concurrent planning calls can update
//! them without contending; only the per-kind failure breakdown takes a lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::index_cache::CacheOutcome;

/// Aggregated counters for planning calls.
#[derive(Debug, Default)]
pub struct PlannerMetrics {
    /// Number of planning calls that returned tasks.
    plans_completed: AtomicU64,
    /// Number of planning calls that failed.
    plans_failed: AtomicU64,
    /// Sum of successful planning latency in nanoseconds.
    plan_latency_ns_total: AtomicU64,
    /// Whole-file tasks emitted for ordered files.
    ordered_tasks: AtomicU64,
    /// Row-group range tasks emitted for compact or projection files.
    compact_tasks: AtomicU64,
    split_index_builds: AtomicU64,
    split_index_hits: AtomicU64,
    projection_index_builds: AtomicU64,
    projection_index_hits: AtomicU64,
    /// Plans whose compact paths were replaced by projection paths.
    projection_substitutions: AtomicU64,
    /// Plans that used the configured fixed split size.
    fixed_split_size_overrides: AtomicU64,
    /// Compact tasks pinned to the node holding their cached chunks.
    cache_placed_tasks: AtomicU64,
    /// Compact tasks that fell back to replica hosts because the manifest missed the file.
    cache_manifest_fallbacks: AtomicU64,
    /// Failures keyed by [`crate::error::PlanError::kind`].
    failures_by_kind: Mutex<BTreeMap<&'static str, u64>>,
}

/// Immutable snapshot view of [`PlannerMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerMetricsSnapshot {
    pub plans_completed: u64,
    pub plans_failed: u64,
    pub plan_latency_ns_total: u64,
    pub ordered_tasks: u64,
    pub compact_tasks: u64,
    pub split_index_builds: u64,
    pub split_index_hits: u64,
    pub projection_index_builds: u64,
    pub projection_index_hits: u64,
    pub projection_substitutions: u64,
    pub fixed_split_size_overrides: u64,
    pub cache_placed_tasks: u64,
    pub cache_manifest_fallbacks: u64,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
}

impl PlannerMetrics {
    /// Records one successful plan and the tasks it produced.
    pub fn record_plan(&self, ordered_tasks: u64, compact_tasks: u64, latency: Duration) {
        self.plans_completed.fetch_add(1, Ordering::Relaxed);
        self.ordered_tasks.fetch_add(ordered_tasks, Ordering::Relaxed);
        self.compact_tasks.fetch_add(compact_tasks, Ordering::Relaxed);
        self.plan_latency_ns_total
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.plans_failed.fetch_add(1, Ordering::Relaxed);
        let mut by_kind = self
            .failures_by_kind
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *by_kind.entry(kind).or_default() += 1;
    }

    pub fn record_split_index_lookup(&self, outcome: CacheOutcome) {
        if outcome.is_build() {
            self.split_index_builds.fetch_add(1, Ordering::Relaxed);
        } else {
            self.split_index_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_projection_index_lookup(&self, outcome: CacheOutcome) {
        if outcome.is_build() {
            self.projection_index_builds.fetch_add(1, Ordering::Relaxed);
        } else {
            self.projection_index_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_projection_substitution(&self) {
        self.projection_substitutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fixed_split_size(&self) {
        self.fixed_split_size_overrides
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_placement(&self, placed: u64, fallbacks: u64) {
        self.cache_placed_tasks.fetch_add(placed, Ordering::Relaxed);
        self.cache_manifest_fallbacks
            .fetch_add(fallbacks, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PlannerMetricsSnapshot {
        let failures_by_kind = self
            .failures_by_kind
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        PlannerMetricsSnapshot {
            plans_completed: self.plans_completed.load(Ordering::Relaxed),
            plans_failed: self.plans_failed.load(Ordering::Relaxed),
            plan_latency_ns_total: self.plan_latency_ns_total.load(Ordering::Relaxed),
            ordered_tasks: self.ordered_tasks.load(Ordering::Relaxed),
            compact_tasks: self.compact_tasks.load(Ordering::Relaxed),
            split_index_builds: self.split_index_builds.load(Ordering::Relaxed),
            split_index_hits: self.split_index_hits.load(Ordering::Relaxed),
            projection_index_builds: self.projection_index_builds.load(Ordering::Relaxed),
            projection_index_hits: self.projection_index_hits.load(Ordering::Relaxed),
            projection_substitutions: self.projection_substitutions.load(Ordering::Relaxed),
            fixed_split_size_overrides: self.fixed_split_size_overrides.load(Ordering::Relaxed),
            cache_placed_tasks: self.cache_placed_tasks.load(Ordering::Relaxed),
            cache_manifest_fallbacks: self.cache_manifest_fallbacks.load(Ordering::Relaxed),
            failures_by_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let metrics = PlannerMetrics::default();
        metrics.record_plan(2, 3, Duration::from_micros(5));
        metrics.record_split_index_lookup(CacheOutcome::Built);
        metrics.record_split_index_lookup(CacheOutcome::Hit);
        metrics.record_cache_placement(3, 1);
        metrics.record_failure("storage");
        metrics.record_failure("storage");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plans_completed, 1);
        assert_eq!(snapshot.ordered_tasks, 2);
        assert_eq!(snapshot.compact_tasks, 3);
        assert_eq!(snapshot.plan_latency_ns_total, 5_000);
        assert_eq!(snapshot.split_index_builds, 1);
        assert_eq!(snapshot.split_index_hits, 1);
        assert_eq!(snapshot.cache_placed_tasks, 3);
        assert_eq!(snapshot.cache_manifest_fallbacks, 1);
        assert_eq!(snapshot.plans_failed, 2);
        assert_eq!(snapshot.failures_by_kind.get("storage"), Some(&2));
    }
}
