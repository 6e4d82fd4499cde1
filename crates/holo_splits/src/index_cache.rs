//! Versioned per-table cache of built pattern indexes.
//!
//! Entries are published as `Arc`s and replaced wholesale when a newer layout
//! version shows up; a published index is never mutated. Builds run outside
//! the lock, so a slow rebuild for one table never blocks lookups for another.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::table::TableKey;

/// One published index and the layout version it was built from.
#[derive(Debug)]
pub struct CachedIndex<I> {
    pub version: u64,
    pub index: Arc<I>,
}

impl<I> Clone for CachedIndex<I> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            index: Arc::clone(&self.index),
        }
    }
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A cached index at an equal or newer version was reused.
    Hit,
    /// No entry existed; the index was built.
    Built,
    /// The cached index was older than the layout; it was rebuilt.
    Rebuilt,
}

impl CacheOutcome {
    pub fn is_build(self) -> bool {
        !matches!(self, CacheOutcome::Hit)
    }
}

#[derive(Debug)]
pub struct IndexCache<I> {
    entries: RwLock<HashMap<TableKey, CachedIndex<I>>>,
}

impl<I> Default for IndexCache<I> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<I> IndexCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached index for `key` unless it predates `current_version`.
    ///
    /// The stored version is a lower bound of validity: a cached index built
    /// from a newer layout is returned as-is for older requests. Build errors
    /// propagate and leave any existing entry in place.
    pub fn get_or_build<E, F>(
        &self,
        key: &TableKey,
        current_version: u64,
        build: F,
    ) -> Result<Arc<I>, E>
    where
        F: FnOnce() -> Result<I, E>,
    {
        self.get_or_build_with_outcome(key, current_version, build)
            .map(|(index, _)| index)
    }

    /// Same as [`IndexCache::get_or_build`], also reporting whether a build happened.
    pub fn get_or_build_with_outcome<E, F>(
        &self,
        key: &TableKey,
        current_version: u64,
        build: F,
    ) -> Result<(Arc<I>, CacheOutcome), E>
    where
        F: FnOnce() -> Result<I, E>,
    {
        let outcome = match self.read().get(key) {
            Some(entry) if entry.version >= current_version => {
                return Ok((Arc::clone(&entry.index), CacheOutcome::Hit));
            }
            Some(_) => CacheOutcome::Rebuilt,
            None => CacheOutcome::Built,
        };

        let index = Arc::new(build()?);

        let mut entries = self.write();
        // A concurrent caller may have published while we built; keep the newer entry.
        if let Some(existing) = entries.get(key) {
            if existing.version >= current_version {
                return Ok((Arc::clone(&existing.index), outcome));
            }
        }
        entries.insert(
            key.clone(),
            CachedIndex {
                version: current_version,
                index: Arc::clone(&index),
            },
        );
        Ok((index, outcome))
    }

    /// Snapshot of the entry for `key`, if any.
    pub fn get(&self, key: &TableKey) -> Option<CachedIndex<I>> {
        self.read().get(key).cloned()
    }

    pub fn cached_version(&self, key: &TableKey) -> Option<u64> {
        self.read().get(key).map(|entry| entry.version)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TableKey, CachedIndex<I>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TableKey, CachedIndex<I>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_build<'a>(
        builds: &'a AtomicUsize,
        value: &'static str,
    ) -> impl FnOnce() -> Result<&'static str, Infallible> + 'a {
        move || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[test]
    fn same_version_builds_once() {
        let cache = IndexCache::new();
        let key = TableKey::new("s", "t");
        let builds = AtomicUsize::new(0);

        let first = cache.get_or_build(&key, 3, counting_build(&builds, "v3")).unwrap();
        let second = cache.get_or_build(&key, 3, counting_build(&builds, "other")).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "v3");
    }

    #[test]
    fn newer_version_rebuilds_exactly_once() {
        let cache = IndexCache::new();
        let key = TableKey::new("s", "t");
        let builds = AtomicUsize::new(0);

        cache.get_or_build(&key, 1, counting_build(&builds, "v1")).unwrap();
        let (index, outcome) = cache
            .get_or_build_with_outcome(&key, 2, counting_build(&builds, "v2"))
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Rebuilt);
        assert_eq!(*index, "v2");
        cache.get_or_build(&key, 2, counting_build(&builds, "again")).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_version(&key), Some(2));
    }

    #[test]
    fn older_request_reuses_newer_index() {
        let cache = IndexCache::new();
        let key = TableKey::new("s", "t");
        let builds = AtomicUsize::new(0);

        cache.get_or_build(&key, 5, counting_build(&builds, "v5")).unwrap();
        let (index, outcome) = cache
            .get_or_build_with_outcome(&key, 4, counting_build(&builds, "v4"))
            .unwrap();

        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(*index, "v5");
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn build_error_keeps_previous_entry() {
        let cache = IndexCache::<&'static str>::new();
        let key = TableKey::new("s", "t");
        cache
            .get_or_build(&key, 1, || Ok::<_, String>("v1"))
            .unwrap();

        let err = cache
            .get_or_build(&key, 2, || Err::<&'static str, _>("broken layout".to_string()))
            .unwrap_err();
        assert_eq!(err, "broken layout");
        assert_eq!(cache.cached_version(&key), Some(1));
    }

    #[test]
    fn tables_are_cached_independently() {
        let cache = IndexCache::new();
        let builds = AtomicUsize::new(0);
        cache
            .get_or_build(&TableKey::new("s", "a"), 1, counting_build(&builds, "a"))
            .unwrap();
        cache
            .get_or_build(&TableKey::new("s", "b"), 1, counting_build(&builds, "b"))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_readers_see_complete_index() {
        let cache = IndexCache::<Vec<u64>>::new();
        let key = TableKey::new("s", "t");
        let builds = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for version in 1..=20u64 {
                        let index = cache
                            .get_or_build(&key, version, || {
                                builds.fetch_add(1, Ordering::SeqCst);
                                Ok::<_, Infallible>(vec![version; 64])
                            })
                            .unwrap();
                        assert_eq!(index.len(), 64);
                        assert!(index.iter().all(|value| *value == index[0]));
                        assert!(index[0] >= version);
                    }
                });
            }
        });

        assert_eq!(cache.cached_version(&key), Some(20));
        assert!(builds.load(Ordering::SeqCst) >= 20);
    }
}
