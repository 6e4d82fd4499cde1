//! Inverted best-match index over recorded access patterns.
//!
//! Postings map each column name to the (ascending) positions of the patterns
//! that mention it. A search walks only the postings of the query columns and
//! counts hits per pattern, so its cost follows the query width and posting
//! lengths rather than the number of recorded patterns.
//!
//! Ranking:
//! 1. patterns covering every query column beat partial overlaps;
//! 2. among covering patterns the smallest column subset wins;
//! 3. without a covering pattern the largest intersection wins;
//! 4. remaining ties go to the earliest-declared pattern.

use std::collections::HashMap;

use crate::column_set::ColumnSet;
use crate::pattern::{AccessPattern, ProjectionPattern, SplitPattern};

/// How a chosen pattern relates to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// The pattern's columns are a superset of the query.
    Full,
    /// Best partial overlap; `shared` query columns are in the pattern.
    Partial { shared: usize },
    /// The index was empty and the default pattern was returned.
    Default,
}

/// Result of a search against a [`PatternIndex`].
#[derive(Debug, Clone, Copy)]
pub struct PatternMatch<'a> {
    pub pattern: &'a AccessPattern,
    /// Declaration position, `None` for the default pattern.
    pub position: Option<usize>,
    pub coverage: Coverage,
}

/// Shared inverted index used by both split and projection lookups.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    patterns: Vec<AccessPattern>,
    postings: HashMap<String, Vec<usize>>,
    default: AccessPattern,
}

impl PatternIndex {
    /// Builds postings in one pass over every pattern-column pair.
    pub fn new(patterns: Vec<AccessPattern>, default: AccessPattern) -> Self {
        let mut postings = HashMap::<String, Vec<usize>>::new();
        for (position, pattern) in patterns.iter().enumerate() {
            for column in pattern.columns().iter() {
                postings.entry(column.to_string()).or_default().push(position);
            }
        }
        Self {
            patterns,
            postings,
            default,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[AccessPattern] {
        &self.patterns
    }

    pub fn default_pattern(&self) -> &AccessPattern {
        &self.default
    }

    pub fn search(&self, query: &ColumnSet) -> PatternMatch<'_> {
        if self.patterns.is_empty() {
            return PatternMatch {
                pattern: &self.default,
                position: None,
                coverage: Coverage::Default,
            };
        }

        // Every pattern covers the empty query; take the tightest one.
        if query.is_empty() {
            let position = self
                .patterns
                .iter()
                .enumerate()
                .min_by_key(|(position, pattern)| (pattern.columns().len(), *position))
                .map(|(position, _)| position)
                .unwrap_or(0);
            return self.matched(position, Coverage::Full);
        }

        let mut hits = HashMap::<usize, usize>::new();
        for column in query.iter() {
            if let Some(positions) = self.postings.get(column) {
                for &position in positions {
                    *hits.entry(position).or_default() += 1;
                }
            }
        }

        let covering = hits
            .iter()
            .filter(|&(_, &count)| count == query.len())
            .map(|(&position, _)| position)
            .min_by_key(|&position| (self.patterns[position].columns().len(), position));
        if let Some(position) = covering {
            return self.matched(position, Coverage::Full);
        }

        // Max intersection, earliest position on ties.
        let best_partial = hits
            .iter()
            .map(|(&position, &count)| (position, count))
            .min_by_key(|&(position, count)| (std::cmp::Reverse(count), position));
        match best_partial {
            Some((position, shared)) => self.matched(position, Coverage::Partial { shared }),
            None => self.matched(0, Coverage::Partial { shared: 0 }),
        }
    }

    fn matched(&self, position: usize, coverage: Coverage) -> PatternMatch<'_> {
        PatternMatch {
            pattern: &self.patterns[position],
            position: Some(position),
            coverage,
        }
    }
}

/// Chooses the row-group split size for a query.
#[derive(Debug, Clone)]
pub struct SplitsIndex {
    inner: PatternIndex,
    default: SplitPattern,
}

impl SplitsIndex {
    /// `row_groups_per_file` sizes the default pattern: one split per whole file.
    pub fn new(patterns: Vec<SplitPattern>, row_groups_per_file: u32) -> Self {
        let default = SplitPattern {
            columns: ColumnSet::new(),
            split_size: row_groups_per_file.max(1),
        };
        let inner = PatternIndex::new(
            patterns.into_iter().map(AccessPattern::from).collect(),
            AccessPattern::Split(default.clone()),
        );
        Self { inner, default }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn default_pattern(&self) -> &SplitPattern {
        &self.default
    }

    pub fn search(&self, query: &ColumnSet) -> &SplitPattern {
        self.search_match(query).0
    }

    /// Like [`SplitsIndex::search`] but also reports coverage.
    pub fn search_match(&self, query: &ColumnSet) -> (&SplitPattern, Coverage) {
        let found = self.inner.search(query);
        match found.pattern {
            AccessPattern::Split(pattern) => (pattern, found.coverage),
            AccessPattern::Projection(_) => (&self.default, Coverage::Default),
        }
    }
}

/// Chooses a projection-path substitution for a query.
#[derive(Debug, Clone)]
pub struct ProjectionsIndex {
    inner: PatternIndex,
    default: ProjectionPattern,
}

impl ProjectionsIndex {
    pub fn new(patterns: Vec<ProjectionPattern>) -> Self {
        let default = ProjectionPattern::no_substitution();
        let inner = PatternIndex::new(
            patterns.into_iter().map(AccessPattern::from).collect(),
            AccessPattern::Projection(default.clone()),
        );
        Self { inner, default }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn search(&self, query: &ColumnSet) -> &ProjectionPattern {
        self.search_match(query).0
    }

    pub fn search_match(&self, query: &ColumnSet) -> (&ProjectionPattern, Coverage) {
        let found = self.inner.search(query);
        match found.pattern {
            AccessPattern::Projection(pattern) => (pattern, found.coverage),
            AccessPattern::Split(_) => (&self.default, Coverage::Default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> ColumnSet {
        names.iter().collect()
    }

    fn split(names: &[&str], split_size: u32) -> SplitPattern {
        SplitPattern {
            columns: cols(names),
            split_size,
        }
    }

    #[test]
    fn smallest_superset_wins() {
        let index = SplitsIndex::new(
            vec![split(&["a", "b"], 8), split(&["a", "b", "c", "d"], 16)],
            32,
        );
        let (pattern, coverage) = index.search_match(&cols(&["a", "c"]));
        assert_eq!(pattern.split_size, 16);
        assert_eq!(coverage, Coverage::Full);
    }

    #[test]
    fn tighter_superset_beats_earlier_wider_superset() {
        let index = SplitsIndex::new(
            vec![
                split(&["a", "b", "c", "d"], 16),
                split(&["a", "c", "x"], 4),
                split(&["a", "c", "y"], 2),
            ],
            32,
        );
        assert_eq!(index.search(&cols(&["a", "c"])).split_size, 4);
    }

    #[test]
    fn exact_match_is_tightest() {
        let index = SplitsIndex::new(
            vec![split(&["a", "b", "c"], 16), split(&["a", "b"], 2)],
            32,
        );
        assert_eq!(index.search(&cols(&["b", "a"])).split_size, 2);
    }

    #[test]
    fn partial_overlap_falls_back_to_max_intersection() {
        let index = SplitsIndex::new(
            vec![
                split(&["a", "x"], 1),
                split(&["a", "b", "y"], 2),
                split(&["b", "c", "z"], 3),
            ],
            32,
        );
        let (pattern, coverage) = index.search_match(&cols(&["a", "b", "c", "q"]));
        // Both 2 and 3 share two columns; the earlier declaration wins.
        assert_eq!(pattern.split_size, 2);
        assert_eq!(coverage, Coverage::Partial { shared: 2 });
    }

    #[test]
    fn no_overlap_picks_first_declared() {
        let index = SplitsIndex::new(vec![split(&["a"], 5), split(&["b"], 6)], 32);
        let (pattern, coverage) = index.search_match(&cols(&["zz"]));
        assert_eq!(pattern.split_size, 5);
        assert_eq!(coverage, Coverage::Partial { shared: 0 });
    }

    #[test]
    fn equal_size_supersets_tie_to_declaration_order() {
        let index = SplitsIndex::new(
            vec![split(&["a", "b", "x"], 7), split(&["a", "b", "y"], 9)],
            32,
        );
        assert_eq!(index.search(&cols(&["a", "b"])).split_size, 7);
    }

    #[test]
    fn empty_query_takes_smallest_pattern() {
        let index = SplitsIndex::new(vec![split(&["a", "b"], 7), split(&["c"], 9)], 32);
        assert_eq!(index.search(&ColumnSet::new()).split_size, 9);
    }

    #[test]
    fn empty_splits_index_returns_whole_file_default() {
        let index = SplitsIndex::new(Vec::new(), 24);
        let (pattern, coverage) = index.search_match(&cols(&["a"]));
        assert_eq!(pattern.split_size, 24);
        assert_eq!(coverage, Coverage::Default);
    }

    #[test]
    fn empty_projections_index_returns_no_substitution() {
        let index = ProjectionsIndex::new(Vec::new());
        let pattern = index.search(&cols(&["a", "b"]));
        assert!(!pattern.is_substitution());
    }

    #[test]
    fn projection_search_reports_coverage() {
        let index = ProjectionsIndex::new(vec![
            ProjectionPattern {
                columns: cols(&["a", "b"]),
                path_ids: vec![1],
            },
            ProjectionPattern {
                columns: cols(&["a", "b", "c"]),
                path_ids: vec![2, 3],
            },
        ]);
        let (covering, coverage) = index.search_match(&cols(&["a", "c"]));
        assert_eq!(covering.path_ids, vec![2, 3]);
        assert_eq!(coverage, Coverage::Full);

        let (partial, coverage) = index.search_match(&cols(&["a", "d"]));
        assert_eq!(partial.path_ids, vec![1]);
        assert_eq!(coverage, Coverage::Partial { shared: 1 });
    }

    #[test]
    fn search_agrees_with_linear_scan() {
        let patterns = vec![
            split(&["a", "b"], 1),
            split(&["b", "c", "d"], 2),
            split(&["a", "b", "c", "d", "e"], 3),
            split(&["e"], 4),
            split(&["c", "d"], 5),
        ];
        let index = SplitsIndex::new(patterns.clone(), 32);
        let universe = ["a", "b", "c", "d", "e", "f"];
        for mask in 1u32..(1 << universe.len()) {
            let query: ColumnSet = universe
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, name)| *name)
                .collect();
            let expected = linear_best(&patterns, &query);
            assert_eq!(
                index.search(&query).split_size,
                expected,
                "query={query}"
            );
        }
    }

    fn linear_best(patterns: &[SplitPattern], query: &ColumnSet) -> u32 {
        let covering = patterns
            .iter()
            .enumerate()
            .filter(|(_, p)| query.is_subset_of(&p.columns))
            .min_by_key(|(i, p)| (p.columns.len(), *i));
        if let Some((_, p)) = covering {
            return p.split_size;
        }
        patterns
            .iter()
            .enumerate()
            .min_by_key(|(i, p)| (std::cmp::Reverse(query.intersection_len(&p.columns)), *i))
            .map(|(_, p)| p.split_size)
            .unwrap_or(0)
    }
}
