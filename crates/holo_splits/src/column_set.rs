//! Requested-column sets used as lookup keys for access patterns.

use std::collections::BTreeSet;
use std::fmt;

/// Unordered, case-normalized set of column names.
///
/// Backed by a `BTreeSet` so equality, hashing and iteration order do not
/// depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ColumnSet {
    columns: BTreeSet<String>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one column, returning `false` when it was already present.
    ///
    /// Blank names are ignored.
    pub fn add_column(&mut self, name: &str) -> bool {
        let normalized = normalize_column_name(name);
        if normalized.is_empty() {
            return false;
        }
        self.columns.insert(normalized)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains(&normalize_column_name(name))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates normalized names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Returns `true` when every column of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &ColumnSet) -> bool {
        self.columns.is_subset(&other.columns)
    }

    pub fn intersection_len(&self, other: &ColumnSet) -> usize {
        self.columns.intersection(&other.columns).count()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ColumnSet::new();
        for name in iter {
            set.add_column(name.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for ColumnSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.add_column(name.as_ref());
        }
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, name) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

/// Lower-cases and trims a column name.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
