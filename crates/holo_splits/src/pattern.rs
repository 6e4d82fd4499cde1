//! Recorded access patterns derived from a layout's split and projection configuration.
//!
//! Each pattern pairs a column subset with an outcome: the row-group split
//! size that worked best for it, or the projection paths that serve it.
//! Builders keep declaration order because index search breaks ties by it.

use crate::column_set::ColumnSet;
use crate::error::LayoutError;
use crate::layout::{Projections, Splits};

/// "When this column subset is read, split compact files every `split_size` row groups."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPattern {
    pub columns: ColumnSet,
    pub split_size: u32,
}

/// "When this column subset is read, use these projection paths instead of compact paths."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionPattern {
    pub columns: ColumnSet,
    /// Empty for the no-substitution default.
    pub path_ids: Vec<u64>,
}

impl ProjectionPattern {
    /// The pattern returned when no projection applies.
    pub fn no_substitution() -> Self {
        Self {
            columns: ColumnSet::new(),
            path_ids: Vec::new(),
        }
    }

    pub fn is_substitution(&self) -> bool {
        !self.path_ids.is_empty()
    }
}

/// Tagged pattern stored by the shared inverted index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPattern {
    Split(SplitPattern),
    Projection(ProjectionPattern),
}

impl AccessPattern {
    pub fn columns(&self) -> &ColumnSet {
        match self {
            AccessPattern::Split(pattern) => &pattern.columns,
            AccessPattern::Projection(pattern) => &pattern.columns,
        }
    }
}

impl From<SplitPattern> for AccessPattern {
    fn from(pattern: SplitPattern) -> Self {
        AccessPattern::Split(pattern)
    }
}

impl From<ProjectionPattern> for AccessPattern {
    fn from(pattern: ProjectionPattern) -> Self {
        AccessPattern::Projection(pattern)
    }
}

/// Builds split patterns in declaration order.
pub fn build_split_patterns(
    column_order: &[String],
    splits: &Splits,
) -> Result<Vec<SplitPattern>, LayoutError> {
    splits
        .split_patterns
        .iter()
        .enumerate()
        .map(|(pattern, recorded)| {
            if recorded.num_row_group_in_split == 0 {
                return Err(LayoutError::ZeroSplitSize { pattern });
            }
            Ok(SplitPattern {
                columns: resolve_columns(pattern, column_order, &recorded.accessed_columns)?,
                split_size: recorded.num_row_group_in_split,
            })
        })
        .collect()
}

/// Builds projection patterns in declaration order.
pub fn build_projection_patterns(
    column_order: &[String],
    projections: &Projections,
) -> Result<Vec<ProjectionPattern>, LayoutError> {
    projections
        .projection_patterns
        .iter()
        .enumerate()
        .map(|(pattern, recorded)| {
            if recorded.path_ids.is_empty() {
                return Err(LayoutError::EmptyProjectionPaths { pattern });
            }
            Ok(ProjectionPattern {
                columns: resolve_columns(pattern, column_order, &recorded.accessed_columns)?,
                path_ids: recorded.path_ids.clone(),
            })
        })
        .collect()
}

/// Maps recorded column indexes onto names from the declared column order.
fn resolve_columns(
    pattern: usize,
    column_order: &[String],
    indexes: &[usize],
) -> Result<ColumnSet, LayoutError> {
    let mut columns = ColumnSet::new();
    for &index in indexes {
        let name = column_order
            .get(index)
            .ok_or(LayoutError::ColumnIndexOutOfRange {
                pattern,
                index,
                column_count: column_order.len(),
            })?;
        columns.add_column(name);
    }
    Ok(columns)
}
