//! Read tasks handed to the task-execution layer.

use serde::{Deserialize, Serialize};

/// One schedulable unit: a file, a row-group range and where to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTask {
    pub file_path: String,
    pub start_row_group: u32,
    pub row_group_span: u32,
    /// `true` for row-group packed (compact or projection) files.
    pub compact_coded: bool,
    /// Column chunks the reader may take from the cluster cache.
    pub cache_ordered_column_chunks: Vec<String>,
    pub column_order: Vec<String>,
    pub file_length: u64,
    pub candidate_hosts: Vec<String>,
}

impl ReadTask {
    /// Exclusive end of the row-group range.
    pub fn end_row_group(&self) -> u32 {
        self.start_row_group + self.row_group_span
    }
}

/// Consecutive `(start, span)` ranges of `split_size` covering `[0, row_groups)`.
///
/// The last range is shorter when `split_size` does not divide
/// `row_groups`. A zero `split_size` is treated as one.
pub fn row_group_ranges(row_groups: u32, split_size: u32) -> impl Iterator<Item = (u32, u32)> {
    let step = split_size.max(1);
    (0..row_groups)
        .step_by(step as usize)
        .map(move |start| (start, step.min(row_groups - start)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_every_row_group_once() {
        for row_groups in 0..40u32 {
            for split_size in 1..12u32 {
                let ranges = row_group_ranges(row_groups, split_size).collect::<Vec<_>>();
                let mut next = 0;
                for (idx, &(start, span)) in ranges.iter().enumerate() {
                    assert_eq!(start, next);
                    assert!(span >= 1);
                    if idx + 1 < ranges.len() {
                        assert_eq!(span, split_size);
                    }
                    next = start + span;
                }
                assert_eq!(next, row_groups);
                if let Some(&(_, last)) = ranges.last() {
                    let expected = match row_groups % split_size {
                        0 => split_size,
                        rest => rest,
                    };
                    assert_eq!(last, expected);
                }
            }
        }
    }

    #[test]
    fn ten_row_groups_by_four() {
        let ranges = row_group_ranges(10, 4).collect::<Vec<_>>();
        assert_eq!(ranges, vec![(0, 4), (4, 4), (8, 2)]);
    }

    #[test]
    fn split_size_larger_than_file_yields_one_range() {
        assert_eq!(row_group_ranges(3, 64).collect::<Vec<_>>(), vec![(0, 3)]);
    }
}
