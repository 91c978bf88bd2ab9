//! Symmetric difference between a stored edge set and a freshly fetched one.

use std::collections::HashSet;

/// Result of diffing one entity/direction against the remote source of truth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDiff {
    /// Edges present remotely but not stored yet
    pub to_add: Vec<i64>,
    /// Edges stored locally that no longer exist remotely
    pub to_remove: Vec<i64>,
}

impl EdgeDiff {
    /// Compute the diff for one direction
    pub fn compute(stored: &HashSet<i64>, fresh: &HashSet<i64>) -> Self {
        let mut to_add: Vec<i64> = fresh.difference(stored).copied().collect();
        let mut to_remove: Vec<i64> = stored.difference(fresh).copied().collect();

        // Deterministic order keeps SQL statements and logs stable.
        to_add.sort_unstable();
        to_remove.sort_unstable();

        EdgeDiff { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_round_trip_diff() {
        // stored {X, Y}, fresh {Y, Z}: remove X, add Z, Y untouched
        let diff = EdgeDiff::compute(&set(&[1, 2]), &set(&[2, 3]));
        assert_eq!(diff.to_add, vec![3]);
        assert_eq!(diff.to_remove, vec![1]);
    }

    #[test]
    fn test_identical_sets_produce_empty_diff() {
        let diff = EdgeDiff::compute(&set(&[5, 6, 7]), &set(&[7, 6, 5]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_all_removed_when_fresh_is_empty() {
        let diff = EdgeDiff::compute(&set(&[9, 4]), &set(&[]));
        assert_eq!(diff.to_add, Vec::<i64>::new());
        assert_eq!(diff.to_remove, vec![4, 9]);
    }

    #[test]
    fn test_all_added_when_stored_is_empty() {
        let diff = EdgeDiff::compute(&set(&[]), &set(&[11, 2]));
        assert_eq!(diff.to_add, vec![2, 11]);
        assert!(diff.to_remove.is_empty());
    }
}
