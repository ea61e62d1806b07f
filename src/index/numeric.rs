//! Numeric range tree for numeric fields.
//!
//! A simplified, 1-dimensional take on a BKD tree: `(value, doc_id)` pairs
//! are kept sorted by value, then by doc id, and range searches use binary
//! search over the sorted entries.

use std::cmp::Ordering;

use crate::document::DocId;

/// Block size used for statistics, similar to Lucene's default.
const BLOCK_SIZE: usize = 512;

/// Sorted numeric postings of one field.
#[derive(Debug, Clone, Default)]
pub struct NumericRangeTree {
    /// Sorted by value first, then by doc_id for stable ordering.
    sorted_entries: Vec<(f64, DocId)>,
}

impl NumericRangeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn cmp_entry(a: &(f64, DocId), b: &(f64, DocId)) -> Ordering {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    }

    /// Insert a value for a document.
    pub fn add(&mut self, doc_id: DocId, value: f64) {
        let entry = (value, doc_id);
        let pos = self
            .sorted_entries
            .binary_search_by(|probe| Self::cmp_entry(probe, &entry))
            .unwrap_or_else(|pos| pos);
        self.sorted_entries.insert(pos, entry);
    }

    /// Remove all entries of a document. Returns the number removed.
    pub fn remove_doc(&mut self, doc_id: DocId) -> usize {
        let before = self.sorted_entries.len();
        self.sorted_entries.retain(|&(_, id)| id != doc_id);
        before - self.sorted_entries.len()
    }

    /// Get the number of entries in this tree.
    pub fn len(&self) -> usize {
        self.sorted_entries.len()
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.sorted_entries.is_empty()
    }

    /// Perform a range search and return matching document IDs.
    ///
    /// Bounds are inclusive; `None` leaves a side unbounded.
    pub fn range_search(&self, min: Option<f64>, max: Option<f64>) -> Vec<DocId> {
        let start_idx = match min {
            Some(min_val) => self.sorted_entries.partition_point(|e| e.0 < min_val),
            None => 0,
        };
        let end_idx = match max {
            Some(max_val) => self.sorted_entries.partition_point(|e| e.0 <= max_val),
            None => self.sorted_entries.len(),
        };

        if start_idx >= end_idx {
            return Vec::new();
        }

        let mut doc_ids: Vec<DocId> = self.sorted_entries[start_idx..end_idx]
            .iter()
            .map(|&(_, id)| id)
            .collect();
        doc_ids.sort_unstable();
        doc_ids.dedup();
        doc_ids
    }

    /// Get statistics about this tree.
    pub fn stats(&self) -> NumericTreeStats {
        NumericTreeStats {
            total_entries: self.sorted_entries.len(),
            num_blocks: self.sorted_entries.len().div_ceil(BLOCK_SIZE),
            min_value: self.sorted_entries.first().map(|(v, _)| *v),
            max_value: self.sorted_entries.last().map(|(v, _)| *v),
        }
    }
}

/// Statistics about a numeric range tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTreeStats {
    /// Total number of entries.
    pub total_entries: usize,
    /// Number of blocks.
    pub num_blocks: usize,
    /// Minimum value in the tree.
    pub min_value: Option<f64>,
    /// Maximum value in the tree.
    pub max_value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> NumericRangeTree {
        let mut tree = NumericRangeTree::new();
        for (value, doc) in [(1.0, 10), (3.0, 20), (2.0, 30), (5.0, 40), (4.0, 50), (1.5, 60)] {
            tree.add(doc, value);
        }
        tree
    }

    #[test]
    fn test_entries_stay_sorted() {
        let tree = create_test_tree();
        assert_eq!(tree.len(), 6);
        assert_eq!(
            tree.sorted_entries,
            vec![(1.0, 10), (1.5, 60), (2.0, 30), (3.0, 20), (4.0, 50), (5.0, 40)]
        );
    }

    #[test]
    fn test_range_search() {
        let tree = create_test_tree();
        assert_eq!(tree.range_search(Some(2.0), Some(4.0)), vec![20, 30, 50]);
        assert_eq!(tree.range_search(Some(3.0), None), vec![20, 40, 50]);
        assert_eq!(tree.range_search(None, Some(2.0)), vec![10, 30, 60]);
        assert!(tree.range_search(Some(10.0), None).is_empty());
        assert!(NumericRangeTree::new().range_search(None, None).is_empty());
    }

    #[test]
    fn test_remove_doc() {
        let mut tree = create_test_tree();
        tree.add(10, 7.0);
        assert_eq!(tree.remove_doc(10), 2);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.remove_doc(99), 0);
    }

    #[test]
    fn test_stats() {
        let stats = create_test_tree().stats();
        assert_eq!(stats.total_entries, 6);
        assert_eq!(stats.num_blocks, 1);
        assert_eq!(stats.min_value, Some(1.0));
        assert_eq!(stats.max_value, Some(5.0));
    }
}
