//! Overlap queries over a fixed set of genomic intervals.
//!
//! [`IntervalTree`] holds the intervals of one reference sequence sorted by
//! start, augmented with a running maximum of interval ends. A query walks
//! backwards from the last interval starting before the query end and stops
//! as soon as no earlier interval can reach the query start.
//!
//! [`IntervalIndex`] keys one tree per reference sequence name. Query results
//! are positions in the interval list the index was built from.

use crate::types::GenomeInterval;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    start: u64,
    end: u64,
    max_end: u64,
    index: usize,
}

/// Overlap-query structure over the intervals of a single reference sequence
#[derive(Debug, Clone, Default)]
pub struct IntervalTree {
    entries: Vec<Entry>,
}

impl IntervalTree {
    /// Builds a tree from `(start, end, index)` triples, half-open coordinates.
    pub fn new<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64, usize)>,
    {
        let mut entries: Vec<Entry> = intervals
            .into_iter()
            .map(|(start, end, index)| Entry {
                start,
                end,
                max_end: end,
                index,
            })
            .collect();

        entries.sort_by_key(|entry| (entry.start, entry.index));

        let mut max_end = 0;
        for entry in &mut entries {
            max_end = max_end.max(entry.end);
            entry.max_end = max_end;
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices of intervals overlapping `[start, end)`, ascending.
    pub fn query(&self, start: u64, end: u64) -> Vec<usize> {
        let hi = self.entries.partition_point(|entry| entry.start < end);

        let mut hits = Vec::new();

        for entry in self.entries[..hi].iter().rev() {
            if entry.max_end <= start {
                break;
            }

            if entry.end > start {
                hits.push(entry.index);
            }
        }

        hits.sort_unstable();
        hits
    }

    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        let hi = self.entries.partition_point(|entry| entry.start < end);

        self.entries[..hi]
            .iter()
            .rev()
            .take_while(|entry| entry.max_end > start)
            .any(|entry| entry.end > start)
    }
}

/// Per-chromosome interval trees over an ordered interval list
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    trees: HashMap<String, IntervalTree>,
}

impl IntervalIndex {
    pub fn from_intervals(intervals: &[GenomeInterval]) -> Self {
        let mut grouped: HashMap<String, Vec<(u64, u64, usize)>> = HashMap::new();

        for (i, interval) in intervals.iter().enumerate() {
            grouped
                .entry(interval.reference_name.clone())
                .or_default()
                .push((
                    interval.start.unwrap_or(0),
                    interval.end.unwrap_or(u64::MAX),
                    i,
                ));
        }

        let trees = grouped
            .into_iter()
            .map(|(name, entries)| (name, IntervalTree::new(entries)))
            .collect();

        Self { trees }
    }

    /// Number of reference sequences with at least one interval
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn get(&self, reference_name: &str) -> Option<&IntervalTree> {
        self.trees.get(reference_name)
    }

    /// Interval list positions overlapping `[start, end)` on `reference_name`
    pub fn query(&self, reference_name: &str, start: u64, end: u64) -> Vec<usize> {
        self.trees
            .get(reference_name)
            .map(|tree| tree.query(start, end))
            .unwrap_or_default()
    }

    pub fn overlaps(&self, reference_name: &str, start: u64, end: u64) -> bool {
        self.trees
            .get(reference_name)
            .is_some_and(|tree| tree.overlaps(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals() -> Vec<GenomeInterval> {
        vec![
            GenomeInterval::new("chr1", 100, 200),
            GenomeInterval::new("chr2", 0, 1000),
            GenomeInterval::new("chr1", 10, 500),
            GenomeInterval::new("chr1", 300, 400),
            GenomeInterval::whole("chrX"),
        ]
    }

    #[test]
    fn test_empty_index() {
        let index = IntervalIndex::from_intervals(&[]);
        assert!(index.is_empty());
        assert!(!index.overlaps("chr1", 0, 10));
        assert!(index.query("chr1", 0, 10).is_empty());
    }

    #[test]
    fn test_query_returns_list_positions() {
        let index = IntervalIndex::from_intervals(&intervals());
        assert_eq!(index.len(), 3);

        assert_eq!(index.query("chr1", 150, 160), vec![0, 2]);
        assert_eq!(index.query("chr1", 350, 351), vec![2, 3]);
        assert_eq!(index.query("chr1", 450, 600), vec![2]);
        assert!(index.query("chr1", 500, 600).is_empty());
        assert!(index.query("chr1", 0, 10).is_empty());
        assert_eq!(index.query("chr2", 999, 2000), vec![1]);
    }

    #[test]
    fn test_whole_chromosome_interval() {
        let index = IntervalIndex::from_intervals(&intervals());
        assert!(index.overlaps("chrX", 0, 1));
        assert!(index.overlaps("chrX", 1 << 40, (1 << 40) + 1));
        assert!(!index.overlaps("chrY", 0, 1));
    }

    #[test]
    fn test_overlaps_matches_query() {
        let index = IntervalIndex::from_intervals(&intervals());

        for start in (0..700).step_by(25) {
            for len in [1, 10, 100] {
                let end = start + len;
                assert_eq!(
                    index.overlaps("chr1", start, end),
                    !index.query("chr1", start, end).is_empty(),
                    "mismatch at chr1:{}-{}",
                    start,
                    end
                );
            }
        }
    }

    #[test]
    fn test_tree_skips_by_max_end() {
        // A long early interval must still be found behind short ones.
        let tree = IntervalTree::new([(0, 1000, 0), (10, 20, 1), (30, 40, 2), (50, 60, 3)]);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.query(900, 950), vec![0]);
        assert_eq!(tree.query(35, 55), vec![0, 2, 3]);
    }
}
