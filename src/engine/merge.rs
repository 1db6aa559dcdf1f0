//! # engine::merge
//!
//! **Merge Engine**: folds incrementally arriving records into the
//! session's [`WorkingSet`] without ever duplicating a symbol.
//!
//! ```text
//! incoming record
//!     │
//!     ├─ symbol unseen  → append (first-seen order) + add to delta
//!     │
//!     └─ symbol present → replace in place (no reorder), NOT in delta
//! ```
//!
//! Only genuinely new keys trigger incremental render work.

use std::collections::HashMap;

use crate::models::{Record, Snapshot};

/// De-duplicated, session-lifetime union of every record seen so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    records: Vec<Record>,
    /// symbol → position in `records`
    index:   HashMap<String, usize>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline working set from one snapshot (duplicates inside the
    /// snapshot collapse onto their first position).
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut set = Self::new();
        set.merge(&snapshot.records);
        set
    }

    /// Merge `incoming` and return the delta: the records whose symbols were
    /// not present before, in arrival order, carrying their final values.
    pub fn merge(&mut self, incoming: &[Record]) -> Vec<Record> {
        let mut new_positions = Vec::new();

        for record in incoming {
            match self.index.get(&record.symbol) {
                Some(&pos) => {
                    self.records[pos] = record.clone();
                }
                None => {
                    let pos = self.records.len();
                    self.index.insert(record.symbol.clone(), pos);
                    self.records.push(record.clone());
                    new_positions.push(pos);
                }
            }
        }

        new_positions
            .into_iter()
            .map(|pos| self.records[pos].clone())
            .collect()
    }

    /// Records in first-seen order.
    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, symbol: &str) -> Option<&Record> {
        self.index.get(symbol).map(|&pos| &self.records[pos])
    }

    #[inline]
    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::record;
    use crate::models::Provenance;
    use std::collections::HashSet;

    fn symbols(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_quick_then_full_scenario() {
        let mut set = WorkingSet::from_snapshot(&Snapshot::new(vec![record("AAA", 10.0)], Provenance::Quick));

        let delta = set.merge(&[record("AAA", 11.0), record("BBB", 5.0)]);

        assert_eq!(set.records(), &[record("AAA", 11.0), record("BBB", 5.0)]);
        assert_eq!(delta, vec![record("BBB", 5.0)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut set = WorkingSet::new();
        set.merge(&[record("AAA", 1.0), record("CCC", 3.0)]);

        let incoming = [record("BBB", 2.0), record("AAA", 1.5)];
        set.merge(&incoming);
        let once = set.clone();

        let delta = set.merge(&incoming);

        assert!(delta.is_empty());
        assert_eq!(set, once);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut set = WorkingSet::new();
        set.merge(&[record("AAA", 1.0), record("BBB", 2.0), record("CCC", 3.0)]);
        set.merge(&[record("BBB", 20.0)]);

        assert_eq!(symbols(set.records()), ["AAA", "BBB", "CCC"]);
        assert_eq!(set.get("BBB").map(|r| r.price), Some(20.0));
    }

    #[test]
    fn test_duplicate_inside_one_batch() {
        let mut set = WorkingSet::new();
        let delta = set.merge(&[record("AAA", 1.0), record("AAA", 2.0)]);

        assert_eq!(set.len(), 1);
        // delta carries the value the working set ended up with
        assert_eq!(delta, vec![record("AAA", 2.0)]);
    }

    #[test]
    fn test_no_duplicate_keys_after_many_merges() {
        let mut set = WorkingSet::new();
        let batches = [
            vec![record("A", 1.0), record("B", 1.0)],
            vec![record("B", 2.0), record("C", 2.0), record("A", 2.0)],
            vec![record("D", 3.0), record("D", 3.5), record("C", 3.0)],
            vec![],
            vec![record("E", 4.0), record("A", 4.0)],
        ];
        for batch in &batches {
            set.merge(batch);
        }

        let unique: HashSet<&str> = symbols(set.records()).into_iter().collect();
        assert_eq!(unique.len(), set.len());
        assert_eq!(symbols(set.records()), ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut set = WorkingSet::new();
        set.merge(&[record("AAA", 1.0)]);
        set.clear();

        assert!(set.is_empty());
        assert!(!set.contains("AAA"));
        assert_eq!(set.merge(&[record("AAA", 1.0)]).len(), 1);
    }
}
