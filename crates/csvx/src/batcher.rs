//! 🧺 The Batcher: groups rows into fixed-capacity [`Batch`]es.
//!
//! Runs on the producer, sequentially, with zero concurrency of its own. The
//! only time it ever waits on anything is when the queue pushes back, and that
//! wait happens in the producer loop, not here. This module is pure bookkeeping.

use crate::common::{Batch, RawRow};

/// 🧺 Accumulates rows until the batch is full, then hands it over.
///
/// Invariants:
/// - every emitted batch except possibly the last has exactly `capacity` rows
/// - no emitted batch is empty
/// - rows come out in the order they went in, none lost, none duplicated
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    pending: Vec<RawRow>,
    emitted: u64,
}

impl Batcher {
    /// 🏗️ A capacity of zero makes no sense, it is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            pending: Vec::with_capacity(capacity),
            emitted: 0,
        }
    }

    /// ➕ Add a row. Returns the batch it completed, if it completed one.
    pub fn push(&mut self, row: RawRow) -> Option<Batch> {
        self.pending.push(row);
        if self.pending.len() >= self.capacity {
            Some(self.take())
        } else {
            None
        }
    }

    /// 🏁 End of stream: flush whatever is left, unless nothing is left.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    /// 📏 Rows waiting for their batch to fill up.
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    fn take(&mut self) -> Batch {
        let rows = std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
        self.emitted += 1;
        Batch::new(self.emitted, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: u64) -> RawRow {
        RawRow::new(n, vec![n.to_string()])
    }

    fn batch_everything(rows: u64, capacity: usize) -> Vec<Batch> {
        let mut batcher = Batcher::new(capacity);
        let mut batches: Vec<Batch> = (1..=rows).filter_map(|n| batcher.push(row(n))).collect();
        batches.extend(batcher.finish());
        batches
    }

    #[test]
    fn the_one_where_12001_rows_become_two_full_batches_and_a_straggler() {
        let batches = batch_everything(12_001, 5000);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![5000, 5000, 2001]);
        let seqs: Vec<u64> = batches.iter().map(|b| b.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn the_one_where_no_rows_means_no_batches() {
        let mut batcher = Batcher::new(10);
        assert!(batcher.finish().is_none());
        assert_eq!(batcher.pending_rows(), 0);
    }

    #[test]
    fn the_one_where_an_exact_multiple_leaves_nothing_to_flush() {
        let mut batcher = Batcher::new(3);
        let full: Vec<Batch> = (1..=6).filter_map(|n| batcher.push(row(n))).collect();
        assert_eq!(full.len(), 2);
        assert_eq!(batcher.pending_rows(), 0);
        assert!(batcher.finish().is_none(), "💀 an empty final batch must never be emitted");
    }

    #[test]
    fn the_one_where_every_row_arrives_exactly_once_and_in_order() {
        for capacity in [1usize, 2, 3, 7, 64, 1000] {
            for rows in [0u64, 1, 2, 6, 7, 99, 1000, 1001] {
                let batches = batch_everything(rows, capacity);

                assert!(batches.iter().all(|b| !b.is_empty()));
                if let Some((_last, rest)) = batches.split_last() {
                    assert!(rest.iter().all(|b| b.len() == capacity));
                }

                let seen: Vec<u64> = batches
                    .iter()
                    .flat_map(|b| b.rows.iter().map(|r| r.row_number))
                    .collect();
                let expected: Vec<u64> = (1..=rows).collect();
                assert_eq!(seen, expected, "capacity={capacity} rows={rows}");
            }
        }
    }

    #[test]
    fn the_one_where_zero_capacity_is_gently_corrected() {
        let mut batcher = Batcher::new(0);
        let batch = batcher.push(row(1)).expect("capacity clamps to one");
        assert_eq!(batch.len(), 1);
    }
}
