//! 📊 Run reports: what happened, in numbers.
//!
//! Each worker keeps a [`WorkerReport`] while it drains the queue. The
//! completion barrier collects them and the supervisor folds them into one
//! [`IngestReport`]. Per-row and per-batch failures live here and in the logs.
//! They never flip the run's verdict; a run with a failed batch is still a
//! completed run.

use std::time::Duration;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};

/// 💀 A batch that did not make it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub seq: u64,
    pub worker_id: usize,
    pub rows: usize,
    pub attempts: u32,
    pub error: String,
}

/// 🧵 One worker's tally.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub batches_received: u64,
    pub batches_inserted: u64,
    pub batches_failed: u64,
    /// 🫙 Batches where every row was rejected, so there was nothing to insert.
    pub batches_skipped: u64,
    pub records_inserted: u64,
    pub rows_rejected: u64,
    pub failed_batches: Vec<FailedBatch>,
}

impl WorkerReport {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }
}

/// 📊 The whole run, summed up.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub rows_read: u64,
    pub batches_enqueued: u64,
    pub batches_inserted: u64,
    pub batches_failed: u64,
    pub batches_skipped: u64,
    pub records_inserted: u64,
    pub rows_rejected: u64,
    /// 💥 Workers that panicked. Their in-flight batch is unaccounted for.
    pub worker_faults: usize,
    /// 💀 Sorted by batch sequence number.
    pub failed_batches: Vec<FailedBatch>,
    pub elapsed: Duration,
}

impl IngestReport {
    /// ➕ Fold one worker's tally into the run totals.
    pub fn absorb(&mut self, worker: WorkerReport) {
        self.batches_inserted += worker.batches_inserted;
        self.batches_failed += worker.batches_failed;
        self.batches_skipped += worker.batches_skipped;
        self.records_inserted += worker.records_inserted;
        self.rows_rejected += worker.rows_rejected;
        self.failed_batches.extend(worker.failed_batches);
        self.failed_batches.sort_by_key(|f| f.seq);
    }

    /// ⚠️ Anything at all go wrong below the run level?
    pub fn has_failures(&self) -> bool {
        self.batches_failed > 0 || self.rows_rejected > 0 || self.worker_faults > 0
    }

    /// 🍽️ Render the summary as a comfy-table, ready for a terminal.
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["metric", "value"]);

        let rows: [(&str, String); 9] = [
            ("rows read", self.rows_read.to_string()),
            ("batches enqueued", self.batches_enqueued.to_string()),
            ("batches inserted", self.batches_inserted.to_string()),
            ("batches failed", self.batches_failed.to_string()),
            ("batches skipped", self.batches_skipped.to_string()),
            ("records inserted", self.records_inserted.to_string()),
            ("rows rejected", self.rows_rejected.to_string()),
            ("worker faults", self.worker_faults.to_string()),
            ("elapsed", format!("{:.2?}", self.elapsed)),
        ];
        for (metric, value) in rows {
            table.add_row(vec![
                Cell::new(metric),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]);
        }

        for failed in &self.failed_batches {
            table.add_row(vec![
                Cell::new(format!("batch #{} failed", failed.seq)),
                Cell::new(format!(
                    "worker {} | {} rows | {} attempt(s) | {}",
                    failed.worker_id, failed.rows, failed.attempts, failed.error
                )),
            ]);
        }
        table
    }
}
