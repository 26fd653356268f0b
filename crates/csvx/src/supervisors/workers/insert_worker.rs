//! 🗑️ The InsertWorker: takes a batch off the queue, validates it, inserts it, repeats.
//!
//! Patient, tireless, and deeply unbothered by the chaos happening upstream.
//! A batch that fails to insert is logged, written into the report, and left
//! behind. The worker moves on to the next one. Its siblings never hear about it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::Worker;
use crate::backends::{Store, StoreError};
use crate::common::{Batch, DeviceRecord};
use crate::queue::BatchReceiver;
use crate::report::{FailedBatch, WorkerReport};
use crate::transforms::validate_row;

/// 🔄 How hard to try before giving a batch up for lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: u32,
    pub(crate) backoff: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

#[derive(Debug)]
pub(crate) struct InsertWorker<S> {
    id: usize,
    rx: BatchReceiver,
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S> InsertWorker<S>
where
    S: Store + 'static,
{
    pub(crate) fn new(id: usize, rx: BatchReceiver, store: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            id,
            rx,
            store,
            retry,
        }
    }

    async fn run(self) -> WorkerReport {
        let mut report = WorkerReport::new(self.id);
        debug!(worker_id = self.id, "📥 InsertWorker started draining the queue");

        while let Some(batch) = self.rx.dequeue().await {
            report.batches_received += 1;
            self.process(batch, &mut report).await;
        }

        debug!(
            worker_id = self.id,
            batches = report.batches_received,
            "🏁 queue closed and drained, worker exiting"
        );
        report
    }

    async fn process(&self, batch: Batch, report: &mut WorkerReport) {
        let seq = batch.seq;
        let batch_size = batch.len();
        let records = self.validate(batch, report);

        if records.is_empty() {
            warn!(
                worker_id = self.id,
                batch = seq,
                batch_size,
                "🫙 every row in the batch was rejected, nothing to insert"
            );
            report.batches_skipped += 1;
            return;
        }

        let started = Instant::now();
        match self.insert_with_retry(&records).await {
            Ok(attempts) => {
                info!(
                    worker_id = self.id,
                    batch = seq,
                    records = records.len(),
                    attempts,
                    elapsed = ?started.elapsed(),
                    "✅ Worker {}: inserted batch of {} records",
                    self.id,
                    records.len()
                );
                report.batches_inserted += 1;
                report.records_inserted += records.len() as u64;
            }
            Err((attempts, err)) => {
                error!(
                    worker_id = self.id,
                    batch = seq,
                    batch_size,
                    attempts,
                    elapsed = ?started.elapsed(),
                    error = %err,
                    "💀 Worker {}: failed to insert batch",
                    self.id
                );
                report.batches_failed += 1;
                report.failed_batches.push(FailedBatch {
                    seq,
                    worker_id: self.id,
                    rows: records.len(),
                    attempts,
                    error: err.to_string(),
                });
            }
        }
    }

    /// 🔍 Keep the rows that pass, log the ones that don't.
    fn validate(&self, batch: Batch, report: &mut WorkerReport) -> Vec<DeviceRecord> {
        let seq = batch.seq;
        let mut records = Vec::with_capacity(batch.len());
        for row in batch.rows {
            let row_number = row.row_number;
            match validate_row(row) {
                Ok(record) => records.push(record),
                Err(rejection) => {
                    warn!(
                        worker_id = self.id,
                        batch = seq,
                        row = row_number,
                        reason = %rejection,
                        "🚫 row rejected"
                    );
                    report.rows_rejected += 1;
                }
            }
        }
        records
    }

    /// 🔄 Returns the attempt count on success, or the attempt count and last error.
    async fn insert_with_retry(&self, records: &[DeviceRecord]) -> Result<u32, (u32, StoreError)> {
        let mut attempt = 1;
        loop {
            match self.store.insert_batch(records).await {
                Ok(()) => return Ok(attempt),
                Err(err) if attempt < self.retry.max_attempts => {
                    warn!(
                        worker_id = self.id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "🔄 insert failed, backing off before retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err((attempt, err)),
            }
        }
    }
}

impl<S> Worker for InsertWorker<S>
where
    S: Store + 'static,
{
    fn start(self) -> JoinHandle<WorkerReport> {
        tokio::spawn(self.run())
    }
}
