//! 🎬 The Supervisor: part orchestrator, part helicopter parent.
//!
//! One ingestion run, start to finish:
//!
//! ```text
//!  ping store ──▶ spawn N workers ──▶ producer: parse → batch → enqueue ──▶ close queue
//!                      │                                                      │
//!                      └──── drain queue, validate, insert ◀──────────────────┘
//!                                         │
//!                              completion barrier ──▶ IngestReport
//! ```
//!
//! ⚠️ Workers are the supervisor's private minions. They are not `pub` and
//! they are not going to be.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{info, warn};

mod barrier;
mod producer;
mod workers;

use crate::app_config::RuntimeConfig;
use crate::backends::{Store, StoreError};
use crate::batcher::Batcher;
use crate::parser::{ParseError, RecordParser};
use crate::progress::ProgressMetrics;
use crate::queue::batch_queue;
use crate::report::IngestReport;
use producer::Producer;
use workers::{RetryPolicy, start_workers};

/// 💀 The only ways a run can fail. Row and batch problems are not on this list;
/// those end up in the [`IngestReport`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid runtime configuration: {0}")]
    Config(String),
    #[error("the store is not ready, nothing was ingested")]
    Setup(#[source] StoreError),
    #[error("the input stream broke, ingestion aborted")]
    Stream(#[source] ParseError),
    #[error("every insert worker exited before batch {0} could be queued")]
    WorkersExhausted(u64),
}

/// 📦 Runs ingestion against one store with one set of runtime knobs.
///
/// The store is shared (`Arc`) with every worker. Bring any [`Store`]: the
/// config-driven [`StoreBackend`](crate::backends::StoreBackend), or a test double.
#[derive(Debug)]
pub struct Supervisor<S> {
    runtime: RuntimeConfig,
    store: Arc<S>,
    progress: Option<(String, u64)>,
}

impl<S> Supervisor<S>
where
    S: Store + 'static,
{
    pub fn new(runtime: RuntimeConfig, store: Arc<S>) -> Self {
        Self {
            runtime,
            store,
            progress: None,
        }
    }

    /// 📊 Show a progress bar for `source_name`. `total_bytes` of 0 means unknown.
    pub fn with_progress(mut self, source_name: impl Into<String>, total_bytes: u64) -> Self {
        self.progress = Some((source_name.into(), total_bytes));
        self
    }

    /// 🚀 Ingest everything `reader` has to offer.
    ///
    /// Returns only after the queue is closed and every worker has exited,
    /// whatever the outcome. `Err` means the run itself failed (bad config,
    /// store not ready, broken input, no workers left). Rejected rows and
    /// failed batches are reported in the `Ok` value instead.
    pub async fn ingest<R>(&self, reader: R) -> Result<IngestReport, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();
        self.runtime.validate().map_err(IngestError::Config)?;
        self.store.ping().await.map_err(IngestError::Setup)?;

        info!(
            batch_size = self.runtime.batch_size,
            queue_capacity = self.runtime.queue_capacity,
            workers = self.runtime.worker_count,
            "🚀 ingestion run starting"
        );

        let (tx, rx) = batch_queue(self.runtime.queue_capacity);
        let retry = RetryPolicy::new(self.runtime.max_insert_attempts, self.runtime.retry_backoff());
        let barrier = start_workers(self.runtime.worker_count, rx, Arc::clone(&self.store), retry);

        let progress = self
            .progress
            .as_ref()
            .map(|(name, size)| ProgressMetrics::new(name.clone(), *size));
        let producer = Producer::new(
            RecordParser::new(reader, self.runtime.has_headers),
            Batcher::new(self.runtime.batch_size),
            tx,
            progress,
        );

        let (summary, produced) = producer.run().await;
        let outcome = barrier.wait().await;

        let mut report = IngestReport {
            rows_read: summary.rows_read,
            batches_enqueued: summary.batches_enqueued,
            worker_faults: outcome.faults,
            ..IngestReport::default()
        };
        for worker in outcome.reports {
            report.absorb(worker);
        }
        report.elapsed = started.elapsed();

        produced?;

        if report.has_failures() {
            warn!(
                batches_failed = report.batches_failed,
                rows_rejected = report.rows_rejected,
                worker_faults = report.worker_faults,
                "⚠️ CSV processing completed with casualties"
            );
        }
        info!(
            rows = report.rows_read,
            batches = report.batches_enqueued,
            records = report.records_inserted,
            elapsed = ?report.elapsed,
            "✅ CSV processing completed"
        );
        Ok(report)
    }
}
