//! 🚰 The Producer: parse → batch → enqueue, one row at a time, on one task.
//!
//! The only place it ever waits is `enqueue`. When the queue is full the read
//! loop stops reading, which is the whole point: the file is consumed exactly
//! as fast as the store can swallow it.

use tokio::io::AsyncRead;
use tracing::{debug, error};

use crate::batcher::Batcher;
use crate::common::Batch;
use crate::parser::RecordParser;
use crate::progress::ProgressMetrics;
use crate::queue::BatchSender;
use crate::supervisors::IngestError;

/// 📋 What the producer managed before it stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProducerSummary {
    pub(crate) rows_read: u64,
    pub(crate) batches_enqueued: u64,
}

pub(crate) struct Producer<R> {
    parser: RecordParser<R>,
    batcher: Batcher,
    tx: BatchSender,
    progress: Option<ProgressMetrics>,
    summary: ProducerSummary,
}

impl<R> Producer<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub(crate) fn new(
        parser: RecordParser<R>,
        batcher: Batcher,
        tx: BatchSender,
        progress: Option<ProgressMetrics>,
    ) -> Self {
        Self {
            parser,
            batcher,
            tx,
            progress,
            summary: ProducerSummary::default(),
        }
    }

    /// 🚀 Drain the input into the queue, then close the queue.
    ///
    /// The queue is closed on every exit path, including errors, so workers
    /// finish what is already queued and then leave. A stream error discards
    /// the half-filled batch; nothing after the bad row is queued.
    pub(crate) async fn run(mut self) -> (ProducerSummary, Result<(), IngestError>) {
        let result = self.pump().await;
        self.tx.close();

        if let Some(progress) = &self.progress {
            progress.finish();
        }
        if let Err(IngestError::Stream(parse)) = &result {
            if let Some(open) = parse.unterminated_quote() {
                error!(
                    line = open.line,
                    byte = open.byte,
                    "🔒 a quoted field opened on line {} never closed, the rest of the input went into it",
                    open.line
                );
            }
        }
        match &result {
            Ok(()) => debug!(
                rows = self.summary.rows_read,
                batches = self.summary.batches_enqueued,
                "🏁 producer done, queue closed"
            ),
            Err(err) => error!(
                rows = self.summary.rows_read,
                batches = self.summary.batches_enqueued,
                discarded_rows = self.batcher.pending_rows(),
                error = %err,
                "💀 producer aborted, queue closed early"
            ),
        }
        (self.summary, result)
    }

    async fn pump(&mut self) -> Result<(), IngestError> {
        while let Some(row) = self.parser.next_row().await.map_err(IngestError::Stream)? {
            self.summary.rows_read = self.parser.rows_read();
            if let Some(batch) = self.batcher.push(row) {
                self.emit(batch).await?;
            }
        }

        if let Some(batch) = self.batcher.finish() {
            self.emit(batch).await?;
        }
        Ok(())
    }

    async fn emit(&mut self, batch: Batch) -> Result<(), IngestError> {
        let seq = batch.seq;
        let rows = batch.len();
        self.tx
            .enqueue(batch)
            .await
            .map_err(|closed| IngestError::WorkersExhausted(closed.seq))?;
        self.summary.batches_enqueued += 1;
        debug!(batch = seq, rows, queued = self.tx.len(), "📤 batch enqueued");

        if let Some(progress) = self.progress.as_mut() {
            progress.update(self.parser.byte_position(), self.summary.rows_read);
        }
        Ok(())
    }
}
