//! ✉️ The Batch Queue: a bounded FIFO between one producer and N workers.
//!
//! Backed by `async_channel::bounded`, which already does the hard parts:
//! - `enqueue` suspends the producer while the queue is full (backpressure)
//! - `dequeue` suspends a worker while the queue is empty but still open
//! - every batch goes to exactly one receiver, never broadcast
//! - after `close`, receivers keep draining until the buffer is empty, and
//!   only then observe closure
//!
//! This module just gives those semantics the names the pipeline talks in.

use async_channel::{Receiver, Sender};
use thiserror::Error;

use crate::common::Batch;

/// 💀 Nobody is listening anymore: every receiver is gone, or the queue was closed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("batch queue closed before batch {seq} could be enqueued")]
pub struct QueueClosed {
    pub seq: u64,
}

/// 🏗️ Create a queue holding at most `capacity` batches (clamped to at least one).
pub fn batch_queue(capacity: usize) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (BatchSender { tx }, BatchReceiver { rx })
}

/// 📤 The producer's end.
#[derive(Debug, Clone)]
pub struct BatchSender {
    tx: Sender<Batch>,
}

impl BatchSender {
    /// 📤 Put a batch on the queue, waiting for room if it is full.
    pub async fn enqueue(&self, batch: Batch) -> Result<(), QueueClosed> {
        debug_assert!(!batch.is_empty(), "empty batches are never enqueued");
        let seq = batch.seq;
        self.tx.send(batch).await.map_err(|_| QueueClosed { seq })
    }

    /// 🚪 No more batches are coming. Already-queued batches are still delivered.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    /// 📏 Batches currently buffered.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// 📥 A worker's end. Clone one per worker; each batch still goes to exactly one of them.
#[derive(Debug, Clone)]
pub struct BatchReceiver {
    rx: Receiver<Batch>,
}

impl BatchReceiver {
    /// 📥 Take the next batch, or `None` once the queue is closed *and* drained.
    pub async fn dequeue(&self) -> Option<Batch> {
        self.rx.recv().await.ok()
    }
}
