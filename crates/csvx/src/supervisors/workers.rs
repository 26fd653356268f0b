//! 🧵 Workers: the ones who actually do the work while the Supervisor takes
//! all the credit in the sprint retro.
//!
//! The pool is a fixed set of identical [`InsertWorker`]s sharing one queue
//! receiver. Each one is registered with the [`CompletionBarrier`] the moment
//! it is spawned, so none of them can be forgotten.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

mod insert_worker;
pub(crate) use insert_worker::{InsertWorker, RetryPolicy};

use crate::backends::Store;
use crate::queue::BatchReceiver;
use crate::report::WorkerReport;
use crate::supervisors::barrier::CompletionBarrier;

/// 🏗️ A background worker, that does work. duh.
pub(crate) trait Worker {
    /// 🚀 Spawn the worker. The handle resolves to its tally once it exits.
    fn start(self) -> JoinHandle<WorkerReport>;
}

/// 🧵 Spawn `worker_count` insert workers on `rx` and hand back the barrier that tracks them.
///
/// Takes `rx` by value: once every worker has its own clone the original is
/// dropped, so the queue closes for good if the whole pool dies.
pub(crate) fn start_workers<S>(
    worker_count: usize,
    rx: BatchReceiver,
    store: Arc<S>,
    retry: RetryPolicy,
) -> CompletionBarrier
where
    S: Store + 'static,
{
    let mut barrier = CompletionBarrier::new();
    for worker_id in 0..worker_count {
        let worker = InsertWorker::new(worker_id, rx.clone(), Arc::clone(&store), retry);
        barrier.register(worker_id, worker.start());
    }
    debug!(workers = barrier.len(), "🧵 worker pool is up");
    barrier
}
