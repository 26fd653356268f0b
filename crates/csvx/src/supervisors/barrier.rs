//! 🚧 The Completion Barrier: nobody leaves until everybody is accounted for.
//!
//! Every spawned worker registers its `JoinHandle` here. `wait` joins all of
//! them. A worker that panicked still counts as done: the fault is logged and
//! tallied, and the barrier keeps waiting on the rest.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::report::WorkerReport;

/// 📋 What the barrier saw once every worker had come home.
#[derive(Debug, Default)]
pub(crate) struct BarrierOutcome {
    pub(crate) reports: Vec<WorkerReport>,
    pub(crate) faults: usize,
}

#[derive(Debug, Default)]
pub(crate) struct CompletionBarrier {
    handles: Vec<(usize, JoinHandle<WorkerReport>)>,
}

impl CompletionBarrier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, worker_id: usize, handle: JoinHandle<WorkerReport>) {
        self.handles.push((worker_id, handle));
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// ⏳ Block until every registered worker has returned or faulted.
    pub(crate) async fn wait(self) -> BarrierOutcome {
        let (worker_ids, handles): (Vec<usize>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut outcome = BarrierOutcome::default();
        for (worker_id, result) in worker_ids.into_iter().zip(results) {
            match result {
                Ok(report) => outcome.reports.push(report),
                Err(join_error) => {
                    error!(
                        worker_id,
                        error = %join_error,
                        "💥 worker {worker_id} faulted; counting it as finished"
                    );
                    outcome.faults += 1;
                }
            }
        }
        debug!(
            workers = outcome.reports.len() + outcome.faults,
            faults = outcome.faults,
            "🚧 completion barrier released"
        );
        outcome
    }
}
