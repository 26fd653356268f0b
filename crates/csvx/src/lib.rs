//! 📥 csvx: stream a device CSV into a relational store with a bounded pool of workers.
//!
//! ```text
//!  bytes ─▶ RecordParser ─▶ Batcher ─▶ [ bounded queue ] ─▶ N × InsertWorker ─▶ Store
//!                                                                 │
//!                                            CompletionBarrier ◀──┘ ─▶ IngestReport
//! ```
//!
//! The library entry points are [`Supervisor::ingest`] (any `AsyncRead`, any
//! [`Store`](backends::Store)) and [`run`] (everything wired from an [`AppConfig`]).

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;

pub mod app_config;
pub mod backends;
pub mod batcher;
pub mod common;
pub mod parser;
mod progress;
pub mod queue;
pub mod report;
mod supervisors;
pub mod transforms;

pub use supervisors::{IngestError, Supervisor};

use crate::app_config::{AppConfig, SourceConfig};
use crate::backends::{FileSource, StoreBackend};
use crate::report::IngestReport;

/// 🚀 Build the configured store and source, then run one ingestion.
pub async fn run(app_config: AppConfig) -> Result<IngestReport> {
    let store = StoreBackend::from_config(&app_config.store_config)
        .await
        .map_err(IngestError::Setup)
        .context("💀 Could not get the store ready. Is the database up?")?;

    let (reader, name, size): (Box<dyn AsyncRead + Unpin + Send>, String, u64) =
        match &app_config.source_config {
            SourceConfig::File(file_config) => {
                let source = FileSource::open(file_config).await?;
                let name = source.name().to_string();
                let size = source.size();
                (Box::new(source.into_reader()), name, size)
            }
            SourceConfig::Stdin => (Box::new(tokio::io::stdin()), "stdin".to_string(), 0),
        };

    let mut supervisor = Supervisor::new(app_config.runtime.clone(), Arc::new(store));
    if app_config.runtime.show_progress {
        supervisor = supervisor.with_progress(name.clone(), size);
    }

    supervisor
        .ingest(reader)
        .await
        .with_context(|| format!("💀 Ingestion of '{name}' failed"))
}
