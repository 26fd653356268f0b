//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 The file backend pours bytes in. 🐘 The store backends take validated
//! records out. Everything in between is somebody else's module.
//!
//! 🎭 Same casting-agency setup as always: a [`Store`] trait with the one
//! operation the pipeline actually needs, concrete implementations, and a
//! [`StoreBackend`] enum so the config can pick one without the supervisor
//! ever learning which. Tests bring their own [`Store`] and skip the enum. 🦆

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::common::DeviceRecord;

pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod postgres;

pub use file::{FileSource, FileSourceConfig};
pub use in_mem::InMemoryStore;
pub use postgres::{PostgresStore, PostgresStoreConfig};

/// 💀 Everything a store can say no with.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 🔌 Could not reach the store at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// 🙅 The store is up but refused this batch.
    #[error("store rejected the batch: {0}")]
    Rejected(String),
    /// 🔧 The store was configured in a way it cannot work with.
    #[error("store misconfigured: {0}")]
    Config(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// 🐘 The persistence collaborator.
///
/// # Contract 📜
/// - `insert_batch` is one independent unit of work. It either lands or it
///   does not; a failure must not leave anything half-written that the next
///   batch could trip over.
/// - Implementations are shared by every worker at once (`&self`, `Send + Sync`).
///   Pool your connections accordingly.
/// - `ping` is called once before any work starts. A failing ping ends the
///   run before a single byte is read.
#[async_trait]
pub trait Store: std::fmt::Debug + Send + Sync {
    /// 📡 Is anybody home?
    async fn ping(&self) -> Result<(), StoreError>;

    /// 📥 Bulk-insert a batch of validated records.
    async fn insert_batch(&self, records: &[DeviceRecord]) -> Result<(), StoreError>;
}

/// 🔧 Which store to talk to, straight from the config file.
///
/// ```toml
/// [store_config.Postgres]
/// url = "postgres://postgres:password@db:5432/device_data"
/// ```
#[derive(Debug, Deserialize, Clone)]
pub enum StoreConfig {
    Postgres(PostgresStoreConfig),
    /// 🧪 Dry run. Keeps everything in RAM, forgets it on exit.
    InMemory,
}

/// 🎭 The many faces of a Store.
#[derive(Debug)]
pub enum StoreBackend {
    Postgres(PostgresStore),
    InMemory(InMemoryStore),
}

impl StoreBackend {
    /// 🏗️ Build (and for Postgres, connect and migrate) the configured store.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match config {
            StoreConfig::Postgres(pg) => Ok(Self::Postgres(PostgresStore::connect(pg).await?)),
            StoreConfig::InMemory => Ok(Self::InMemory(InMemoryStore::new())),
        }
    }
}

#[async_trait]
impl Store for StoreBackend {
    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            StoreBackend::Postgres(store) => store.ping().await,
            StoreBackend::InMemory(store) => store.ping().await,
        }
    }

    async fn insert_batch(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        match self {
            StoreBackend::Postgres(store) => store.insert_batch(records).await,
            StoreBackend::InMemory(store) => store.insert_batch(records).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_the_in_memory_config_builds_an_in_memory_backend() {
        let backend = StoreBackend::from_config(&StoreConfig::InMemory)
            .await
            .expect("in-memory store never fails to build");
        assert!(matches!(backend, StoreBackend::InMemory(_)));
        backend.ping().await.expect("always home");
        backend.insert_batch(&[]).await.expect("empty insert is fine");
    }
}
