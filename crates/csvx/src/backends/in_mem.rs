//! 🧪 In-memory store: a [`Store`] that lives entirely in RAM.
//!
//! Good for dry runs and assertions. Every successful `insert_batch` is kept
//! as its own `Vec`, so callers can see both what landed and how it was
//! grouped. Gone the moment the process exits. ⚠️ Not for production, unless
//! production is a unit test.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{Store, StoreError};
use crate::common::DeviceRecord;

/// 📦 Clone-able so tests can keep a handle after passing one to the pipeline.
/// The `Arc` means every clone shares the same vault.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    batches: Arc<Mutex<Vec<Vec<DeviceRecord>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📋 Every inserted batch, in the order the inserts completed.
    pub async fn batches(&self) -> Vec<Vec<DeviceRecord>> {
        self.batches.lock().await.clone()
    }

    /// 🔢 Records across all inserted batches.
    pub async fn record_count(&self) -> usize {
        self.batches.lock().await.iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_batch(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        // 🔒 the one place concurrent workers collide. the Mutex is load-bearing.
        self.batches.lock().await.push(records.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> DeviceRecord {
        DeviceRecord {
            device_name: name.into(),
            device_type: "Phone".into(),
            brand: "Acme".into(),
            model: "A1".into(),
            os: "Android".into(),
            os_version: "14".into(),
            purchase_date: "2024-02-01".into(),
            warranty_end: "2026-02-01".into(),
            status: "Active".into(),
            price: 300,
        }
    }

    #[tokio::test]
    async fn the_one_where_clones_share_the_same_vault() {
        let store = InMemoryStore::new();
        let handle = store.clone();

        store
            .insert_batch(&[record("a"), record("b")])
            .await
            .expect("insert");
        store.insert_batch(&[record("c")]).await.expect("insert");

        assert_eq!(handle.record_count().await, 3);
        let batches = handle.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][0].device_name, "c");
    }
}
