//! 🐘 Postgres store: pooled connections, multi-row INSERTs, one transaction per batch.
//!
//! Each worker's batch is its own transaction. If it fails, it fails alone;
//! nothing is coordinated across batches and nothing needs to be.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info, warn};

use crate::backends::{Store, StoreError};
use crate::common::DeviceRecord;

/// 📏 Postgres caps a statement at 65535 bind parameters. Ten columns per row
/// puts the ceiling at 6553 rows, so larger batches are split into several
/// statements inside the same transaction.
const MAX_ROWS_PER_STATEMENT: usize = 6000;

const INSERT_COLUMNS: &str = "device_name, device_type, brand, model, os, os_version, \
                              purchase_date, warranty_end, status, price";

#[derive(Debug, Deserialize, Clone)]
pub struct PostgresStoreConfig {
    /// 📡 e.g. `postgres://postgres:password@db:5432/device_data`
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 🔄 The database container is usually still yawning when we start.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_connect_retry_delay_secs")]
    pub connect_retry_delay_secs: u64,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_max_connections() -> u32 {
    20
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_connect_retry_delay_secs() -> u64 {
    5
}

fn default_table() -> String {
    "records".to_string()
}

/// 🐘 The production store.
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    /// 🚀 Connect (with retries), then make sure the table exists.
    pub async fn connect(config: &PostgresStoreConfig) -> Result<Self, StoreError> {
        check_table_name(&config.table)?;

        let attempts = config.connect_attempts.max(1);
        let delay = Duration::from_secs(config.connect_retry_delay_secs);
        let mut attempt = 0;
        let pool = loop {
            attempt += 1;
            let connected = PgPoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.url)
                .await;
            match connected {
                Ok(pool) => break pool,
                Err(err) if attempt < attempts => {
                    warn!(
                        attempt,
                        attempts,
                        error = %err,
                        "🔄 database connection failed, retrying in {}s",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(StoreError::Unavailable(format!(
                        "gave up connecting after {attempt} attempts: {err}"
                    )));
                }
            }
        };

        let store = Self {
            pool,
            table: config.table.clone(),
        };
        store.ensure_table().await?;
        info!(table = %store.table, "🐘 database connected and migrated");
        Ok(store)
    }

    async fn ensure_table(&self) -> Result<(), StoreError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                device_name TEXT NOT NULL,
                device_type TEXT NOT NULL,
                brand TEXT NOT NULL,
                model TEXT NOT NULL,
                os TEXT NOT NULL,
                os_version TEXT NOT NULL,
                purchase_date TEXT NOT NULL,
                warranty_end TEXT NOT NULL,
                status TEXT NOT NULL,
                price BIGINT NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

/// 🔒 The table name is spliced into SQL text, so it gets a strict allowlist.
fn check_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::Config(format!(
            "table name {table:?} must be a plain identifier (letters, digits, underscores)"
        )))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }

    async fn insert_batch(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({}) ", self.table, INSERT_COLUMNS));

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.device_name)
                    .push_bind(&record.device_type)
                    .push_bind(&record.brand)
                    .push_bind(&record.model)
                    .push_bind(&record.os)
                    .push_bind(&record.os_version)
                    .push_bind(&record.purchase_date)
                    .push_bind(&record.warranty_end)
                    .push_bind(&record.status)
                    .push_bind(record.price);
            });

            query_builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(records = records.len(), "🐘 batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_only_plain_identifiers_get_near_the_sql() {
        for ok in ["records", "_staging", "devices_2024"] {
            assert!(check_table_name(ok).is_ok(), "{ok} should pass");
        }
        for bad in ["", "1records", "records; DROP TABLE x", "my-table", "ré"] {
            assert!(
                matches!(check_table_name(bad), Err(StoreError::Config(_))),
                "{bad:?} should be refused"
            );
        }
    }

    #[test]
    fn the_one_where_defaults_match_the_docker_compose_setup() {
        let config: PostgresStoreConfig =
            toml::from_str(r#"url = "postgres://postgres:password@db:5432/device_data""#)
                .expect("minimal config parses");
        assert_eq!(config.connect_attempts, 10);
        assert_eq!(config.connect_retry_delay_secs, 5);
        assert_eq!(config.table, "records");
        assert_eq!(config.max_connections, 20);
    }

    #[test]
    fn the_one_where_a_full_batch_fits_under_the_bind_limit() {
        assert!(MAX_ROWS_PER_STATEMENT * 10 <= u16::MAX as usize);
    }
}
