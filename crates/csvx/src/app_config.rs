//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! ```toml
//! [runtime]
//! batch_size = 5000
//! queue_capacity = 500
//! worker_count = 50
//!
//! [source_config.File]
//! file_name = "uploaded_devices.csv"
//!
//! [store_config.Postgres]
//! url = "postgres://postgres:password@db:5432/device_data"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{FileSourceConfig, StoreConfig};

/// 📦 One struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source_config: SourceConfig,
    pub store_config: StoreConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🚰 Where the bytes come from.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    File(FileSourceConfig),
    /// 🪈 Piped in. Size unknown, progress shows a spinner.
    Stdin,
}

/// 🧵 The knobs for the pipeline itself.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 📦 Rows per batch.
    #[serde(default = "default_batch_size", alias = "batch_capacity")]
    pub batch_size: usize,
    /// ✉️ Batches the queue holds before the producer has to wait.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    /// 🧵 Concurrent insert workers.
    #[serde(default = "default_worker_count", alias = "num_workers")]
    pub worker_count: usize,
    /// 🔄 Insert attempts per batch. 1 means no retry.
    #[serde(default = "default_max_insert_attempts")]
    pub max_insert_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// 🏷️ Skip the first line of the input, once.
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
    #[serde(default)]
    pub show_progress: bool,
}

fn default_batch_size() -> usize {
    5000
}

fn default_queue_capacity() -> usize {
    500
}

fn default_worker_count() -> usize {
    50
}

fn default_max_insert_attempts() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_has_headers() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            worker_count: default_worker_count(),
            max_insert_attempts: default_max_insert_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            has_headers: default_has_headers(),
            show_progress: false,
        }
    }
}

impl RuntimeConfig {
    /// 🔒 Zero of anything that has to exist is a config bug, not a quiet clamp.
    pub fn validate(&self) -> Result<(), String> {
        let zeroes = [
            ("batch_size", self.batch_size == 0),
            ("queue_capacity", self.queue_capacity == 0),
            ("worker_count", self.worker_count == 0),
            ("max_insert_attempts", self.max_insert_attempts == 0),
        ];
        match zeroes.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(format!("{name} must be at least 1")),
            None => Ok(()),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// 🚀 Load the config from `CSVX_*` environment variables, with an optional
/// TOML file merged on top. TOML wins on conflicts. Nested keys use `__`,
/// e.g. `CSVX_RUNTIME__WORKER_COUNT=8`.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CSVX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CSVX_*).",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CSVX_*). \
                 No file was provided, this one's all on the environment."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .runtime
        .validate()
        .map_err(anyhow::Error::msg)
        .context("💀 The [runtime] section parsed, but the numbers in it can't run a pipeline")?;
    Ok(app_config)
}
