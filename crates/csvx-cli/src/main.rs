//! 🚀 csvx-cli: the front door of csvx.
//!
//! Loads config, sets up logging, runs one ingestion, prints the tally.
//! The real work lives in the library. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 📥 Stream a device CSV into the database with a pool of insert workers.
#[derive(Debug, Parser)]
#[command(name = "csvx", version, about)]
struct Args {
    /// 🔧 TOML config file. Missing file means env vars (CSVX_*) only.
    #[arg(default_value = "csvx.toml")]
    config: PathBuf,

    /// 📂 Override the input file from the config.
    #[arg(long)]
    file: Option<String>,

    /// 📦 Override rows per batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// 🧵 Override the number of insert workers.
    #[arg(long)]
    workers: Option<usize>,

    /// ✉️ Override the queue capacity, in batches.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// 📊 Show a progress bar while reading.
    #[arg(long)]
    progress: bool,

    /// 🍞 Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    // 🔒 A missing config file is allowed; the environment may carry everything.
    let config_file = args
        .config
        .try_exists()
        .with_context(|| {
            format!(
                "💀 Couldn't check whether '{}' exists. Try an absolute path.",
                args.config.display()
            )
        })?
        .then_some(args.config.as_path());

    let mut app_config = csvx::app_config::load_config(config_file)
        .context("💀 In csvx-cli, main, we couldn't load the config. Take a look at the file and the CSVX_* env vars.")?;

    if let Some(file_name) = args.file {
        app_config.source_config =
            csvx::app_config::SourceConfig::File(csvx::backends::FileSourceConfig { file_name });
    }
    if let Some(batch_size) = args.batch_size {
        app_config.runtime.batch_size = batch_size;
    }
    if let Some(workers) = args.workers {
        app_config.runtime.worker_count = workers;
    }
    if let Some(queue_capacity) = args.queue_capacity {
        app_config.runtime.queue_capacity = queue_capacity;
    }
    if args.progress {
        app_config.runtime.show_progress = true;
    }

    match csvx::run(app_config).await {
        Ok(report) => {
            println!("{}", report.summary_table());
            info!("✅ CSV processing completed");
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            let mut looks_like_connection_trouble = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("store unavailable")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("connection refused")
                {
                    looks_like_connection_trouble = true;
                }
            }
            if looks_like_connection_trouble {
                error!(
                    "🔧 hint: the database isn't reachable. Check that it is running \
                     (`docker compose up -d db`) and that the url in [store_config.Postgres] is right."
                );
            }
            std::process::exit(1);
        }
    }
}
