//! 📂 File source: opens the uploaded file and hands its bytes to the parser.
//!
//! The upload itself (HTTP, multipart, saving to disk) happens somewhere else.
//! By the time we get here it is just a path.

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs::File;

/// 📂 "It's just a file", said no sysadmin ever before the disk filled up.
#[derive(Debug, Deserialize, Clone)]
pub struct FileSourceConfig {
    pub file_name: String,
}

/// 📂 An opened input file plus what the progress bar wants to know about it.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    name: String,
    size: u64,
}

impl FileSource {
    /// 🚀 Open the file and grab its size. If metadata fails we assume 0 (unknown).
    pub async fn open(config: &FileSourceConfig) -> Result<Self> {
        let file = File::open(&config.file_name).await.with_context(|| {
            format!(
                "💀 The door to '{}' would not budge. Check that the file exists and is readable.",
                config.file_name
            )
        })?;
        let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            name: config.file_name.clone(),
            size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 📏 Size in bytes at open time, 0 if unknown.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 🚰 Give up the handle; the parser takes it from here.
    pub fn into_reader(self) -> File {
        self.file
    }
}
