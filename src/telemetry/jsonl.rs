use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::error::LogSinkError;
use super::record::LogRecord;
use super::sink::LogSink;

/// Appends one JSON object per line to a file.
///
/// Writers are serialised so concurrent queries never interleave partial lines.
pub struct JsonlLogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlLogSink {
    /// Opens `path` for appending, creating the file (not its parents) if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogSinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for JsonlLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlLogSink")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl LogSink for JsonlLogSink {
    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
