use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::LogSinkError;
use super::record::LogRecord;
use super::sink::LogSink;

/// Keeps records in memory; can be told to fail every write.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: RwLock<Vec<LogRecord>>,
    failing: RwLock<bool>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.records.read().last().cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        if *self.failing.read() {
            return Err(LogSinkError::Io(std::io::Error::other("sink disabled")));
        }
        self.records.write().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
