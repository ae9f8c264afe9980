//! Per-query log records and the sinks that persist them.

pub mod error;
pub mod jsonl;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod record;
pub mod sink;


pub use error::LogSinkError;
pub use jsonl::JsonlLogSink;
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryLogSink;
pub use record::LogRecord;
pub use sink::{LogSink, TracingLogSink, emit};
