use async_trait::async_trait;
use tracing::{info, warn};

use super::error::LogSinkError;
use super::record::LogRecord;

/// Write-only destination for per-query [`LogRecord`]s.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError>;

    fn name(&self) -> &'static str;
}

/// Writes `record`, logging and swallowing any failure.
pub async fn emit(sink: &dyn LogSink, record: &LogRecord) {
    if let Err(e) = sink.write(record).await {
        warn!(
            sink = sink.name(),
            query_id = %record.query_id,
            error = %e,
            "Query log write failed"
        );
    }
}

/// Emits each record as one `info!` event on the `groundline::query_log` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        let stages = serde_json::to_string(&record.stages)?;
        info!(
            target: "groundline::query_log",
            query_id = %record.query_id,
            timestamp = %record.timestamp.to_rfc3339(),
            fingerprint = %record.fingerprint,
            question_hash = record.question_hash,
            top_k = record.top_k,
            min_similarity = record.min_similarity,
            result_count = record.result_count,
            cache_hit = record.cache_hit,
            search_strategy = %record.search_strategy,
            fallback_used = record.fallback_used,
            fallback_reason = record.fallback_reason.map(|r| r.as_str()),
            relaxed_min_similarity = record.relaxed_min_similarity,
            stages = %stages,
            search_time_ms = record.search_time_ms,
            generation_time_ms = record.generation_time_ms,
            total_time_ms = record.total_time_ms,
            model_used = record.model_used.as_deref(),
            confidence = record.confidence,
            outcome = %record.outcome,
            error_kind = record.error_kind.as_deref(),
            "query"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
