use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::{QueryStatus, ResolvedQuery, StageTiming};
use crate::retrieval::{FallbackReason, SearchStrategy};

/// One query's execution, written once and never mutated.
///
/// Carries the question hash, never the question text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub query_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Hex cache fingerprint.
    pub fingerprint: String,
    pub question_hash: u64,
    pub top_k: usize,
    pub min_similarity: f32,
    pub result_count: usize,
    pub cache_hit: bool,
    pub search_strategy: SearchStrategy,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub relaxed_min_similarity: Option<f32>,
    pub stages: Vec<StageTiming>,
    pub search_time_ms: u64,
    pub generation_time_ms: u64,
    pub total_time_ms: u64,
    pub model_used: Option<String>,
    pub confidence: f32,
    pub outcome: QueryStatus,
    pub error_kind: Option<String>,
}

impl LogRecord {
    /// A record for `query` with every result field zeroed.
    pub fn for_query(query: &ResolvedQuery) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            fingerprint: query.fingerprint.to_hex(),
            question_hash: query.question_hash,
            top_k: query.top_k,
            min_similarity: query.min_similarity,
            result_count: 0,
            cache_hit: false,
            search_strategy: SearchStrategy::Hybrid,
            fallback_used: false,
            fallback_reason: None,
            relaxed_min_similarity: None,
            stages: Vec::new(),
            search_time_ms: 0,
            generation_time_ms: 0,
            total_time_ms: 0,
            model_used: None,
            confidence: 0.0,
            outcome: QueryStatus::Answered,
            error_kind: None,
        }
    }

    /// Record for a query the caller abandoned mid-flight.
    pub fn cancelled(query: &ResolvedQuery, total_time_ms: u64) -> Self {
        Self {
            total_time_ms,
            outcome: QueryStatus::Cancelled,
            error_kind: Some("cancelled".to_string()),
            ..Self::for_query(query)
        }
    }
}
