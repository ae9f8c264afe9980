use serde::{Deserialize, Serialize};

use crate::hashing::Fingerprint;
use crate::retrieval::{FallbackReason, ScoredCandidate, SearchStrategy};

/// Fixed reply when retrieval found nothing after every fallback.
pub const NO_KNOWLEDGE_ANSWER: &str =
    "I could not find anything in the knowledge base that answers this question.";

/// Inbound question with optional per-request overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QueryOptions>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, top_k: Option<usize>, min_similarity: Option<f32>) -> Self {
        self.options = Some(QueryOptions {
            top_k,
            min_similarity,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub min_similarity: Option<f32>,
}

/// A validated request with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub question: String,
    pub top_k: usize,
    pub min_similarity: f32,
    pub fingerprint: Fingerprint,
    pub question_hash: u64,
}

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Answered,
    /// Retrieval found nothing; the answer is [`NO_KNOWLEDGE_ANSWER`].
    NoKnowledge,
    /// Generation failed after retries; no answer text is fabricated.
    GenerationFailed,
    /// The caller went away before the pipeline finished.
    Cancelled,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Answered => "answered",
            QueryStatus::NoKnowledge => "no_knowledge",
            QueryStatus::GenerationFailed => "generation_failed",
            QueryStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reranked candidates with aggregate confidence and timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidates: Vec<ScoredCandidate>,
    pub confidence: f32,
    pub search_strategy: SearchStrategy,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub relaxed_min_similarity: Option<f32>,
    pub search_time_ms: u64,
    pub generation_time_ms: u64,
    pub total_time_ms: u64,
}

impl RankedResult {
    /// Top hybrid score clamped into `[0, 1]`; `0.0` without candidates.
    pub fn confidence_of(candidates: &[ScoredCandidate]) -> f32 {
        candidates
            .iter()
            .map(|c| c.hybrid_score)
            .filter(|s| s.is_finite())
            .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))))
            .map_or(0.0, |top| top.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// What the result cache stores per fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    pub ranked: RankedResult,
    pub answer: String,
    pub model_used: Option<String>,
    pub status: QueryStatus,
}

/// One cited chunk in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Hybrid score clamped into `[0, 1]`.
    pub score: f32,
    /// Cosine similarity; `None` for lexical-only candidates.
    pub similarity: Option<f32>,
    pub hybrid_score: f32,
}

impl From<&ScoredCandidate> for Source {
    fn from(candidate: &ScoredCandidate) -> Self {
        Self {
            id: candidate.chunk.id.clone(),
            document_id: candidate.chunk.document_id.clone(),
            content: candidate.chunk.text.clone(),
            score: if candidate.hybrid_score.is_finite() {
                candidate.hybrid_score.clamp(0.0, 1.0)
            } else {
                0.0
            },
            similarity: candidate.cosine_similarity,
            hybrid_score: candidate.hybrid_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub search_strategy: SearchStrategy,
    pub model_used: Option<String>,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub cache_hit: bool,
}

/// Structured answer returned for every completed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: f32,
    pub search_time_ms: u64,
    pub processing_time_ms: u64,
    pub status: QueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

impl QueryResponse {
    pub(crate) fn from_cached(
        cached: &CachedAnswer,
        cache_hit: bool,
        error: Option<String>,
    ) -> Self {
        let ranked = &cached.ranked;
        Self {
            answer: cached.answer.clone(),
            sources: ranked.candidates.iter().map(Source::from).collect(),
            confidence: ranked.confidence,
            search_time_ms: ranked.search_time_ms,
            processing_time_ms: ranked.total_time_ms,
            status: cached.status,
            error,
            metadata: ResponseMetadata {
                search_strategy: ranked.search_strategy,
                model_used: cached.model_used.clone(),
                fallback_used: ranked.fallback_used,
                fallback_reason: ranked.fallback_reason,
                cache_hit,
            },
        }
    }

    #[inline]
    pub fn is_answered(&self) -> bool {
        self.status == QueryStatus::Answered
    }
}
