use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LEXICAL_WEIGHT, DEFAULT_VECTOR_WEIGHT};

/// A retrievable unit of knowledge-base text. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    /// Position of this chunk inside its parent document.
    pub position: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        position: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            position,
            text: text.into(),
            vector: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// One backend hit before fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// `None` when the hit came from the lexical side only.
    pub cosine_similarity: Option<f32>,
    pub lexical_rank: f32,
}

/// A chunk with its two retrieval signals and their fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub cosine_similarity: Option<f32>,
    pub lexical_rank: f32,
    pub hybrid_score: f32,
}

impl ScoredCandidate {
    pub fn new(hit: SearchHit, weights: FusionWeights) -> Self {
        let hybrid_score = weights.score(hit.cosine_similarity, hit.lexical_rank);
        Self {
            chunk: hit.chunk,
            cosine_similarity: hit.cosine_similarity,
            lexical_rank: hit.lexical_rank,
            hybrid_score,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.chunk.id
    }

    #[inline]
    pub fn vector(&self) -> Option<&[f32]> {
        self.chunk.vector.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: DEFAULT_VECTOR_WEIGHT,
            lexical: DEFAULT_LEXICAL_WEIGHT,
        }
    }
}

impl FusionWeights {
    /// `vector * cosine + lexical * lexical_rank`, with an unset cosine counted as `0.0`.
    #[inline]
    pub fn score(&self, cosine_similarity: Option<f32>, lexical_rank: f32) -> f32 {
        self.vector * cosine_similarity.unwrap_or(0.0) + self.lexical * lexical_rank
    }
}

/// Request handed to a [`super::SearchBackend`] for the fused search.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    /// Unit-length query vector.
    pub vector: Vec<f32>,
    pub text: String,
    pub k: usize,
    pub min_similarity: f32,
    pub weights: FusionWeights,
    /// Vector candidates fetched before filtering.
    pub oversample: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchStrategy {
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "lexical-fallback")]
    LexicalFallback,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Hybrid => "hybrid",
            SearchStrategy::LexicalFallback => "lexical-fallback",
        }
    }
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the primary hybrid path was not used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The fused search errored or timed out after retries.
    HybridFailed,
    /// The fused search returned zero candidates.
    HybridEmpty,
    /// No query vector was available.
    EmbeddingUnavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::HybridFailed => "hybrid_failed",
            FallbackReason::HybridEmpty => "hybrid_empty",
            FallbackReason::EmbeddingUnavailable => "embedding_unavailable",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the retriever found and which path produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    pub candidates: Vec<ScoredCandidate>,
    pub strategy: SearchStrategy,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    /// Set when the threshold-relaxation retry ran.
    pub relaxed_min_similarity: Option<f32>,
}

impl RetrievalOutcome {
    pub fn hybrid(candidates: Vec<ScoredCandidate>) -> Self {
        Self {
            candidates,
            strategy: SearchStrategy::Hybrid,
            fallback_used: false,
            fallback_reason: None,
            relaxed_min_similarity: None,
        }
    }

    pub fn lexical_fallback(candidates: Vec<ScoredCandidate>, reason: FallbackReason) -> Self {
        Self {
            candidates,
            strategy: SearchStrategy::LexicalFallback,
            fallback_used: true,
            fallback_reason: Some(reason),
            relaxed_min_similarity: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}
