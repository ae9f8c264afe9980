use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::backend::SearchBackend;
use super::config::FusionConfig;
use super::error::RetrievalError;
use super::fusion::rank_lexical;
use super::types::{
    FallbackReason, HybridQuery, RetrievalOutcome, ScoredCandidate, SearchStrategy,
};
use crate::retry::{RemoteOperation, RetryError, RetryExecutor};

/// Runs the fused search and owns the fallback chain.
///
/// 1. Fused search.
/// 2. On error or an empty result, lexical-only search.
/// 3. If that is empty too, one more fused search with a relaxed threshold.
///
/// Every backend call goes through the retry executor. The retriever never returns an
/// error; a dead backend shows up as an empty outcome with `fallback_used` set.
pub struct HybridRetriever<B> {
    backend: Arc<B>,
    config: FusionConfig,
    retry: RetryExecutor,
}

impl<B> Clone for HybridRetriever<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config,
            retry: self.retry.clone(),
        }
    }
}

impl<B> std::fmt::Debug for HybridRetriever<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("config", &self.config)
            .field("backend_refs", &Arc::strong_count(&self.backend))
            .finish()
    }
}

impl<B: SearchBackend> HybridRetriever<B> {
    pub fn new(backend: Arc<B>, config: FusionConfig, retry: RetryExecutor) -> Self {
        Self {
            backend,
            config,
            retry,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    #[instrument(
        skip(self, vector, text),
        fields(backend = self.backend.name(), dim = vector.len())
    )]
    pub async fn search(
        &self,
        vector: &[f32],
        text: &str,
        k: usize,
        min_similarity: f32,
    ) -> RetrievalOutcome {
        if k == 0 {
            return RetrievalOutcome::hybrid(Vec::new());
        }

        let mut query = HybridQuery {
            vector: vector.to_vec(),
            text: text.to_string(),
            k,
            min_similarity,
            weights: self.config.weights(),
            oversample: self.config.oversample(k),
        };

        let reason = match self.run_hybrid(&query).await {
            Ok(candidates) if !candidates.is_empty() => {
                debug!(results = candidates.len(), "Hybrid search succeeded");
                return RetrievalOutcome::hybrid(candidates);
            }
            Ok(_) => {
                debug!("Hybrid search returned no candidates, falling back to lexical");
                FallbackReason::HybridEmpty
            }
            Err(err) => {
                warn!(error = %err, "Hybrid search failed, falling back to lexical");
                FallbackReason::HybridFailed
            }
        };

        let lexical = self.run_lexical(text, k).await;
        if !lexical.is_empty() {
            return RetrievalOutcome::lexical_fallback(lexical, reason);
        }

        let relaxed = self.config.relax(min_similarity);
        if relaxed >= min_similarity {
            debug!(min_similarity, "Threshold already at floor, not relaxing");
            return RetrievalOutcome::lexical_fallback(Vec::new(), reason);
        }

        query.min_similarity = relaxed;
        let candidates = match self.run_hybrid(&query).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, relaxed, "Relaxed hybrid search failed");
                Vec::new()
            }
        };
        debug!(relaxed, results = candidates.len(), "Relaxed hybrid search");

        RetrievalOutcome {
            strategy: SearchStrategy::Hybrid,
            fallback_used: true,
            fallback_reason: Some(reason),
            relaxed_min_similarity: Some(relaxed),
            candidates,
        }
    }

    /// Lexical-only retrieval for when no query vector is available.
    #[instrument(skip(self, text), fields(backend = self.backend.name()))]
    pub async fn lexical_only(&self, text: &str, k: usize) -> RetrievalOutcome {
        if k == 0 {
            return RetrievalOutcome::lexical_fallback(
                Vec::new(),
                FallbackReason::EmbeddingUnavailable,
            );
        }
        let candidates = self.run_lexical(text, k).await;
        RetrievalOutcome::lexical_fallback(candidates, FallbackReason::EmbeddingUnavailable)
    }

    async fn run_hybrid(
        &self,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredCandidate>, RetryError<RetrievalError>> {
        let backend = self.backend.as_ref();
        self.retry
            .execute(RemoteOperation::Retrieval, move || {
                backend.hybrid_search(query)
            })
            .await
    }

    async fn run_lexical(&self, text: &str, k: usize) -> Vec<ScoredCandidate> {
        let backend = self.backend.as_ref();
        match self
            .retry
            .execute(RemoteOperation::Retrieval, move || {
                backend.lexical_search(text, k)
            })
            .await
        {
            Ok(hits) => rank_lexical(hits, self.config.weights(), k),
            Err(err) => {
                warn!(error = %err, "Lexical search failed");
                Vec::new()
            }
        }
    }
}
