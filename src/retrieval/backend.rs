use std::future::Future;

use super::error::RetrievalError;
use super::types::{HybridQuery, ScoredCandidate, SearchHit};

/// Store that executes the fused and lexical-only searches.
pub trait SearchBackend: Send + Sync {
    /// Fused vector + lexical search.
    ///
    /// Results are sorted by hybrid score desc, filtered by `min_similarity` and at most
    /// `k` long. Backends computing the two signals separately use [`super::fuse`].
    fn hybrid_search(
        &self,
        query: &HybridQuery,
    ) -> impl Future<Output = Result<Vec<ScoredCandidate>, RetrievalError>> + Send;

    /// Chunks matching at least one query term, with their lexical rank.
    fn lexical_search(
        &self,
        text: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, RetrievalError>> + Send;

    /// Readiness check used by `/ready`.
    fn is_ready(&self) -> impl Future<Output = bool> + Send;

    fn name(&self) -> &'static str;
}
