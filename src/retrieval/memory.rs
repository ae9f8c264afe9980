//! In-process corpus implementing the fused search exactly.
//!
//! Serves as the offline backend and as the reference scoring oracle for tests.

use std::cmp::Ordering;

use parking_lot::RwLock;
use tracing::debug;

use super::backend::SearchBackend;
use super::error::RetrievalError;
use super::fusion::fuse;
use super::lexical::LexicalQuery;
use super::types::{Chunk, HybridQuery, ScoredCandidate, SearchHit};
use crate::embedding::{cosine_similarity, l2_normalize};

#[derive(Default)]
pub struct InMemorySearchBackend {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemorySearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let backend = Self::new();
        backend.extend(chunks);
        backend
    }

    /// Inserts or replaces a chunk by id. Stored vectors are L2-normalised; a vector that
    /// cannot be normalised is dropped.
    pub fn insert(&self, mut chunk: Chunk) {
        chunk.vector = chunk.vector.as_deref().and_then(l2_normalize);

        let mut chunks = self.chunks.write();
        match chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk,
            None => chunks.push(chunk),
        }
    }

    pub fn extend(&self, chunks: impl IntoIterator<Item = Chunk>) {
        for chunk in chunks {
            self.insert(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    pub fn clear(&self) {
        self.chunks.write().clear();
    }

    fn collect_hybrid_hits(&self, query: &HybridQuery) -> Vec<SearchHit> {
        let lexical = LexicalQuery::parse(&query.text);
        let chunks = self.chunks.read();

        let scored: Vec<SearchHit> = chunks
            .iter()
            .map(|chunk| {
                let cosine = chunk
                    .vector
                    .as_deref()
                    .filter(|v| v.len() == query.vector.len())
                    .map(|v| cosine_similarity(v, &query.vector));
                SearchHit {
                    chunk: chunk.clone(),
                    cosine_similarity: cosine,
                    lexical_rank: lexical.score(&chunk.text),
                }
            })
            .collect();
        drop(chunks);

        let mut vector_side: Vec<&SearchHit> = scored
            .iter()
            .filter(|hit| hit.cosine_similarity.is_some())
            .collect();
        vector_side.sort_by(|a, b| {
            b.cosine_similarity
                .partial_cmp(&a.cosine_similarity)
                .unwrap_or(Ordering::Equal)
        });
        vector_side.truncate(query.oversample);

        let mut hits: Vec<SearchHit> = vector_side.into_iter().cloned().collect();
        hits.extend(scored.iter().filter(|hit| hit.lexical_rank > 0.0).cloned());
        hits
    }

    fn collect_lexical_hits(&self, text: &str, k: usize) -> Vec<SearchHit> {
        let lexical = LexicalQuery::parse(text);
        if lexical.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .chunks
            .read()
            .iter()
            .filter_map(|chunk| {
                let lexical_rank = lexical.score(&chunk.text);
                (lexical_rank > 0.0).then(|| SearchHit {
                    chunk: chunk.clone(),
                    cosine_similarity: None,
                    lexical_rank,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.lexical_rank
                .partial_cmp(&a.lexical_rank)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);
        hits
    }
}

impl std::fmt::Debug for InMemorySearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySearchBackend")
            .field("chunks", &self.len())
            .finish()
    }
}

impl SearchBackend for InMemorySearchBackend {
    async fn hybrid_search(
        &self,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        if query.vector.is_empty() {
            return Err(RetrievalError::InvalidQuery {
                reason: "query vector is empty".to_string(),
            });
        }

        let hits = self.collect_hybrid_hits(query);
        let candidates = fuse(hits, query);
        debug!(
            k = query.k,
            oversample = query.oversample,
            results = candidates.len(),
            "In-memory hybrid search"
        );
        Ok(candidates)
    }

    async fn lexical_search(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        Ok(self.collect_lexical_hits(text, k))
    }

    async fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
