//! Hybrid vector + lexical retrieval.
//!
//! `hybrid_score = vector_weight * cosine + lexical_weight * lexical_rank`
//! (0.7 / 0.3 by default). Vector candidates are oversampled as `max(factor * k, min)`
//! before the `min_similarity` filter so the final top-k is not starved.
//!
//! - [`SearchBackend`] executes the searches ([`InMemorySearchBackend`],
//!   [`QdrantSearchBackend`]).
//! - [`HybridRetriever`] drives a backend and owns the fallback chain.

pub mod backend;
pub mod config;
pub mod error;
pub mod fusion;
pub mod lexical;
pub mod memory;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod qdrant;
pub mod retriever;
pub mod types;


pub use backend::SearchBackend;
pub use config::FusionConfig;
pub use error::{RetrievalError, RetrievalResult};
pub use fusion::{fuse, rank_lexical, sort_candidates};
pub use lexical::{LexicalQuery, tokenize};
pub use memory::InMemorySearchBackend;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBehavior, MockSearchBackend};
pub use qdrant::{DEFAULT_COLLECTION_NAME, QdrantSearchBackend};
pub use retriever::HybridRetriever;
pub use types::{
    Chunk, FallbackReason, FusionWeights, HybridQuery, RetrievalOutcome, ScoredCandidate,
    SearchHit, SearchStrategy,
};
