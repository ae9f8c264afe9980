//! Groundline library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Query pipeline
//! - [`Pipeline`], [`QueryRequest`], [`QueryResponse`], [`PipelineError`] - Orchestration
//! - [`PipelineStage`], [`StageTracker`] - State machine and per-stage timings
//! - [`Config`], [`ConfigError`] - Server and pipeline configuration
//!
//! ## Retrieval & Ranking
//! - [`HybridRetriever`], [`SearchBackend`] - Fused vector + lexical search with fallbacks
//! - [`InMemorySearchBackend`], [`QdrantSearchBackend`] - Backends
//! - [`MmrReranker`], [`MmrConfig`] - Diversity reranking
//!
//! ## Remote collaborators
//! - [`EmbeddingProvider`], [`HttpEmbeddingClient`], [`HashEmbedder`] - Embeddings
//! - [`GenerationProvider`], [`GenaiGenerator`], [`EchoGenerator`] - Answer generation
//! - [`RetryExecutor`], [`RetryPolicy`] - Timeouts and exponential backoff
//!
//! ## Cache & Telemetry
//! - [`ResultCache`], [`ResultCacheHandle`] - TTL-bounded result cache
//! - [`LogRecord`], [`LogSink`] - One structured record per query
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod generation;
pub mod hashing;
pub mod pipeline;
pub mod rerank;
pub mod retrieval;
pub mod retry;
pub mod telemetry;

pub use cache::{
    CACHE_STATUS_HEADER, CacheConfig, CacheLookup, CacheStatus, ResultCache, ResultCacheHandle,
    SERVICE_STATUS_HEADER,
};

pub use config::{Config, ConfigError, QueryDefaults};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};

#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockEmbedder, MockEmbeddingFailure};
pub use embedding::{
    EmbeddingError, EmbeddingProvider, HashEmbedder, HttpEmbeddingClient, cosine_similarity,
    l2_normalize,
};

#[cfg(any(test, feature = "mock"))]
pub use generation::{MockGenerationFailure, MockGenerator};
pub use generation::{
    EchoGenerator, GenaiGenerator, GenerationError, GenerationProvider, GenerationRequest,
    GenerationResponse,
};

pub use hashing::{Fingerprint, fingerprint, hash_question, hash_to_u64, normalize_question};

pub use pipeline::{
    NO_KNOWLEDGE_ANSWER, Pipeline, PipelineError, PipelineStage, QueryOptions, QueryRequest,
    QueryResponse, QueryStatus, StageTracker,
};

pub use rerank::{MmrConfig, MmrReranker};

#[cfg(any(test, feature = "mock"))]
pub use retrieval::{MockBehavior, MockSearchBackend};
pub use retrieval::{
    Chunk, FallbackReason, FusionConfig, HybridRetriever, InMemorySearchBackend,
    QdrantSearchBackend, RetrievalError, RetrievalOutcome, ScoredCandidate, SearchBackend,
    SearchStrategy,
};

pub use retry::{RemoteOperation, RetryConfig, RetryError, RetryExecutor, RetryPolicy, Retryable};

#[cfg(any(test, feature = "mock"))]
pub use telemetry::MemoryLogSink;
pub use telemetry::{JsonlLogSink, LogRecord, LogSink, LogSinkError, TracingLogSink};
