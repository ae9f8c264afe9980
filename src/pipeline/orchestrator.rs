//! Query orchestration.
//!
//! Drives one question through `CacheLookup → Embedding → Retrieval → Reranking →
//! Generation → CacheWrite → Done`, with `ErrorFallback` reachable from embedding,
//! retrieval and generation failures. Every path ends with exactly one [`LogRecord`].

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::error::PipelineError;
use super::state::{PipelineStage, StageTracker};
use super::types::{
    CachedAnswer, NO_KNOWLEDGE_ANSWER, QueryRequest, QueryResponse, QueryStatus, RankedResult,
    ResolvedQuery,
};
use crate::cache::ResultCacheHandle;
use crate::config::{Config, QueryDefaults};
use crate::constants::validate_embedding_dim;
use crate::embedding::{EmbeddingProvider, l2_normalize};
use crate::generation::{
    GenerationError, GenerationProvider, GenerationRequest, GenerationResponse,
};
use crate::hashing::{fingerprint, hash_question};
use crate::rerank::MmrReranker;
use crate::retrieval::{HybridRetriever, RetrievalOutcome, SearchBackend};
use crate::retry::{RemoteOperation, RetryError, RetryExecutor};
use crate::telemetry::{LogRecord, LogSink, emit};

/// What a finished (uncancelled) run hands back before its record is emitted.
struct RunOutput {
    response: QueryResponse,
    record: LogRecord,
}

/// The question-answering pipeline.
///
/// Shared across requests behind an `Arc`; the result cache is the only state that
/// concurrent queries touch.
pub struct Pipeline<B> {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: HybridRetriever<B>,
    reranker: MmrReranker,
    generator: Arc<dyn GenerationProvider>,
    cache: ResultCacheHandle<CachedAnswer>,
    log_sink: Arc<dyn LogSink>,
    retry: RetryExecutor,
    defaults: QueryDefaults,
}

impl<B> std::fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("embedder", &self.embedder.model_name())
            .field("generator", &self.generator.model_name())
            .field("log_sink", &self.log_sink.name())
            .field("reranker", &self.reranker)
            .field("cache", &self.cache)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl<B: SearchBackend> Pipeline<B> {
    /// Wires the pipeline from `config` and its external collaborators.
    pub fn new(
        config: &Config,
        backend: Arc<B>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        let retry = RetryExecutor::new(config.retry.clone());
        Self {
            embedder,
            retriever: HybridRetriever::new(backend, config.fusion, retry.clone()),
            reranker: MmrReranker::new(config.mmr),
            generator,
            cache: ResultCacheHandle::new(config.cache),
            log_sink,
            retry,
            defaults: config.query,
        }
    }

    pub fn cache(&self) -> &ResultCacheHandle<CachedAnswer> {
        &self.cache
    }

    pub fn retriever(&self) -> &HybridRetriever<B> {
        &self.retriever
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn generator(&self) -> &Arc<dyn GenerationProvider> {
        &self.generator
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    /// Whether the search backend can serve queries.
    pub async fn is_ready(&self) -> bool {
        self.retriever.backend().is_ready().await
    }

    /// Model names the generation provider reports, under the model-list retry policy.
    pub async fn generation_models(&self) -> Result<Vec<String>, RetryError<GenerationError>> {
        let generator = &self.generator;
        self.retry
            .execute(RemoteOperation::ModelList, || generator.list_models())
            .await
    }

    /// Validates `request` and applies defaults.
    pub fn resolve(&self, request: &QueryRequest) -> Result<ResolvedQuery, PipelineError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(PipelineError::invalid_request("question must not be empty"));
        }

        let options = request.options.unwrap_or_default();
        let top_k = options.top_k.unwrap_or(self.defaults.default_top_k);
        if top_k == 0 || top_k > self.defaults.max_top_k {
            return Err(PipelineError::invalid_request(format!(
                "topK must be between 1 and {}, got {top_k}",
                self.defaults.max_top_k
            )));
        }

        let min_similarity = options
            .min_similarity
            .unwrap_or(self.defaults.default_min_similarity);
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(PipelineError::invalid_request(format!(
                "minSimilarity must be between 0 and 1, got {min_similarity}"
            )));
        }

        Ok(ResolvedQuery {
            question: question.to_string(),
            top_k,
            min_similarity,
            fingerprint: fingerprint(question, top_k, min_similarity),
            question_hash: hash_question(question),
        })
    }

    /// Answers `request`.
    ///
    /// Only [`PipelineError::InvalidRequest`] is returned as an error; every other outcome,
    /// including a failed generation, is a structured [`QueryResponse`].
    pub async fn answer(&self, request: QueryRequest) -> Result<QueryResponse, PipelineError> {
        self.answer_until(request, std::future::pending::<()>()).await
    }

    /// Like [`Pipeline::answer`], but abandons the query as soon as `cancel` completes.
    ///
    /// A cancelled query drops its in-flight stage, writes nothing to the cache and
    /// returns [`PipelineError::Cancelled`].
    #[instrument(skip(self, request, cancel), fields(question_len = request.question.len()))]
    pub async fn answer_until<C>(
        &self,
        request: QueryRequest,
        cancel: C,
    ) -> Result<QueryResponse, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let query = self.resolve(&request)?;
        let started = tokio::time::Instant::now();

        let finished = tokio::select! {
            biased;
            output = self.run(&query) => Some(output),
            () = cancel => None,
        };

        match finished {
            Some(RunOutput { response, record }) => {
                info!(
                    fingerprint = %record.fingerprint,
                    status = %response.status,
                    cache_hit = record.cache_hit,
                    results = record.result_count,
                    total_ms = record.total_time_ms,
                    "Query finished"
                );
                emit(self.log_sink.as_ref(), &record).await;
                Ok(response)
            }
            None => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(fingerprint = %query.fingerprint, elapsed_ms, "Query cancelled");
                emit(
                    self.log_sink.as_ref(),
                    &LogRecord::cancelled(&query, elapsed_ms),
                )
                .await;
                Err(PipelineError::Cancelled)
            }
        }
    }

    async fn run(&self, query: &ResolvedQuery) -> RunOutput {
        let mut tracker = StageTracker::start();
        let mut record = LogRecord::for_query(query);

        if let Some(hit) = self.cache.get(&query.fingerprint) {
            debug!(
                fingerprint = %query.fingerprint,
                age_ms = hit.age().as_millis() as u64,
                "Cache hit"
            );
            let cached = hit.into_value();
            let response = QueryResponse::from_cached(&cached, true, None);

            record.cache_hit = true;
            record.result_count = cached.ranked.candidates.len();
            record.search_strategy = cached.ranked.search_strategy;
            record.fallback_used = cached.ranked.fallback_used;
            record.fallback_reason = cached.ranked.fallback_reason;
            record.relaxed_min_similarity = cached.ranked.relaxed_min_similarity;
            record.model_used = cached.model_used;
            record.confidence = cached.ranked.confidence;
            record.outcome = cached.status;
            record.total_time_ms = tracker.total_ms();
            record.stages = tracker.finish();

            return RunOutput { response, record };
        }

        tracker.advance(PipelineStage::Embedding);
        let retrieval = match self.embed(&query.question).await {
            Ok(vector) => {
                tracker.advance(PipelineStage::Retrieval);
                let pool = self.reranker.config().pool_size(query.top_k);
                let outcome = self
                    .retriever
                    .search(&vector, &query.question, pool, query.min_similarity)
                    .await;

                tracker.advance(PipelineStage::Reranking);
                let reranked = self
                    .reranker
                    .rerank_default(outcome.candidates, query.top_k);
                RetrievalOutcome {
                    candidates: reranked,
                    ..outcome
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = err.kind(),
                    "Embedding failed, using lexical-only retrieval"
                );
                record.error_kind = Some(err.kind().to_string());
                tracker.advance(PipelineStage::ErrorFallback);
                self.retriever
                    .lexical_only(&query.question, query.top_k)
                    .await
            }
        };

        tracker.advance(PipelineStage::Generation);
        let search_time_ms = tracker.elapsed_in(PipelineStage::Embedding)
            + tracker.elapsed_in(PipelineStage::Retrieval)
            + tracker.elapsed_in(PipelineStage::Reranking)
            + tracker.elapsed_in(PipelineStage::ErrorFallback);

        let candidates = retrieval.candidates;
        let confidence = RankedResult::confidence_of(&candidates);

        let (answer, model_used, status, error) = if candidates.is_empty() {
            debug!("No candidates after all fallbacks");
            if record.error_kind.is_none() {
                record.error_kind = Some(PipelineError::NoCandidates.kind().to_string());
            }
            (
                NO_KNOWLEDGE_ANSWER.to_string(),
                None,
                QueryStatus::NoKnowledge,
                None,
            )
        } else {
            let request = GenerationRequest::new(
                query.question.clone(),
                candidates.iter().map(|c| c.chunk.text.clone()).collect(),
            );
            match self.generate(&request).await {
                Ok(response) => (
                    response.answer,
                    Some(response.model),
                    QueryStatus::Answered,
                    None,
                ),
                Err(err) => {
                    warn!(error = %err, "Answer generation failed");
                    record.error_kind = Some(err.kind().to_string());
                    tracker.advance(PipelineStage::ErrorFallback);
                    (
                        String::new(),
                        None,
                        QueryStatus::GenerationFailed,
                        Some(err.to_string()),
                    )
                }
            }
        };
        let generation_time_ms = tracker.elapsed_in(PipelineStage::Generation);

        let mut ranked = RankedResult {
            candidates,
            confidence,
            search_strategy: retrieval.strategy,
            fallback_used: retrieval.fallback_used,
            fallback_reason: retrieval.fallback_reason,
            relaxed_min_similarity: retrieval.relaxed_min_similarity,
            search_time_ms,
            generation_time_ms,
            total_time_ms: 0,
        };

        let cached = if status == QueryStatus::GenerationFailed {
            ranked.total_time_ms = tracker.total_ms();
            CachedAnswer {
                ranked,
                answer,
                model_used,
                status,
            }
        } else {
            tracker.advance(PipelineStage::CacheWrite);
            ranked.total_time_ms = tracker.total_ms();
            let cached = CachedAnswer {
                ranked,
                answer,
                model_used,
                status,
            };
            self.cache.put(query.fingerprint, cached.clone());
            cached
        };

        let response = QueryResponse::from_cached(&cached, false, error);

        record.result_count = cached.ranked.candidates.len();
        record.search_strategy = cached.ranked.search_strategy;
        record.fallback_used = cached.ranked.fallback_used;
        record.fallback_reason = cached.ranked.fallback_reason;
        record.relaxed_min_similarity = cached.ranked.relaxed_min_similarity;
        record.search_time_ms = search_time_ms;
        record.generation_time_ms = generation_time_ms;
        record.model_used = cached.model_used;
        record.confidence = confidence;
        record.outcome = status;
        record.total_time_ms = tracker.total_ms();
        record.stages = tracker.finish();

        RunOutput { response, record }
    }

    /// Embeds, checks the dimension and L2-normalises the question vector.
    async fn embed(&self, question: &str) -> Result<Vec<f32>, PipelineError> {
        let embedder = self.embedder.as_ref();
        let raw = self
            .retry
            .execute(RemoteOperation::Embedding, move || embedder.embed(question))
            .await
            .map_err(PipelineError::from_embedding)?;

        validate_embedding_dim(raw.len(), embedder.dimension()).map_err(|e| {
            PipelineError::InvalidResponse {
                stage: PipelineStage::Embedding,
                reason: e.to_string(),
            }
        })?;

        l2_normalize(&raw).ok_or_else(|| PipelineError::InvalidResponse {
            stage: PipelineStage::Embedding,
            reason: "embedding is zero or not finite".to_string(),
        })
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, PipelineError> {
        let generator = self.generator.as_ref();
        self.retry
            .execute(RemoteOperation::Generation, move || {
                generator.generate(request)
            })
            .await
            .map_err(PipelineError::from_generation)
    }
}
