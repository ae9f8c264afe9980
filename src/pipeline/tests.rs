use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::Config;
use crate::embedding::{MockEmbedder, MockEmbeddingFailure};
use crate::generation::{MOCK_MODEL_NAME, MockGenerationFailure, MockGenerator};
use crate::retrieval::{
    Chunk, FallbackReason, MockBehavior, MockSearchBackend, ScoredCandidate, SearchStrategy,
};
use crate::telemetry::MemoryLogSink;

const QUESTION: &str = "How do I withdraw funds?";

struct Harness {
    pipeline: Pipeline<MockSearchBackend>,
    backend: Arc<MockSearchBackend>,
    embedder: Arc<MockEmbedder>,
    generator: Arc<MockGenerator>,
    sink: Arc<MemoryLogSink>,
}

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("c1", "faq-withdraw", 0, "How to withdraw funds from your wallet")
            .with_vector(vec![1.0, 0.0, 0.0]),
        Chunk::new("c2", "faq-withdraw", 1, "Withdrawal limits and fees")
            .with_vector(vec![0.8, 0.6, 0.0]),
        Chunk::new("c3", "faq-account", 0, "Reset your password").with_vector(vec![0.0, 1.0, 0.0]),
        Chunk::new("c4", "faq-deposit", 0, "Funds are credited within a day"),
    ]
}

fn harness(chunks: Vec<Chunk>) -> Harness {
    let backend = Arc::new(MockSearchBackend::with_chunks(chunks));
    let embedder = Arc::new(MockEmbedder::new(3));
    embedder.set_vector(QUESTION, vec![2.0, 0.0, 0.0]);
    let generator = Arc::new(MockGenerator::new());
    let sink = Arc::new(MemoryLogSink::new());

    let config = Config {
        embedding_dim: 3,
        ..Default::default()
    };
    let pipeline = Pipeline::new(
        &config,
        backend.clone(),
        embedder.clone(),
        generator.clone(),
        sink.clone(),
    );

    Harness {
        pipeline,
        backend,
        embedder,
        generator,
        sink,
    }
}

fn request(top_k: usize) -> QueryRequest {
    QueryRequest::new(QUESTION).with_options(Some(top_k), Some(0.5))
}

fn source_ids(response: &QueryResponse) -> Vec<&str> {
    response.sources.iter().map(|s| s.id.as_str()).collect()
}

fn stages(record: &crate::telemetry::LogRecord) -> Vec<PipelineStage> {
    record.stages.iter().map(|t| t.stage).collect()
}

#[tokio::test]
async fn test_happy_path_answers_from_hybrid_results() {
    let h = harness(corpus());
    let response = h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(response.status, QueryStatus::Answered);
    assert_eq!(source_ids(&response), vec!["c1", "c2"]);
    assert_eq!(
        response.answer,
        "Based on 2 source(s): How to withdraw funds from your wallet"
    );
    assert!(response.error.is_none());
    assert_eq!(response.metadata.search_strategy, SearchStrategy::Hybrid);
    assert!(!response.metadata.fallback_used);
    assert!(!response.metadata.cache_hit);
    assert_eq!(response.metadata.model_used.as_deref(), Some(MOCK_MODEL_NAME));

    // c1: cosine 1, lexical matches 3 of 4 terms once each.
    let expected = 0.7 + 0.3 * (3.0 / 2.2) / 4.0;
    assert!((response.confidence - expected).abs() < 1e-5);
    assert!((response.sources[0].hybrid_score - expected).abs() < 1e-5);
    assert!((response.sources[0].similarity.unwrap() - 1.0).abs() < 1e-5);

    // The retriever was asked for k * fetch_multiplier candidates.
    assert_eq!(h.backend.hybrid_queries()[0].k, 4);

    let requests = h.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].question, QUESTION);
    assert_eq!(requests[0].context_fragments.len(), 2);
}

#[tokio::test]
async fn test_happy_path_emits_one_record_with_every_stage() {
    let h = harness(corpus());
    h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(h.sink.len(), 1);
    let record = h.sink.last().unwrap();
    assert_eq!(
        stages(&record),
        vec![
            PipelineStage::CacheLookup,
            PipelineStage::Embedding,
            PipelineStage::Retrieval,
            PipelineStage::Reranking,
            PipelineStage::Generation,
            PipelineStage::CacheWrite,
        ]
    );
    assert_eq!(record.outcome, QueryStatus::Answered);
    assert_eq!(record.result_count, 2);
    assert_eq!(record.top_k, 2);
    assert!(!record.cache_hit);
    assert!(!record.fallback_used);
    assert!(record.error_kind.is_none());
    assert_eq!(record.model_used.as_deref(), Some(MOCK_MODEL_NAME));
    assert_eq!(
        record.fingerprint,
        crate::hashing::fingerprint(QUESTION, 2, 0.5).to_hex()
    );
}

#[tokio::test]
async fn test_cache_hit_returns_cached_result_unchanged() {
    let h = harness(corpus());
    let first = h.pipeline.answer(request(2)).await.unwrap();

    let second = h
        .pipeline
        .answer(QueryRequest::new("  how do i   WITHDRAW funds? ").with_options(Some(2), Some(0.5)))
        .await
        .unwrap();

    let mut expected = first.clone();
    expected.metadata.cache_hit = true;
    assert_eq!(second, expected);

    assert_eq!(h.embedder.call_count(), 1);
    assert_eq!(h.generator.call_count(), 1);
    assert_eq!(h.backend.hybrid_calls(), 1);

    let records = h.sink.records();
    assert_eq!(records.len(), 2);
    assert!(records[1].cache_hit);
    assert_eq!(stages(&records[1]), vec![PipelineStage::CacheLookup]);
    assert_eq!(records[1].result_count, 2);
}

#[tokio::test]
async fn test_different_parameters_miss_the_cache() {
    let h = harness(corpus());
    h.pipeline.answer(request(2)).await.unwrap();
    h.pipeline.answer(request(3)).await.unwrap();
    assert_eq!(h.embedder.call_count(), 2);
}

#[tokio::test]
async fn test_embedding_failure_takes_lexical_fallback() {
    let h = harness(corpus());
    h.embedder.fail_with(MockEmbeddingFailure::BadRequest);

    let response = h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(h.embedder.call_count(), 1);
    assert_eq!(h.backend.hybrid_calls(), 0);
    assert_eq!(response.status, QueryStatus::Answered);
    assert_eq!(source_ids(&response), vec!["c1", "c4"]);
    assert!(response.sources.iter().all(|s| s.similarity.is_none()));
    assert_eq!(
        response.metadata.search_strategy,
        SearchStrategy::LexicalFallback
    );
    assert!(response.metadata.fallback_used);
    assert_eq!(
        response.metadata.fallback_reason,
        Some(FallbackReason::EmbeddingUnavailable)
    );

    let record = h.sink.last().unwrap();
    assert_eq!(record.error_kind.as_deref(), Some("remote_unavailable"));
    assert_eq!(
        stages(&record),
        vec![
            PipelineStage::CacheLookup,
            PipelineStage::Embedding,
            PipelineStage::ErrorFallback,
            PipelineStage::Generation,
            PipelineStage::CacheWrite,
        ]
    );
}

#[tokio::test]
async fn test_zero_embedding_is_invalid_response() {
    let h = harness(corpus());
    h.embedder.fail_with(MockEmbeddingFailure::ZeroVector);

    let response = h.pipeline.answer(request(2)).await.unwrap();
    assert!(response.metadata.fallback_used);

    let record = h.sink.last().unwrap();
    assert_eq!(record.error_kind.as_deref(), Some("invalid_response"));
}

#[tokio::test]
async fn test_wrong_dimension_is_invalid_response() {
    let h = harness(corpus());
    h.embedder.fail_with(MockEmbeddingFailure::WrongDimension);

    h.pipeline.answer(request(2)).await.unwrap();
    let record = h.sink.last().unwrap();
    assert_eq!(record.error_kind.as_deref(), Some("invalid_response"));
    assert_eq!(h.backend.hybrid_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_embedder_is_retried_then_falls_back() {
    let h = harness(corpus());
    h.embedder.fail_with(MockEmbeddingFailure::Unavailable);

    let response = h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(h.embedder.call_count(), 3);
    assert_eq!(
        response.metadata.search_strategy,
        SearchStrategy::LexicalFallback
    );
    assert_eq!(response.status, QueryStatus::Answered);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_embedder_times_out() {
    let h = harness(corpus());
    h.embedder.fail_with(MockEmbeddingFailure::Hang);

    let response = h.pipeline.answer(request(2)).await.unwrap();
    assert!(response.metadata.fallback_used);

    let record = h.sink.last().unwrap();
    assert_eq!(record.error_kind.as_deref(), Some("timeout"));
    // Three 20s attempts plus 1s and 2s of backoff.
    assert!(record.total_time_ms >= 63_000);
}

#[tokio::test]
async fn test_no_candidates_yields_no_knowledge_answer() {
    let h = harness(Vec::new());

    let response = h.pipeline.answer(request(5)).await.unwrap();

    assert_eq!(response.status, QueryStatus::NoKnowledge);
    assert_eq!(response.answer, NO_KNOWLEDGE_ANSWER);
    assert!(response.sources.is_empty());
    assert_eq!(response.confidence, 0.0);
    assert!(response.metadata.fallback_used);
    assert!(response.metadata.model_used.is_none());
    assert_eq!(h.generator.call_count(), 0);

    let record = h.sink.last().unwrap();
    assert_eq!(record.outcome, QueryStatus::NoKnowledge);
    assert_eq!(record.error_kind.as_deref(), Some("no_candidates"));
    assert_eq!(record.relaxed_min_similarity, Some(0.25));

    // No-knowledge results are cached like any other completed answer.
    let again = h.pipeline.answer(request(5)).await.unwrap();
    assert!(again.metadata.cache_hit);
    assert_eq!(h.embedder.call_count(), 1);
}

#[tokio::test]
async fn test_hybrid_failure_is_transparent_fallback() {
    let h = harness(corpus());
    h.backend.set_hybrid(MockBehavior::Rejected);

    let response = h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(response.status, QueryStatus::Answered);
    assert_eq!(
        response.metadata.fallback_reason,
        Some(FallbackReason::HybridFailed)
    );
    assert_eq!(
        response.metadata.search_strategy,
        SearchStrategy::LexicalFallback
    );
    assert_eq!(source_ids(&response), vec!["c1", "c4"]);

    let record = h.sink.last().unwrap();
    assert!(record.fallback_used);
    assert!(record.error_kind.is_none());
}

#[tokio::test]
async fn test_generation_failure_is_reported_and_not_cached() {
    let h = harness(corpus());
    h.generator.fail_with(MockGenerationFailure::Rejected);

    let response = h.pipeline.answer(request(2)).await.unwrap();

    assert_eq!(response.status, QueryStatus::GenerationFailed);
    assert!(response.answer.is_empty());
    assert!(response.error.as_deref().unwrap().contains("generation"));
    assert_eq!(source_ids(&response), vec!["c1", "c2"]);
    assert!(response.metadata.model_used.is_none());
    assert_eq!(h.generator.call_count(), 1);

    let record = h.sink.last().unwrap();
    assert_eq!(record.outcome, QueryStatus::GenerationFailed);
    assert_eq!(record.error_kind.as_deref(), Some("generation_failed"));
    assert_eq!(
        stages(&record),
        vec![
            PipelineStage::CacheLookup,
            PipelineStage::Embedding,
            PipelineStage::Retrieval,
            PipelineStage::Reranking,
            PipelineStage::Generation,
            PipelineStage::ErrorFallback,
        ]
    );

    h.generator.clear_failure();
    let retried = h.pipeline.answer(request(2)).await.unwrap();
    assert!(!retried.metadata.cache_hit);
    assert_eq!(retried.status, QueryStatus::Answered);
    assert_eq!(h.generator.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_generation_failure_recovers_on_retry() {
    let h = harness(corpus());
    h.generator.fail_times(MockGenerationFailure::Unavailable, 2);

    let response = h.pipeline.answer(request(2)).await.unwrap();
    assert_eq!(response.status, QueryStatus::Answered);
    assert_eq!(h.generator.call_count(), 3);
}

#[tokio::test]
async fn test_generation_models_lists_provider_models() {
    let h = harness(corpus());
    let models = h.pipeline.generation_models().await.unwrap();
    assert_eq!(models, vec![MOCK_MODEL_NAME.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_generation_models_retries_under_model_list_policy() {
    let h = harness(corpus());
    h.generator.fail_with(MockGenerationFailure::Unavailable);
    let start = tokio::time::Instant::now();

    let err = h.pipeline.generation_models().await.unwrap_err();
    assert_eq!(err.attempts(), 3);
    assert!(err.last_error().is_some());
    // 1 s then 2 s of backoff between the three attempts.
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_generation_models_rejection_is_not_retried() {
    let h = harness(corpus());
    h.generator.fail_with(MockGenerationFailure::Rejected);
    let start = tokio::time::Instant::now();

    let err = h.pipeline.generation_models().await.unwrap_err();
    assert_eq!(err.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_without_logging() {
    let h = harness(corpus());

    let cases = [
        QueryRequest::new("   "),
        QueryRequest::new(QUESTION).with_options(Some(0), None),
        QueryRequest::new(QUESTION).with_options(Some(51), None),
        QueryRequest::new(QUESTION).with_options(None, Some(1.5)),
        QueryRequest::new(QUESTION).with_options(None, Some(f32::NAN)),
    ];
    for case in cases {
        let err = h.pipeline.answer(case).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    assert!(h.sink.is_empty());
    assert_eq!(h.embedder.call_count(), 0);
}

#[tokio::test]
async fn test_defaults_apply_when_options_missing() {
    let h = harness(corpus());
    let query = h.pipeline.resolve(&QueryRequest::new(QUESTION)).unwrap();
    assert_eq!(query.top_k, 5);
    assert_eq!(query.min_similarity, 0.5);
    assert_eq!(query.question, QUESTION);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_without_caching() {
    let h = harness(corpus());
    h.generator.fail_with(MockGenerationFailure::Hang);

    let result = h
        .pipeline
        .answer_until(request(2), tokio::time::sleep(Duration::from_secs(1)))
        .await;

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert!(h.pipeline.cache().is_empty());

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, QueryStatus::Cancelled);
    assert_eq!(records[0].error_kind.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn test_log_sink_failure_does_not_fail_query() {
    let h = harness(corpus());
    h.sink.set_failing(true);

    let response = h.pipeline.answer(request(2)).await.unwrap();
    assert_eq!(response.status, QueryStatus::Answered);
    assert!(h.sink.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_are_independent() {
    let h = harness(corpus());
    let pipeline = Arc::new(h.pipeline);

    let handles: Vec<_> = (1..=8)
        .map(|k| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.answer(request(k)).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, QueryStatus::Answered);
        assert!(response.sources.len() <= i + 1);
    }
    assert_eq!(h.sink.len(), 8);
}

#[test]
fn test_confidence_is_clamped() {
    let candidate = |score: f32| ScoredCandidate {
        chunk: Chunk::new("x", "d", 0, "t"),
        cosine_similarity: None,
        lexical_rank: 0.0,
        hybrid_score: score,
    };

    assert_eq!(RankedResult::confidence_of(&[]), 0.0);
    assert_eq!(RankedResult::confidence_of(&[candidate(1.4)]), 1.0);
    assert_eq!(RankedResult::confidence_of(&[candidate(-0.2)]), 0.0);
    assert_eq!(
        RankedResult::confidence_of(&[candidate(0.25), candidate(0.5)]),
        0.5
    );
}

#[test]
fn test_stage_transitions() {
    use PipelineStage::*;

    assert!(CacheLookup.can_transition_to(Done));
    assert!(CacheLookup.can_transition_to(Embedding));
    assert!(Embedding.can_transition_to(ErrorFallback));
    assert!(Retrieval.can_transition_to(ErrorFallback));
    assert!(Generation.can_transition_to(ErrorFallback));
    assert!(ErrorFallback.can_transition_to(Generation));
    assert!(CacheWrite.can_transition_to(Done));

    assert!(!CacheLookup.can_transition_to(Generation));
    assert!(!Reranking.can_transition_to(ErrorFallback));
    assert!(!Done.can_transition_to(CacheLookup));
    assert_eq!(ErrorFallback.to_string(), "error_fallback");
}

#[tokio::test(start_paused = true)]
async fn test_stage_tracker_times_stages() {
    let mut tracker = StageTracker::start();
    tokio::time::advance(Duration::from_millis(5)).await;
    tracker.advance(PipelineStage::Embedding);
    tokio::time::advance(Duration::from_millis(20)).await;
    tracker.advance(PipelineStage::Retrieval);

    assert_eq!(tracker.current(), PipelineStage::Retrieval);
    assert_eq!(tracker.elapsed_in(PipelineStage::Embedding), 20);
    assert_eq!(
        tracker.path(),
        vec![PipelineStage::CacheLookup, PipelineStage::Embedding]
    );

    let timings = tracker.finish();
    assert_eq!(timings.len(), 3);
    assert_eq!(timings[0].elapsed_ms, 5);
}

#[test]
fn test_response_serializes_camel_case() {
    let response = QueryResponse {
        answer: "a".to_string(),
        sources: Vec::new(),
        confidence: 0.5,
        search_time_ms: 3,
        processing_time_ms: 7,
        status: QueryStatus::NoKnowledge,
        error: None,
        metadata: ResponseMetadata {
            search_strategy: SearchStrategy::LexicalFallback,
            model_used: None,
            fallback_used: true,
            fallback_reason: Some(FallbackReason::HybridEmpty),
            cache_hit: false,
        },
    };

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["searchTimeMs"], 3);
    assert_eq!(json["processingTimeMs"], 7);
    assert_eq!(json["status"], "no_knowledge");
    assert!(json.get("error").is_none());
    assert_eq!(json["metadata"]["searchStrategy"], "lexical-fallback");
    assert_eq!(json["metadata"]["fallbackUsed"], true);
    assert_eq!(json["metadata"]["fallbackReason"], "hybrid_empty");
    assert_eq!(json["metadata"]["cacheHit"], false);
}
