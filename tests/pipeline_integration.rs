//! Pipeline integration tests against the in-memory backend and the JSON-lines log sink.

mod common;

use std::sync::Arc;
use std::time::Duration;

use groundline::config::Config;
use groundline::generation::EchoGenerator;
use groundline::pipeline::{Pipeline, QueryRequest, QueryStatus};
use groundline::retrieval::{
    Chunk, FusionConfig, HybridRetriever, InMemorySearchBackend, SearchStrategy,
};
use groundline::retry::{RetryConfig, RetryExecutor};
use groundline::telemetry::{JsonlLogSink, LogRecord, MemoryLogSink};
use groundline::{MmrReranker, PipelineStage};
use tempfile::TempDir;

use common::fixtures::{TEST_EMBEDDING_DIM, WITHDRAW_QUESTION, embedder, faq_corpus};

fn config() -> Config {
    Config {
        embedding_dim: TEST_EMBEDDING_DIM,
        ..Default::default()
    }
}

async fn pipeline_with_file_log(
    dir: &TempDir,
) -> (Pipeline<InMemorySearchBackend>, std::path::PathBuf) {
    let path = dir.path().join("queries.jsonl");
    let sink = JsonlLogSink::open(&path).await.expect("log file should open");

    let pipeline = Pipeline::new(
        &config(),
        Arc::new(InMemorySearchBackend::with_chunks(faq_corpus())),
        Arc::new(embedder()),
        Arc::new(EchoGenerator),
        Arc::new(sink),
    );
    (pipeline, path)
}

fn read_records(path: &std::path::Path) -> Vec<LogRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_every_query_appends_one_log_line() {
    let dir = TempDir::new().unwrap();
    let (pipeline, path) = pipeline_with_file_log(&dir).await;

    pipeline
        .answer(QueryRequest::new(WITHDRAW_QUESTION))
        .await
        .unwrap();
    pipeline
        .answer(QueryRequest::new(WITHDRAW_QUESTION))
        .await
        .unwrap();
    pipeline
        .answer(QueryRequest::new("How do I reset my password?"))
        .await
        .unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 3);

    assert!(!records[0].cache_hit);
    assert_eq!(records[0].outcome, QueryStatus::Answered);
    assert_eq!(records[0].model_used.as_deref(), Some("echo"));
    assert_eq!(records[0].stages.last().unwrap().stage, PipelineStage::CacheWrite);

    assert!(records[1].cache_hit);
    assert_eq!(records[1].fingerprint, records[0].fingerprint);
    assert_ne!(records[1].query_id, records[0].query_id);

    assert_ne!(records[2].question_hash, records[0].question_hash);
}

#[tokio::test]
async fn test_log_lines_do_not_contain_question_text() {
    let dir = TempDir::new().unwrap();
    let (pipeline, path) = pipeline_with_file_log(&dir).await;

    pipeline
        .answer(QueryRequest::new("Where is my withdrawal?"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("Where is my withdrawal"));
    assert!(raw.contains("\"question_hash\""));
}

#[tokio::test(start_paused = true)]
async fn test_cached_answer_expires_after_ttl() {
    let sink = Arc::new(MemoryLogSink::new());
    let pipeline = Pipeline::new(
        &config(),
        Arc::new(InMemorySearchBackend::with_chunks(faq_corpus())),
        Arc::new(embedder()),
        Arc::new(EchoGenerator),
        sink.clone(),
    );
    let request = QueryRequest::new(WITHDRAW_QUESTION);

    pipeline.answer(request.clone()).await.unwrap();

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(pipeline.answer(request.clone()).await.unwrap().metadata.cache_hit);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!pipeline.answer(request).await.unwrap().metadata.cache_hit);

    let hits: Vec<bool> = sink.records().iter().map(|r| r.cache_hit).collect();
    assert_eq!(hits, vec![false, true, false]);
}

#[tokio::test]
async fn test_hybrid_scoring_scenario() {
    // A 0.92 cosine with a full lexical match outranks a 0.9 cosine with none.
    let target = {
        let mut chunk = Chunk::new("target", "faq", 0, "Как сделать вывод средств");
        chunk.vector = Some(vec![0.92, (1.0f32 - 0.92 * 0.92).sqrt(), 0.0]);
        chunk
    };
    let rival = Chunk::new("rival", "faq", 1, "unrelated words only")
        .with_vector(vec![0.9, 0.0, (1.0f32 - 0.81).sqrt()]);

    let backend = Arc::new(InMemorySearchBackend::with_chunks([target, rival]));
    let retriever = HybridRetriever::new(
        backend,
        FusionConfig::default(),
        RetryExecutor::new(RetryConfig::default()),
    );

    let outcome = retriever
        .search(&[1.0, 0.0, 0.0], "Как сделать вывод средств?", 5, 0.5)
        .await;

    assert_eq!(outcome.strategy, SearchStrategy::Hybrid);
    assert_eq!(outcome.candidates[0].id(), "target");
    assert_eq!(outcome.candidates[1].id(), "rival");

    let top = &outcome.candidates[0];
    let expected = 0.7 * top.cosine_similarity.unwrap() + 0.3 * top.lexical_rank;
    assert!((top.hybrid_score - expected).abs() < 1e-5);
    assert!((top.cosine_similarity.unwrap() - 0.92).abs() < 1e-5);
}

#[test]
fn test_mmr_prefers_diverse_candidate_scenario() {
    let reranker = MmrReranker::default();
    let candidate = |id: &str, cosine: f32, vector: Vec<f32>| {
        groundline::ScoredCandidate {
            chunk: Chunk::new(id, "doc", 0, id).with_vector(vector),
            cosine_similarity: Some(cosine),
            lexical_rank: 0.0,
            hybrid_score: 0.7 * cosine,
        }
    };

    let pool = vec![
        candidate("near-a", 0.90, vec![1.0, 0.0, 0.0]),
        candidate("near-b", 0.89, vec![0.99, (1.0f32 - 0.9801).sqrt(), 0.0]),
        candidate("diverse", 0.80, vec![0.1, 0.0, (1.0f32 - 0.01).sqrt()]),
    ];

    let picked: Vec<String> = reranker
        .rerank(pool, 2, 0.75)
        .into_iter()
        .map(|c| c.chunk.id)
        .collect();
    assert_eq!(picked, vec!["near-a", "diverse"]);
}
