use std::collections::HashSet;

use super::*;
use crate::retrieval::{Chunk, ScoredCandidate, sort_candidates};

fn candidate(id: &str, hybrid: f32, vector: Option<Vec<f32>>) -> ScoredCandidate {
    let mut chunk = Chunk::new(id, "doc", 0, format!("text {id}"));
    chunk.vector = vector;
    ScoredCandidate {
        chunk,
        cosine_similarity: Some(hybrid / 0.7),
        lexical_rank: 0.0,
        hybrid_score: hybrid,
    }
}

fn ids(candidates: &[ScoredCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.id()).collect()
}

/// Two near-duplicates (pairwise 0.99) and one diverse candidate (~0.1 to both).
fn near_duplicate_pool() -> Vec<ScoredCandidate> {
    let dup_b = vec![0.99, (1.0f32 - 0.99 * 0.99).sqrt(), 0.0];
    let diverse = vec![0.1, 0.0, (1.0f32 - 0.01).sqrt()];
    vec![
        candidate("dup-a", 0.7 * 0.90, Some(vec![1.0, 0.0, 0.0])),
        candidate("dup-b", 0.7 * 0.89, Some(dup_b)),
        candidate("diverse", 0.7 * 0.80, Some(diverse)),
    ]
}

#[test]
fn test_scenario_diverse_candidate_beats_near_duplicate() {
    let reranker = MmrReranker::default();
    let result = reranker.rerank(near_duplicate_pool(), 2, 0.75);
    assert_eq!(ids(&result), vec!["dup-a", "diverse"]);
}

#[test]
fn test_default_lambda_is_075() {
    let reranker = MmrReranker::default();
    assert_eq!(reranker.config().lambda, 0.75);
    let result = reranker.rerank_default(near_duplicate_pool(), 2);
    assert_eq!(ids(&result), vec!["dup-a", "diverse"]);
}

#[test]
fn test_lambda_one_is_exact_relevance_order() {
    let pool = vec![
        candidate("c", 0.30, Some(vec![1.0, 0.0])),
        candidate("a", 0.90, Some(vec![1.0, 0.0])),
        candidate("d", 0.30, None),
        candidate("b", 0.60, Some(vec![0.0, 1.0])),
    ];

    let mut expected = pool.clone();
    expected.sort_by(|x, y| y.hybrid_score.partial_cmp(&x.hybrid_score).unwrap());

    let result = MmrReranker::default().rerank(pool, 10, 1.0);
    assert_eq!(ids(&result), ids(&expected));
    assert_eq!(ids(&result), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_output_size_no_duplicates_drawn_from_input() {
    let pool = near_duplicate_pool();
    let input_ids: HashSet<String> = pool.iter().map(|c| c.id().to_string()).collect();

    for k in 0..5 {
        let result = MmrReranker::default().rerank(pool.clone(), k, 0.75);
        assert_eq!(result.len(), k.min(pool.len()));

        let unique: HashSet<&str> = result.iter().map(|c| c.id()).collect();
        assert_eq!(unique.len(), result.len());
        assert!(unique.iter().all(|id| input_ids.contains(*id)));
    }
}

#[test]
fn test_k_larger_than_pool_is_full_diversity_ordering() {
    let result = MmrReranker::default().rerank(near_duplicate_pool(), 10, 0.75);
    assert_eq!(ids(&result), vec!["dup-a", "diverse", "dup-b"]);
}

#[test]
fn test_missing_vectors_fall_back_to_relevance() {
    let pool = vec![
        candidate("a", 0.6, None),
        candidate("b", 0.5, None),
        candidate("c", 0.4, None),
    ];
    let result = MmrReranker::default().rerank(pool, 3, 0.5);
    assert_eq!(ids(&result), vec!["a", "b", "c"]);
}

#[test]
fn test_ties_prefer_higher_relevance_then_input_order() {
    // λ = 0.5 and cos(first, x) = 3/5: "x" scores 0.5*1.0 - 0.5*0.6 and "y" scores
    // 0.5*(1.0 - 0.6), which are bit-identical in f32.
    let pool = vec![
        candidate("first", 1.5, Some(vec![1.0, 0.0])),
        candidate("y", 1.0 - 0.6, None),
        candidate("x", 1.0, Some(vec![3.0, 4.0])),
    ];
    let result = MmrReranker::default().rerank(pool, 2, 0.5);
    assert_eq!(ids(&result), vec!["first", "x"]);

    let equal = vec![candidate("p", 0.5, None), candidate("q", 0.5, None)];
    let result = MmrReranker::default().rerank(equal, 2, 0.75);
    assert_eq!(ids(&result), vec!["p", "q"]);
}

#[test]
fn test_degenerate_inputs() {
    let reranker = MmrReranker::default();
    assert!(reranker.rerank(Vec::new(), 5, 0.75).is_empty());
    assert!(reranker.rerank(near_duplicate_pool(), 0, 0.75).is_empty());

    let single = vec![candidate("only", 0.1, None)];
    assert_eq!(ids(&reranker.rerank(single, 5, 0.75)), vec!["only"]);
}

#[test]
fn test_lambda_is_clamped() {
    let reranker = MmrReranker::default();
    let above = reranker.rerank(near_duplicate_pool(), 3, 7.0);
    assert_eq!(ids(&above), vec!["dup-a", "dup-b", "diverse"]);

    assert_eq!(MmrConfig::with_lambda(-1.0).lambda, 0.0);
    assert_eq!(MmrConfig::with_lambda(2.0).lambda, 1.0);
}

#[test]
fn test_lambda_one_matches_fusion_sort() {
    let mut pool = near_duplicate_pool();
    pool.reverse();
    let result = MmrReranker::default().rerank(pool.clone(), 3, 1.0);
    sort_candidates(&mut pool);
    assert_eq!(ids(&result), ids(&pool));
}

#[test]
fn test_pool_size() {
    assert_eq!(MmrConfig::default().pool_size(5), 10);
    let config = MmrConfig {
        fetch_multiplier: 0,
        ..Default::default()
    };
    assert_eq!(config.pool_size(5), 5);
}
