//! Fuses vector and lexical hits into the final hybrid ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{FusionWeights, HybridQuery, ScoredCandidate, SearchHit};

/// Union by chunk id, filter by `min_similarity`, score, sort, truncate to `k`.
///
/// When a chunk appears more than once the strongest value of each signal is kept. An
/// unset cosine counts as `0.0` both for the threshold and for the formula, so lexical-only
/// hits survive only when `min_similarity <= 0`.
pub fn fuse(hits: Vec<SearchHit>, query: &HybridQuery) -> Vec<ScoredCandidate> {
    let mut merged: HashMap<String, SearchHit> = HashMap::with_capacity(hits.len());

    for hit in hits {
        match merged.get_mut(&hit.chunk.id) {
            Some(existing) => {
                existing.cosine_similarity =
                    match (existing.cosine_similarity, hit.cosine_similarity) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        (a, b) => a.or(b),
                    };
                existing.lexical_rank = existing.lexical_rank.max(hit.lexical_rank);
                if existing.chunk.vector.is_none() {
                    existing.chunk.vector = hit.chunk.vector;
                }
            }
            None => {
                merged.insert(hit.chunk.id.clone(), hit);
            }
        }
    }

    let mut candidates: Vec<ScoredCandidate> = merged
        .into_values()
        .filter(|hit| hit.cosine_similarity.unwrap_or(0.0) >= query.min_similarity)
        .map(|hit| ScoredCandidate::new(hit, query.weights))
        .collect();

    sort_candidates(&mut candidates);
    candidates.truncate(query.k);
    candidates
}

/// Scores lexical-only hits (no cosine) and keeps the top `k` with a non-zero rank.
pub fn rank_lexical(
    hits: Vec<SearchHit>,
    weights: FusionWeights,
    k: usize,
) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = hits
        .into_iter()
        .filter(|hit| hit.lexical_rank > 0.0)
        .map(|hit| {
            ScoredCandidate::new(
                SearchHit {
                    cosine_similarity: None,
                    ..hit
                },
                weights,
            )
        })
        .collect();

    sort_candidates(&mut candidates);
    candidates.dedup_by(|a, b| a.chunk.id == b.chunk.id);
    candidates.truncate(k);
    candidates
}

/// Hybrid score desc, then cosine desc, then chunk id asc.
pub fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.cosine_similarity
                    .unwrap_or(0.0)
                    .partial_cmp(&a.cosine_similarity.unwrap_or(0.0))
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}
