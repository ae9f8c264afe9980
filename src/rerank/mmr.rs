//! Maximal Marginal Relevance.
//!
//! `mmr(c) = λ × relevance(c) - (1 - λ) × max_{s ∈ S} similarity(c, s)`
//!
//! - relevance: the candidate's hybrid score
//! - similarity: cosine of the two chunk vectors, `0.0` if either is missing
//!
//! λ = 1.0 is pure relevance ranking, λ = 0.0 pure diversity.

use crate::constants::{DEFAULT_MMR_FETCH_MULTIPLIER, DEFAULT_MMR_LAMBDA};
use crate::embedding::cosine_similarity;
use crate::retrieval::ScoredCandidate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrConfig {
    /// 0.0 = pure diversity, 1.0 = pure relevance.
    pub lambda: f32,
    /// The retriever is asked for `k * fetch_multiplier` candidates.
    pub fetch_multiplier: usize,
}

impl Default for MmrConfig {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_MMR_LAMBDA,
            fetch_multiplier: DEFAULT_MMR_FETCH_MULTIPLIER,
        }
    }
}

impl MmrConfig {
    /// Custom lambda (clamped to 0.0-1.0).
    pub fn with_lambda(lambda: f32) -> Self {
        Self {
            lambda: clamp_lambda(lambda),
            ..Default::default()
        }
    }

    /// Candidate pool size for a final result of `k`.
    #[inline]
    pub fn pool_size(&self, k: usize) -> usize {
        k.saturating_mul(self.fetch_multiplier.max(1))
    }
}

#[inline]
fn clamp_lambda(lambda: f32) -> f32 {
    if lambda.is_nan() {
        DEFAULT_MMR_LAMBDA
    } else {
        lambda.clamp(0.0, 1.0)
    }
}

/// Stateless greedy MMR selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmrReranker {
    config: MmrConfig,
}

impl MmrReranker {
    pub fn new(config: MmrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MmrConfig {
        &self.config
    }

    /// Reranks with the configured λ.
    pub fn rerank_default(
        &self,
        candidates: Vec<ScoredCandidate>,
        k: usize,
    ) -> Vec<ScoredCandidate> {
        self.rerank(candidates, k, self.config.lambda)
    }

    /// Selects `min(k, candidates.len())` candidates greedily.
    ///
    /// Ties on the marginal score go to the higher relevance, then to the earlier input
    /// position. With λ = 1 the diversity term is skipped entirely, so the result is
    /// exactly the relevance order.
    pub fn rerank(
        &self,
        candidates: Vec<ScoredCandidate>,
        k: usize,
        lambda: f32,
    ) -> Vec<ScoredCandidate> {
        if candidates.is_empty() || k == 0 {
            return Vec::new();
        }

        let lambda = clamp_lambda(lambda);
        let k = k.min(candidates.len());
        let pure_relevance = lambda >= 1.0;

        // Slots are taken out as they are selected; `remaining` holds input indices in order.
        let mut slots: Vec<Option<ScoredCandidate>> = candidates.into_iter().map(Some).collect();
        let mut remaining: Vec<usize> = (0..slots.len()).collect();
        // max_{s in S} similarity(c, s) per input index; `None` while S is empty.
        let mut max_similarity: Vec<Option<f32>> = vec![None; slots.len()];
        let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(k);

        while selected.len() < k && !remaining.is_empty() {
            let mut best: Option<(usize, f32, f32)> = None;

            for (pos, &idx) in remaining.iter().enumerate() {
                let Some(candidate) = slots[idx].as_ref() else {
                    continue;
                };
                let relevance = candidate.hybrid_score;
                let score = if pure_relevance {
                    relevance
                } else {
                    lambda * relevance - (1.0 - lambda) * max_similarity[idx].unwrap_or(0.0)
                };

                let better = match best {
                    None => true,
                    Some((_, best_score, best_relevance)) => {
                        score > best_score || (score == best_score && relevance > best_relevance)
                    }
                };
                if better {
                    best = Some((pos, score, relevance));
                }
            }

            let Some((best_pos, _, _)) = best else {
                break;
            };
            let idx = remaining.remove(best_pos);
            let Some(chosen) = slots[idx].take() else {
                break;
            };

            if !pure_relevance {
                for &other in &remaining {
                    let other_vector = slots[other].as_ref().and_then(|c| c.vector());
                    let sim = match (chosen.vector(), other_vector) {
                        (Some(a), Some(b)) => cosine_similarity(a, b),
                        _ => 0.0,
                    };
                    max_similarity[other] = Some(max_similarity[other].map_or(sim, |m| m.max(sim)));
                }
            }

            selected.push(chosen);
        }

        selected
    }
}
