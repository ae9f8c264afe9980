use crate::constants::{
    DEFAULT_LEXICAL_WEIGHT, DEFAULT_MIN_SIMILARITY_FLOOR, DEFAULT_OVERSAMPLE_FACTOR,
    DEFAULT_OVERSAMPLE_MIN, DEFAULT_RELAXATION_FACTOR, DEFAULT_VECTOR_WEIGHT,
};

use super::types::FusionWeights;

/// Hybrid scoring and fallback tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    pub vector_weight: f32,
    pub lexical_weight: f32,
    pub oversample_factor: usize,
    pub oversample_min: usize,
    /// Lowest threshold the relaxation retry may use.
    pub min_similarity_floor: f32,
    /// Multiplier applied to the threshold on the relaxation retry.
    pub relaxation_factor: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            oversample_factor: DEFAULT_OVERSAMPLE_FACTOR,
            oversample_min: DEFAULT_OVERSAMPLE_MIN,
            min_similarity_floor: DEFAULT_MIN_SIMILARITY_FLOOR,
            relaxation_factor: DEFAULT_RELAXATION_FACTOR,
        }
    }
}

impl FusionConfig {
    #[inline]
    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            vector: self.vector_weight,
            lexical: self.lexical_weight,
        }
    }

    /// `max(factor * k, min)`.
    #[inline]
    pub fn oversample(&self, k: usize) -> usize {
        self.oversample_factor
            .saturating_mul(k)
            .max(self.oversample_min)
    }

    /// Threshold for the relaxation retry: `max(min * factor, floor)`, never above `min`.
    #[inline]
    pub fn relax(&self, min_similarity: f32) -> f32 {
        (min_similarity * self.relaxation_factor)
            .max(self.min_similarity_floor)
            .min(min_similarity)
    }
}
