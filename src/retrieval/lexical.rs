//! Term-frequency lexical ranking.
//!
//! `rank = mean over distinct query terms of tf / (tf + K1)`, so the score lies in
//! `[0, 1)` and is `0.0` exactly when no query term occurs in the document.

use std::collections::{HashMap, HashSet};

/// Saturation constant for term frequency.
pub const TF_SATURATION: f32 = 1.2;

/// Lowercased runs of Unicode alphanumerics; single-character tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Distinct query terms in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexicalQuery {
    terms: Vec<String>,
}

impl LexicalQuery {
    pub fn parse(text: &str) -> Self {
        let mut seen = HashSet::new();
        let terms = tokenize(text)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn score(&self, document: &str) -> f32 {
        if self.terms.is_empty() {
            return 0.0;
        }

        let mut tf: HashMap<String, u32> = HashMap::new();
        for token in tokenize(document) {
            *tf.entry(token).or_insert(0) += 1;
        }

        let total: f32 = self
            .terms
            .iter()
            .map(|term| {
                let count = tf.get(term).copied().unwrap_or(0) as f32;
                count / (count + TF_SATURATION)
            })
            .sum();

        total / self.terms.len() as f32
    }
}
