//! Diversity-aware reranking of retrieved candidates.

pub mod mmr;

#[cfg(test)]
mod tests;

pub use mmr::{MmrConfig, MmrReranker};
