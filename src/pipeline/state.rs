//! Orchestrator stages and per-stage timing.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

/// One state of the query state machine.
///
/// ```text
/// CacheLookup -> Embedding -> Retrieval -> Reranking -> Generation -> CacheWrite -> Done
///      |             |            |                          |
///      +-> Done      +------------+-> ErrorFallback <--------+
///                                       |-> Generation
///                                       +-> Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    CacheLookup,
    Embedding,
    Retrieval,
    Reranking,
    Generation,
    CacheWrite,
    ErrorFallback,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::CacheLookup => "cache_lookup",
            PipelineStage::Embedding => "embedding",
            PipelineStage::Retrieval => "retrieval",
            PipelineStage::Reranking => "reranking",
            PipelineStage::Generation => "generation",
            PipelineStage::CacheWrite => "cache_write",
            PipelineStage::ErrorFallback => "error_fallback",
            PipelineStage::Done => "done",
        }
    }

    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (CacheLookup, Embedding | Done)
                | (Embedding, Retrieval | ErrorFallback)
                | (Retrieval, Reranking | ErrorFallback)
                | (Reranking, Generation)
                | (Generation, CacheWrite | ErrorFallback)
                | (ErrorFallback, Generation | Done)
                | (CacheWrite, Done)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Done
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall time spent in one completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: u64,
}

/// Walks the state machine for one query and times every stage.
#[derive(Debug)]
pub struct StageTracker {
    current: PipelineStage,
    query_started: Instant,
    stage_started: Instant,
    timings: Vec<StageTiming>,
}

impl StageTracker {
    /// Starts in [`PipelineStage::CacheLookup`].
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            current: PipelineStage::CacheLookup,
            query_started: now,
            stage_started: now,
            timings: Vec::with_capacity(7),
        }
    }

    #[inline]
    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// Closes the current stage and enters `next`.
    ///
    /// A transition the state machine does not allow is logged and still taken.
    pub fn advance(&mut self, next: PipelineStage) {
        if !self.current.can_transition_to(next) {
            warn!(from = %self.current, to = %next, "Unexpected pipeline transition");
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.stage_started).as_millis() as u64;
        self.timings.push(StageTiming {
            stage: self.current,
            elapsed_ms,
        });
        debug!(stage = %self.current, next = %next, elapsed_ms, "Pipeline stage finished");

        self.current = next;
        self.stage_started = now;
    }

    /// Milliseconds since [`StageTracker::start`].
    #[inline]
    pub fn total_ms(&self) -> u64 {
        self.query_started.elapsed().as_millis() as u64
    }

    /// Sum of recorded timings for `stage`.
    pub fn elapsed_in(&self, stage: PipelineStage) -> u64 {
        self.timings
            .iter()
            .filter(|t| t.stage == stage)
            .map(|t| t.elapsed_ms)
            .sum()
    }

    /// Stages visited so far, in order.
    pub fn path(&self) -> Vec<PipelineStage> {
        self.timings.iter().map(|t| t.stage).collect()
    }

    /// Enters [`PipelineStage::Done`] (if not already there) and returns the timings.
    pub fn finish(mut self) -> Vec<StageTiming> {
        if !self.current.is_terminal() {
            self.advance(PipelineStage::Done);
        }
        self.timings
    }
}
