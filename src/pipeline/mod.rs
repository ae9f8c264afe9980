//! Query orchestration: cache, embedding, hybrid retrieval, MMR, generation.
//!
//! [`Pipeline`] owns the state machine in [`PipelineStage`]. Fallbacks never surface
//! as errors; the caller always gets a [`QueryResponse`] unless the request itself is
//! invalid or the caller cancels it.

pub mod error;
pub mod orchestrator;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Pipeline;
pub use state::{PipelineStage, StageTiming, StageTracker};
pub use types::{
    CachedAnswer, NO_KNOWLEDGE_ANSWER, QueryOptions, QueryRequest, QueryResponse, QueryStatus,
    RankedResult, ResolvedQuery, ResponseMetadata, Source,
};
