use std::sync::Arc;

use crate::pipeline::Pipeline;
use crate::retrieval::SearchBackend;

/// Shared state for every handler.
pub struct HandlerState<B> {
    pub pipeline: Arc<Pipeline<B>>,
}

impl<B> Clone for HandlerState<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<B: SearchBackend> HandlerState<B> {
    pub fn new(pipeline: Pipeline<B>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn from_shared(pipeline: Arc<Pipeline<B>>) -> Self {
        Self { pipeline }
    }
}

impl<B> std::fmt::Debug for HandlerState<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerState")
            .field("pipeline_refs", &Arc::strong_count(&self.pipeline))
            .finish()
    }
}
