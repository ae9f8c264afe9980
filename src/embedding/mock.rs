use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use super::stub::HashEmbedder;
use crate::hashing::normalize_question;

/// Failure modes a [`MockEmbedder`] can be scripted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEmbeddingFailure {
    /// Retryable connection failure.
    Unavailable,
    /// Non-retryable 400.
    BadRequest,
    /// Returns an all-zero vector.
    ZeroVector,
    /// Returns a vector one element short.
    WrongDimension,
    /// Never completes; exercises the per-attempt timeout.
    Hang,
}

/// Hash embedder with per-text overrides, scripted failures and a call counter.
pub struct MockEmbedder {
    inner: HashEmbedder,
    overrides: RwLock<HashMap<String, Vec<f32>>>,
    failure: RwLock<Option<MockEmbeddingFailure>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            overrides: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns `vector` for any text that normalizes to the same question.
    pub fn set_vector(&self, text: &str, vector: Vec<f32>) {
        self.overrides
            .write()
            .insert(normalize_question(text), vector);
    }

    pub fn fail_with(&self, failure: MockEmbeddingFailure) {
        *self.failure.write() = Some(failure);
    }

    pub fn clear_failure(&self) {
        *self.failure.write() = None;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEmbedder")
            .field("dimension", &self.inner.dimension())
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failure = *self.failure.read();
        match failure {
            Some(MockEmbeddingFailure::Unavailable) => {
                return Err(EmbeddingError::Unavailable {
                    endpoint: "mock://embeddings".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Some(MockEmbeddingFailure::BadRequest) => {
                return Err(EmbeddingError::Http {
                    status: 400,
                    body: "bad request".to_string(),
                });
            }
            Some(MockEmbeddingFailure::ZeroVector) => {
                return Ok(vec![0.0; self.inner.dimension()]);
            }
            Some(MockEmbeddingFailure::WrongDimension) => {
                return Ok(vec![1.0; self.inner.dimension().saturating_sub(1)]);
            }
            Some(MockEmbeddingFailure::Hang) => {
                std::future::pending::<()>().await;
            }
            None => {}
        }

        if let Some(vector) = self.overrides.read().get(&normalize_question(text)) {
            return Ok(vector.clone());
        }

        self.inner.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}
