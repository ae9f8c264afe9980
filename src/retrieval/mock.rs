use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::backend::SearchBackend;
use super::error::RetrievalError;
use super::memory::InMemorySearchBackend;
use super::types::{Chunk, HybridQuery, ScoredCandidate, SearchHit};

/// Scripted behaviour for one kind of backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehavior {
    /// Delegate to the in-memory corpus.
    #[default]
    Normal,
    /// Succeed with zero results.
    Empty,
    /// Fail with a retryable error.
    Unavailable,
    /// Fail with a non-retryable error.
    Rejected,
    /// Never complete.
    Hang,
}

/// In-memory backend with scripted failures and call counters.
#[derive(Default)]
pub struct MockSearchBackend {
    inner: InMemorySearchBackend,
    hybrid: Mutex<MockBehavior>,
    lexical: Mutex<MockBehavior>,
    hybrid_calls: AtomicUsize,
    lexical_calls: AtomicUsize,
    queries: Mutex<Vec<HybridQuery>>,
    not_ready: AtomicBool,
}

impl MockSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let backend = Self::new();
        backend.inner.extend(chunks);
        backend
    }

    pub fn corpus(&self) -> &InMemorySearchBackend {
        &self.inner
    }

    pub fn set_hybrid(&self, behavior: MockBehavior) {
        *self.hybrid.lock() = behavior;
    }

    pub fn set_lexical(&self, behavior: MockBehavior) {
        *self.lexical.lock() = behavior;
    }

    pub fn set_ready(&self, ready: bool) {
        self.not_ready.store(!ready, Ordering::SeqCst);
    }

    pub fn hybrid_calls(&self) -> usize {
        self.hybrid_calls.load(Ordering::SeqCst)
    }

    pub fn lexical_calls(&self) -> usize {
        self.lexical_calls.load(Ordering::SeqCst)
    }

    /// Every fused query received, in order.
    pub fn hybrid_queries(&self) -> Vec<HybridQuery> {
        self.queries.lock().clone()
    }

    async fn scripted<T>(behavior: MockBehavior) -> Option<Result<T, RetrievalError>>
    where
        T: Default,
    {
        match behavior {
            MockBehavior::Normal => None,
            MockBehavior::Empty => Some(Ok(T::default())),
            MockBehavior::Unavailable => Some(Err(RetrievalError::Unavailable {
                backend: "mock".to_string(),
                message: "connection refused".to_string(),
            })),
            MockBehavior::Rejected => Some(Err(RetrievalError::InvalidQuery {
                reason: "rejected by mock".to_string(),
            })),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for MockSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearchBackend")
            .field("chunks", &self.inner.len())
            .field("hybrid", &*self.hybrid.lock())
            .field("lexical", &*self.lexical.lock())
            .finish()
    }
}

impl SearchBackend for MockSearchBackend {
    async fn hybrid_search(
        &self,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        self.hybrid_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());

        let behavior = *self.hybrid.lock();
        if let Some(result) = Self::scripted(behavior).await {
            return result;
        }
        self.inner.hybrid_search(query).await
    }

    async fn lexical_search(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        self.lexical_calls.fetch_add(1, Ordering::SeqCst);

        let behavior = *self.lexical.lock();
        if let Some(result) = Self::scripted(behavior).await {
            return result;
        }
        self.inner.lexical_search(text, k).await
    }

    async fn is_ready(&self) -> bool {
        !self.not_ready.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
