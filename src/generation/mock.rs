use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::echo::EchoGenerator;
use super::error::GenerationError;
use super::provider::{GenerationProvider, GenerationRequest, GenerationResponse};

pub const MOCK_MODEL_NAME: &str = "mock-generator";

/// Failure modes a [`MockGenerator`] can be scripted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockGenerationFailure {
    /// Retryable provider failure.
    Unavailable,
    /// Non-retryable refusal.
    Rejected,
    /// Succeeds with blank text.
    EmptyAnswer,
    /// Never completes.
    Hang,
}

/// Echo generator with scripted failures and request recording.
pub struct MockGenerator {
    failure: RwLock<Option<MockGenerationFailure>>,
    /// Remaining calls that fail before the generator recovers. `None` fails forever.
    failures_left: RwLock<Option<usize>>,
    requests: RwLock<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            failure: RwLock::new(None),
            failures_left: RwLock::new(None),
            requests: RwLock::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_with(&self, failure: MockGenerationFailure) {
        *self.failure.write() = Some(failure);
        *self.failures_left.write() = None;
    }

    /// Fails the next `times` calls, then answers normally.
    pub fn fail_times(&self, failure: MockGenerationFailure, times: usize) {
        *self.failure.write() = Some(failure);
        *self.failures_left.write() = Some(times);
    }

    pub fn clear_failure(&self) {
        *self.failure.write() = None;
        *self.failures_left.write() = None;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.read().clone()
    }

    fn next_failure(&self) -> Option<MockGenerationFailure> {
        let failure = (*self.failure.read())?;
        let mut left = self.failures_left.write();
        match left.as_mut() {
            None => Some(failure),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(failure)
            }
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGenerator")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.write().push(request.clone());

        match self.next_failure() {
            Some(MockGenerationFailure::Unavailable) => {
                return Err(GenerationError::Provider {
                    model: MOCK_MODEL_NAME.to_string(),
                    message: "upstream returned 503".to_string(),
                });
            }
            Some(MockGenerationFailure::Rejected) => {
                return Err(GenerationError::Rejected {
                    model: MOCK_MODEL_NAME.to_string(),
                    message: "invalid api key".to_string(),
                });
            }
            Some(MockGenerationFailure::EmptyAnswer) => {
                return Err(GenerationError::EmptyAnswer {
                    model: MOCK_MODEL_NAME.to_string(),
                });
            }
            Some(MockGenerationFailure::Hang) => {
                std::future::pending::<()>().await;
            }
            None => {}
        }

        Ok(GenerationResponse {
            answer: EchoGenerator::answer_for(request),
            model: MOCK_MODEL_NAME.to_string(),
        })
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL_NAME
    }

    /// Fails while a persistent `Rejected` or `Unavailable` failure is scripted.
    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let failure = *self.failure.read();
        let persistent = self.failures_left.read().is_none();
        match failure {
            Some(MockGenerationFailure::Rejected) if persistent => Err(GenerationError::Rejected {
                model: MOCK_MODEL_NAME.to_string(),
                message: "invalid api key".to_string(),
            }),
            Some(MockGenerationFailure::Unavailable) if persistent => {
                Err(GenerationError::Provider {
                    model: MOCK_MODEL_NAME.to_string(),
                    message: "upstream returned 503".to_string(),
                })
            }
            _ => Ok(vec![MOCK_MODEL_NAME.to_string()]),
        }
    }
}
