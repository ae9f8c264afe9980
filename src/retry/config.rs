use std::time::Duration;

use super::error::RetryConfigError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MODEL_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote boundaries that carry their own timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    Embedding,
    Retrieval,
    Generation,
    ModelList,
}

impl RemoteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOperation::Embedding => "embedding",
            RemoteOperation::Retrieval => "retrieval",
            RemoteOperation::Generation => "generation",
            RemoteOperation::ModelList => "model_list",
        }
    }
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backoff settings shared by all remote calls plus one timeout per operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub embedding_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub generation_timeout: Duration,
    pub model_list_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            embedding_timeout: DEFAULT_EMBEDDING_TIMEOUT,
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            model_list_timeout: DEFAULT_MODEL_LIST_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Builds the policy for one kind of remote call.
    pub fn policy(&self, operation: RemoteOperation) -> RetryPolicy {
        let timeout = match operation {
            RemoteOperation::Embedding => self.embedding_timeout,
            RemoteOperation::Retrieval => self.retrieval_timeout,
            RemoteOperation::Generation => self.generation_timeout,
            RemoteOperation::ModelList => self.model_list_timeout,
        };

        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            timeout,
        }
    }

    #[inline]
    pub fn embedding(&self) -> RetryPolicy {
        self.policy(RemoteOperation::Embedding)
    }

    #[inline]
    pub fn retrieval(&self) -> RetryPolicy {
        self.policy(RemoteOperation::Retrieval)
    }

    #[inline]
    pub fn generation(&self) -> RetryPolicy {
        self.policy(RemoteOperation::Generation)
    }

    #[inline]
    pub fn model_list(&self) -> RetryPolicy {
        self.policy(RemoteOperation::ModelList)
    }

    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::ZeroAttempts);
        }
        if self.base_delay > self.max_delay {
            return Err(RetryConfigError::DelayOrder {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        for operation in [
            RemoteOperation::Embedding,
            RemoteOperation::Retrieval,
            RemoteOperation::Generation,
            RemoteOperation::ModelList,
        ] {
            if self.policy(operation).timeout.is_zero() {
                return Err(RetryConfigError::ZeroTimeout { operation });
            }
        }
        Ok(())
    }
}

/// Attempt budget, backoff curve and per-attempt timeout for a single call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().policy(RemoteOperation::Retrieval)
    }
}

impl RetryPolicy {
    /// Delay slept before `attempt` (1-based): zero for the first attempt, then
    /// `base_delay * 2^(attempt - 2)` capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Sum of every backoff delay a call that always fails will sleep through.
    pub fn total_backoff(&self) -> Duration {
        (2..=self.max_attempts.max(1))
            .map(|attempt| self.delay_before(attempt))
            .sum()
    }
}
