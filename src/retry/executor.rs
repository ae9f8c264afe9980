use std::future::Future;

use tracing::{debug, instrument, warn};

use super::config::{RemoteOperation, RetryConfig, RetryPolicy};
use super::error::{RetryError, Retryable};

/// Runs remote calls under a [`RetryPolicy`].
///
/// Holds only configuration, so one instance can be shared by every in-flight query.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn policy(&self, operation: RemoteOperation) -> RetryPolicy {
        self.config.policy(operation)
    }

    /// Runs `call` with the policy configured for `operation`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: RemoteOperation,
        call: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error + 'static,
    {
        let policy = self.policy(operation);
        self.execute_with_policy(operation.as_str(), &policy, call).await
    }

    /// Runs `call` until it succeeds, fails non-retryably, or the attempt budget runs out.
    ///
    /// `call` is invoked once per attempt so each attempt gets a fresh future. A timed-out
    /// attempt is dropped, counts toward `max_attempts`, and is retried with backoff.
    #[instrument(
        skip(self, policy, call),
        fields(
            max_attempts = policy.max_attempts,
            timeout_ms = policy.timeout.as_millis() as u64
        )
    )]
    pub async fn execute_with_policy<T, E, F, Fut>(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        mut call: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error + 'static,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(policy.timeout, call()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(attempt, "Remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(err)) if !err.is_retryable() => {
                    warn!(attempt, error = %err, "Non-retryable failure, aborting");
                    return Err(RetryError::Aborted {
                        operation,
                        attempt,
                        source: err,
                    });
                }
                Ok(Err(err)) => {
                    if attempt >= max_attempts {
                        warn!(attempts = attempt, error = %err, "Retries exhausted");
                        return Err(RetryError::Exhausted {
                            operation,
                            attempts: attempt,
                            last: err,
                        });
                    }
                    warn!(attempt, error = %err, "Remote call failed, will retry");
                }
                Err(_elapsed) => {
                    if attempt >= max_attempts {
                        warn!(attempts = attempt, "Remote call timed out, retries exhausted");
                        return Err(RetryError::Timeout {
                            operation,
                            attempts: attempt,
                            timeout: policy.timeout,
                        });
                    }
                    warn!(attempt, "Remote call timed out, will retry");
                }
            }
        }
    }
}
