use std::time::Duration;

use thiserror::Error;

use super::config::RemoteOperation;

/// Classifies a remote error for the retry executor.
///
/// Malformed-request class errors return `false` and abort the retry loop immediately.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Error)]
/// Final outcome of a retried call that did not succeed.
pub enum RetryError<E: std::error::Error + 'static> {
    /// The last attempt hit the per-attempt timeout.
    #[error("{operation} timed out after {attempts} attempt(s) ({timeout:?} per attempt)")]
    Timeout {
        operation: &'static str,
        attempts: u32,
        timeout: Duration,
    },

    /// Every attempt failed with a retryable error.
    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: E,
    },

    /// A non-retryable error stopped the loop early.
    #[error("{operation} aborted on attempt {attempt}: {source}")]
    Aborted {
        operation: &'static str,
        attempt: u32,
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Number of attempts that were actually made.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Timeout { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
            RetryError::Aborted { attempt, .. } => *attempt,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }

    /// The underlying provider error, if the last attempt produced one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Timeout { .. } => None,
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Aborted { source, .. } => Some(source),
        }
    }
}

/// Inconsistent [`RetryConfig`](super::RetryConfig) settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryConfigError {
    #[error("max_attempts must be greater than zero")]
    ZeroAttempts,

    #[error("base_delay ({base:?}) cannot exceed max_delay ({max:?})")]
    DelayOrder { base: Duration, max: Duration },

    #[error("{operation}_timeout must be greater than zero")]
    ZeroTimeout { operation: RemoteOperation },
}
