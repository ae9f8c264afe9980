//! Retry with exponential backoff for remote calls.
//!
//! Every remote boundary of the pipeline (embedding, search RPC, generation, model listing)
//! runs through [`RetryExecutor`]. The executor never swallows a failure: after the last
//! attempt it returns a [`RetryError`] and the caller decides whether to fall back.

pub mod config;
pub mod error;
pub mod executor;


pub use config::{RemoteOperation, RetryConfig, RetryPolicy};
pub use error::{RetryConfigError, RetryError, Retryable};
pub use executor::RetryExecutor;
