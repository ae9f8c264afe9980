//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::constants::DimValidationError;
use crate::retry::RetryConfigError;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Fusion weights must each lie in [0, 1] and sum to 1.
    #[error("invalid fusion weights: vector={vector}, lexical={lexical} (each in [0, 1], sum 1)")]
    InvalidWeights { vector: f32, lexical: f32 },

    /// A numeric setting lies outside its permitted range.
    #[error("{field} = {value} is out of range: expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A setting that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid retry configuration: {0}")]
    InvalidRetry(#[from] RetryConfigError),

    #[error(transparent)]
    Dimension(#[from] DimValidationError),

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },
}
