use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("failed to write query log: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
}
