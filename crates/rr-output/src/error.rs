//! Error types for rr-output.

use thiserror::Error;

/// Errors raised while rendering or persisting a map artifact.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid artifact name {0:?}")]
    InvalidStem(String),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
