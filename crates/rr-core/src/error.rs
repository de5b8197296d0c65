//! Workspace base error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` where they
//! surface configuration or input problems.

use thiserror::Error;

/// The error type for `rr-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A location name was empty (or whitespace only) after normalization.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `rr-core`.
pub type CoreResult<T> = Result<T, CoreError>;
