//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` where a
//! configuration or parse failure can bubble up through them.

use thiserror::Error;

/// The error type for `fleet-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown vehicle status {0:?}")]
    UnknownStatus(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `fleet-core`.
pub type CoreResult<T> = Result<T, CoreError>;
