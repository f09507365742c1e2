//! Error types for fleet-sink.

use std::time::Duration;

use fleet_core::CoreError;
use fleet_route::RouteError;
use thiserror::Error;

/// Errors that can occur when delivering samples to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored route is invalid: {0}")]
    Route(#[from] RouteError),

    #[error("stored value is invalid: {0}")]
    Core(#[from] CoreError),

    #[error("stored value is invalid: {0}")]
    Corrupt(String),

    #[error("sink write timed out after {0:?}")]
    Timeout(Duration),

    #[error("sink temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("sink dispatcher is closed")]
    Closed,
}

impl SinkError {
    /// `true` for failures worth retrying: the same write may succeed once
    /// the store or channel recovers.
    pub fn is_transient(&self) -> bool {
        match self {
            SinkError::Timeout(_) | SinkError::Unavailable(_) => true,
            SinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            #[cfg(feature = "sqlite")]
            SinkError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

/// Alias for `Result<T, SinkError>`.
pub type SinkResult<T> = Result<T, SinkError>;
