//! Route error type.

use thiserror::Error;

/// Errors produced by `fleet-route`.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The geometry cannot be used as a route (too few points, non-finite
    /// coordinates, malformed positions).
    #[error("invalid route geometry: {0}")]
    InvalidGeometry(String),

    /// A fraction outside `[0, 1]` reached `point_at`.  Callers clamp before
    /// calling, so this indicates a bug upstream.
    #[error("route fraction {0} is outside [0, 1]")]
    OutOfRange(f64),

    #[error("unsupported geometry type {0:?} (expected LineString)")]
    UnsupportedGeometry(String),

    #[error("route JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RouteResult<T> = Result<T, RouteError>;
