use fleet_core::{VehicleId, VehicleStatus};
use fleet_route::RouteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("speed must be a positive number of km/h, got {0}")]
    InvalidSpeed(f64),

    #[error("elapsed time must be a non-negative number of seconds, got {0}")]
    InvalidElapsed(f64),

    #[error("vehicle {vehicle} cannot go from {from} to {to}")]
    InvalidTransition {
        vehicle: VehicleId,
        from:    VehicleStatus,
        to:      VehicleStatus,
    },

    #[error("route error: {0}")]
    Route(#[from] RouteError),
}

pub type MotionResult<T> = Result<T, MotionError>;
