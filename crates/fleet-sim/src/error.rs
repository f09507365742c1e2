use fleet_core::{CoreError, VehicleId};
use fleet_motion::MotionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("worker pool unavailable: {0}")]
    WorkerPool(String),

    #[error("elapsed time must be a non-negative number of seconds, got {0}")]
    InvalidElapsed(f64),

    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),

    #[error("vehicle {0} already has a route assigned")]
    DuplicateVehicle(VehicleId),

    #[error("fleet command channel closed")]
    Disconnected,

    #[error("motion error: {0}")]
    Motion(#[from] MotionError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
