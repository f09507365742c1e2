//! The `MotionModel` trait and its default constant-speed implementation.

use fleet_core::VehicleStatus;

use crate::{MotionError, MotionResult, PositionSample, VehicleState};

/// Default finish threshold.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// The outcome of advancing one vehicle by one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Advance {
    pub sample:   PositionSample,
    /// New progress fraction, `[0, 1]`.
    pub progress: f64,
    pub status:   VehicleStatus,
}

/// Pluggable movement computation.
///
/// The simulator calls `advance` for every active vehicle each tick, possibly
/// on many worker threads at once, so implementations must be `Send + Sync`
/// and must not rely on call order.  Anything that varies per vehicle lives
/// in the [`VehicleState`] passed in.
///
/// An `Err` is treated as an isolated fault of that one vehicle.
pub trait MotionModel: Send + Sync + 'static {
    fn advance(
        &self,
        state:        &VehicleState,
        elapsed_secs: f64,
        timestamp_ms: i64,
    ) -> MotionResult<Advance>;
}

/// Constant-speed movement along the vehicle's route geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionSampler {
    /// Progress within `epsilon` of 1.0 counts as arrival.
    pub epsilon: f64,
}

impl Default for PositionSampler {
    fn default() -> Self {
        Self { epsilon: DEFAULT_EPSILON }
    }
}

impl PositionSampler {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Metres covered at `speed_kmh` in `elapsed_secs`.
    #[inline]
    pub fn distance_m(speed_kmh: f64, elapsed_secs: f64) -> f64 {
        speed_kmh * elapsed_secs / 3600.0 * 1000.0
    }
}

impl MotionModel for PositionSampler {
    fn advance(
        &self,
        state:        &VehicleState,
        elapsed_secs: f64,
        timestamp_ms: i64,
    ) -> MotionResult<Advance> {
        if !(elapsed_secs.is_finite() && elapsed_secs >= 0.0) {
            return Err(MotionError::InvalidElapsed(elapsed_secs));
        }
        let route = state.route();

        let progress = match state.status {
            VehicleStatus::Moving => {
                let total = route.total_distance_m();
                if total > 0.0 {
                    let covered = Self::distance_m(state.speed_kmh, elapsed_secs);
                    (state.progress + covered / total).clamp(0.0, 1.0)
                } else {
                    1.0
                }
            }
            // Paused: elapsed time counts as zero.
            VehicleStatus::Idle => state.progress,
            VehicleStatus::Finished => 1.0,
        };

        if progress >= 1.0 - self.epsilon {
            let end = route.point_at(1.0)?;
            return Ok(Advance {
                sample:   PositionSample::at(state.id, end, 1.0, timestamp_ms),
                progress: 1.0,
                status:   match state.status {
                    VehicleStatus::Idle => VehicleStatus::Idle,
                    _ => VehicleStatus::Finished,
                },
            });
        }

        let here = route.point_at(progress)?;
        Ok(Advance {
            sample: PositionSample::at(state.id, here, progress, timestamp_ms),
            progress,
            status: state.status,
        })
    }
}
