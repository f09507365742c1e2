//! Per-vehicle simulation state.

use fleet_core::{GeoPoint, VehicleId, VehicleStatus};
use fleet_route::RouteGeometry;

use crate::{Advance, MotionError, MotionResult, PositionSample};

/// The simulation state of one vehicle on one route assignment.
///
/// Lifecycle:
///
/// ```text
///   assign ──► Moving ──(progress reaches 1)──► Finished
///                │  ▲
///          pause │  │ resume
///                ▼  │
///                Idle
/// ```
///
/// `Finished` holds exactly when `progress == 1.0`.  The route is owned by
/// the state and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub id: VehicleId,

    route: RouteGeometry,

    /// Fraction of the route covered, `[0, 1]`.
    pub progress: f64,

    /// Constant travel speed in km/h (> 0).
    pub speed_kmh: f64,

    pub status: VehicleStatus,

    /// Simulated Unix milliseconds at which the route was assigned.
    pub assigned_at_ms: i64,

    /// Simulated Unix milliseconds of the last status change.
    pub updated_at_ms: i64,

    /// The most recent sample emitted for this vehicle.
    pub last_sample: Option<PositionSample>,
}

impl VehicleState {
    /// Start a vehicle at the beginning of `route`: `Moving`, progress 0.
    pub fn assign(
        id:        VehicleId,
        route:     RouteGeometry,
        speed_kmh: f64,
        now_ms:    i64,
    ) -> MotionResult<Self> {
        validate_speed(speed_kmh)?;
        Ok(Self {
            id,
            route,
            progress: 0.0,
            speed_kmh,
            status: VehicleStatus::Moving,
            assigned_at_ms: now_ms,
            updated_at_ms: now_ms,
            last_sample: None,
        })
    }

    #[inline]
    pub fn route(&self) -> &RouteGeometry {
        &self.route
    }

    /// Route start point.
    #[inline]
    pub fn origin(&self) -> GeoPoint {
        self.route.first()
    }

    /// Route end point.
    #[inline]
    pub fn destination(&self) -> GeoPoint {
        self.route.last()
    }

    /// `true` if the vehicle takes part in the next tick.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == VehicleStatus::Moving
    }

    /// The sample announcing a fresh assignment: first route point,
    /// heading of the first segment, progress 0.
    pub fn initial_sample(&self, timestamp_ms: i64) -> PositionSample {
        PositionSample {
            vehicle_id:   self.id,
            lat:          self.route.first().lat,
            lng:          self.route.first().lng,
            heading:      self.route.initial_heading(),
            progress:     0.0,
            timestamp_ms,
        }
    }

    /// Change the travel speed.  Takes effect from the next tick.
    pub fn set_speed(&mut self, speed_kmh: f64) -> MotionResult<()> {
        validate_speed(speed_kmh)?;
        self.speed_kmh = speed_kmh;
        Ok(())
    }

    /// `Moving → Idle`.  Returns `true` if the status changed.
    pub fn pause(&mut self, now_ms: i64) -> MotionResult<bool> {
        match self.status {
            VehicleStatus::Moving => {
                self.set_status(VehicleStatus::Idle, now_ms);
                Ok(true)
            }
            VehicleStatus::Idle => Ok(false),
            VehicleStatus::Finished => Err(self.transition_error(VehicleStatus::Idle)),
        }
    }

    /// `Idle → Moving`.  Returns `true` if the status changed.
    pub fn resume(&mut self, now_ms: i64) -> MotionResult<bool> {
        match self.status {
            VehicleStatus::Idle => {
                self.set_status(VehicleStatus::Moving, now_ms);
                Ok(true)
            }
            VehicleStatus::Moving => Ok(false),
            VehicleStatus::Finished => Err(self.transition_error(VehicleStatus::Moving)),
        }
    }

    /// Park the vehicle after a compute failure.  Progress is kept.
    pub fn mark_faulted(&mut self, now_ms: i64) {
        if !self.status.is_terminal() {
            self.set_status(VehicleStatus::Idle, now_ms);
        }
    }

    /// Commit one tick's result.  Returns the new status if it changed.
    pub fn apply(&mut self, advance: &Advance) -> Option<VehicleStatus> {
        let previous = self.status;
        self.progress = match advance.status {
            VehicleStatus::Finished => 1.0,
            _ => advance.progress.clamp(0.0, 1.0),
        };
        self.last_sample = Some(advance.sample);

        if advance.status == previous {
            return None;
        }
        self.set_status(advance.status, advance.sample.timestamp_ms);
        Some(advance.status)
    }

    fn set_status(&mut self, status: VehicleStatus, now_ms: i64) {
        self.status = status;
        self.updated_at_ms = now_ms;
    }

    fn transition_error(&self, to: VehicleStatus) -> MotionError {
        MotionError::InvalidTransition { vehicle: self.id, from: self.status, to }
    }
}

fn validate_speed(speed_kmh: f64) -> MotionResult<()> {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        Ok(())
    } else {
        Err(MotionError::InvalidSpeed(speed_kmh))
    }
}
