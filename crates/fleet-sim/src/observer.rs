//! Simulation observer trait for sample delivery and progress reporting.

use fleet_core::{Tick, VehicleId, VehicleStatus};
use fleet_motion::{MotionError, PositionSample, VehicleState};

/// Summary of one processed tick, passed to
/// [`FleetObserver::on_tick_end`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick:         Tick,
    /// Simulated Unix milliseconds stamped on this tick's samples.
    pub timestamp_ms: i64,
    /// Vehicles that produced a sample this tick.
    pub advanced:     usize,
    /// Vehicles that reached the end of their route this tick.
    pub finished:     usize,
    /// Vehicles whose computation failed this tick (now idle).
    pub failed:       usize,
    /// Vehicles still moving after the tick.
    pub moving:       usize,
}

/// Callbacks invoked by [`Fleet`][crate::Fleet] at key points in the tick
/// loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.  Callbacks run on the coordinating thread,
/// after the compute phase, in ascending vehicle-id order; samples for one
/// vehicle therefore arrive in timestamp order.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter;
///
/// impl FleetObserver for ProgressPrinter {
///     fn on_tick_end(&mut self, report: &TickReport) {
///         println!("tick {}: {} moving", report.tick, report.moving);
///     }
/// }
/// ```
pub trait FleetObserver {
    /// Called at the very start of each tick, after pending commands have
    /// been applied.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// A route was assigned.  `initial` is the progress-0 sample at the
    /// route's first point.
    fn on_assigned(&mut self, _vehicle: &VehicleState, _initial: PositionSample) {}

    /// One vehicle's sample for this tick.
    fn on_sample(&mut self, _sample: PositionSample) {}

    /// A vehicle changed status (finished, paused, resumed, or parked after
    /// a failure).
    fn on_status_change(&mut self, _vehicle: VehicleId, _status: VehicleStatus, _at_ms: i64) {}

    /// A vehicle's computation failed this tick.  It has been marked idle.
    fn on_compute_failure(&mut self, _vehicle: VehicleId, _error: &MotionError) {}

    /// A vehicle was removed.  No further samples follow for it.
    fn on_removed(&mut self, _vehicle: VehicleId) {}

    /// Every vehicle was cleared.
    fn on_reset(&mut self) {}

    /// Called at the end of each tick.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// Called once after the final tick of `run` completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`FleetObserver`] that does nothing.  Use when you need to call `run` but
/// don't want callbacks.
pub struct NoopObserver;

impl FleetObserver for NoopObserver {}
