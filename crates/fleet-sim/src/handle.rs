//! Cross-thread control of a running [`Fleet`][crate::Fleet].
//!
//! The fleet's vehicle map is owned by the coordinating thread.  Other
//! threads never touch it; they send [`Command`]s through a [`FleetHandle`]
//! and the fleet applies them at the start of its next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use fleet_core::VehicleId;
use fleet_route::RouteGeometry;

use crate::{SimError, SimResult};

/// A request applied by the coordinating thread at the next tick boundary.
#[derive(Debug)]
pub enum Command {
    Assign {
        vehicle:   VehicleId,
        route:     RouteGeometry,
        speed_kmh: f64,
    },
    Pause(VehicleId),
    Resume(VehicleId),
    SetSpeed(VehicleId, f64),
    Remove(VehicleId),
    Reset,
}

/// Cloneable sender side of a fleet's command channel.
#[derive(Clone, Debug)]
pub struct FleetHandle {
    tx:      Sender<Command>,
    stopped: Arc<AtomicBool>,
}

impl FleetHandle {
    pub(crate) fn new(tx: Sender<Command>, stopped: Arc<AtomicBool>) -> Self {
        Self { tx, stopped }
    }

    /// Queue a route assignment for a fresh vehicle id and return that id.
    ///
    /// The speed is checked here so obviously bad requests fail at the
    /// caller; a duplicate id is only detectable when the command is applied
    /// and is logged then.
    pub fn assign(&self, route: RouteGeometry, speed_kmh: f64) -> SimResult<VehicleId> {
        let vehicle = VehicleId::new_v4();
        self.assign_with_id(vehicle, route, speed_kmh)?;
        Ok(vehicle)
    }

    pub fn assign_with_id(
        &self,
        vehicle:   VehicleId,
        route:     RouteGeometry,
        speed_kmh: f64,
    ) -> SimResult<()> {
        if !(speed_kmh.is_finite() && speed_kmh > 0.0) {
            return Err(fleet_motion::MotionError::InvalidSpeed(speed_kmh).into());
        }
        self.send(Command::Assign { vehicle, route, speed_kmh })
    }

    pub fn pause(&self, vehicle: VehicleId) -> SimResult<()> {
        self.send(Command::Pause(vehicle))
    }

    pub fn resume(&self, vehicle: VehicleId) -> SimResult<()> {
        self.send(Command::Resume(vehicle))
    }

    pub fn set_speed(&self, vehicle: VehicleId, speed_kmh: f64) -> SimResult<()> {
        self.send(Command::SetSpeed(vehicle, speed_kmh))
    }

    pub fn remove(&self, vehicle: VehicleId) -> SimResult<()> {
        self.send(Command::Remove(vehicle))
    }

    /// Clear every vehicle and ask the sink to delete stored data.
    pub fn reset(&self) -> SimResult<()> {
        self.send(Command::Reset)
    }

    /// Ask `run` / `run_realtime` to return after the current tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn send(&self, command: Command) -> SimResult<()> {
        self.tx.send(command).map_err(|_| SimError::Disconnected)
    }
}
