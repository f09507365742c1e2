//! `RecordingSink`: keeps everything in memory.
//!
//! Used by tests and dry runs.  Failures can be injected to exercise the
//! dispatcher's retry path.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;

use crate::{RouteRow, SampleSink, SinkError, SinkResult, VehicleRow};

/// Everything a [`RecordingSink`] has accepted, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub vehicles: Vec<VehicleRow>,
    pub routes:   Vec<RouteRow>,
    pub samples:  Vec<PositionSample>,
    pub statuses: Vec<(VehicleId, VehicleStatus, i64)>,
    pub removed:  Vec<VehicleId>,
    pub resets:   usize,
}

impl Recorded {
    pub fn samples_for(&self, vehicle: VehicleId) -> Vec<PositionSample> {
        self.samples.iter().filter(|s| s.vehicle_id == vehicle).copied().collect()
    }
}

/// An in-memory [`SampleSink`].
#[derive(Default)]
pub struct RecordingSink {
    inner:          Mutex<Recorded>,
    /// Number of upcoming writes to reject with a transient error.
    transient_left: AtomicU32,
    /// Reject every write with a permanent error.
    reject_all:     AtomicBool,
    latency_ms:     AtomicU64,
    attempts:       AtomicU64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` write attempts with [`SinkError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.transient_left.store(n, Ordering::SeqCst);
    }

    /// Fail every write with a non-retryable error while `on` is set.
    pub fn reject_writes(&self, on: bool) {
        self.reject_all.store(on, Ordering::SeqCst);
    }

    /// Sleep this long inside every write.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Write attempts seen, failed ones included.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// A copy of everything recorded so far.
    pub fn snapshot(&self) -> Recorded {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> SinkResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            thread::sleep(Duration::from_millis(latency));
        }
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(SinkError::Corrupt("writes rejected".into()));
        }
        let injected = self
            .transient_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(SinkError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl SampleSink for RecordingSink {
    fn register_vehicle(&self, vehicle: &VehicleRow, route: &RouteRow, _: Duration) -> SinkResult<()> {
        self.admit()?;
        let mut rec = self.lock();
        rec.vehicles.push(*vehicle);
        rec.routes.push(route.clone());
        Ok(())
    }

    fn write_sample(&self, sample: &PositionSample, _timeout: Duration) -> SinkResult<()> {
        self.admit()?;
        self.lock().samples.push(*sample);
        Ok(())
    }

    fn update_status(
        &self,
        vehicle: VehicleId,
        status:  VehicleStatus,
        at_ms:   i64,
        _:       Duration,
    ) -> SinkResult<()> {
        self.admit()?;
        self.lock().statuses.push((vehicle, status, at_ms));
        Ok(())
    }

    fn remove_vehicle(&self, vehicle: VehicleId, _timeout: Duration) -> SinkResult<()> {
        self.lock().removed.push(vehicle);
        Ok(())
    }

    fn reset(&self) -> SinkResult<()> {
        let mut rec = self.lock();
        let resets = rec.resets + 1;
        *rec = Recorded { resets, ..Recorded::default() };
        Ok(())
    }
}
