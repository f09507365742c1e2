//! `Tee`: one write, two sinks.

use std::time::Duration;

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;

use crate::{RouteRow, SampleSink, SinkResult, VehicleRow};

/// Writes to `first`, then to `second`.
///
/// The usual pairing is a persistent store followed by a
/// [`Broadcaster`][crate::Broadcaster]: a sample is published only after it
/// has been stored.  If `first` fails, `second` is not attempted and the
/// error is returned for the dispatcher to retry; a retry repeats both
/// writes, so `second` sees each item at least once.
pub struct Tee<A, B> {
    pub first:  A,
    pub second: B,
}

impl<A: SampleSink, B: SampleSink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: SampleSink, B: SampleSink> SampleSink for Tee<A, B> {
    fn register_vehicle(&self, vehicle: &VehicleRow, route: &RouteRow, timeout: Duration) -> SinkResult<()> {
        self.first.register_vehicle(vehicle, route, timeout)?;
        self.second.register_vehicle(vehicle, route, timeout)
    }

    fn write_sample(&self, sample: &PositionSample, timeout: Duration) -> SinkResult<()> {
        self.first.write_sample(sample, timeout)?;
        self.second.write_sample(sample, timeout)
    }

    fn update_status(&self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64, timeout: Duration) -> SinkResult<()> {
        self.first.update_status(vehicle, status, at_ms, timeout)?;
        self.second.update_status(vehicle, status, at_ms, timeout)
    }

    fn remove_vehicle(&self, vehicle: VehicleId, timeout: Duration) -> SinkResult<()> {
        self.first.remove_vehicle(vehicle, timeout)?;
        self.second.remove_vehicle(vehicle, timeout)
    }

    fn reset(&self) -> SinkResult<()> {
        self.first.reset()?;
        self.second.reset()
    }

    fn flush(&self) -> SinkResult<()> {
        self.first.flush()?;
        self.second.flush()
    }
}
