//! The `SampleSink` trait implemented by every delivery backend.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;

use crate::{RouteRow, SinkResult, VehicleRow};

/// Destination for simulator output: a persistent store, a live broadcast
/// channel, or a combination of both.
///
/// Methods take `&self` because the [`Dispatcher`][crate::Dispatcher] calls
/// them from several shard threads at once.  Calls for one vehicle are never
/// concurrent and always arrive in the order the simulator produced them.
///
/// `timeout` bounds a single attempt; the dispatcher retries transient
/// failures (see [`SinkError::is_transient`][crate::SinkError::is_transient]).
pub trait SampleSink: Send + Sync {
    /// A route was assigned: insert the vehicle and route records.
    fn register_vehicle(
        &self,
        vehicle: &VehicleRow,
        route:   &RouteRow,
        timeout: Duration,
    ) -> SinkResult<()>;

    /// Append one position sample.
    fn write_sample(&self, sample: &PositionSample, timeout: Duration) -> SinkResult<()>;

    /// Record a status transition.
    fn update_status(
        &self,
        vehicle: VehicleId,
        status:  VehicleStatus,
        at_ms:   i64,
        timeout: Duration,
    ) -> SinkResult<()>;

    /// The simulator dropped `vehicle`.  Stored rows are kept.
    fn remove_vehicle(&self, _vehicle: VehicleId, _timeout: Duration) -> SinkResult<()> {
        Ok(())
    }

    /// Delete everything the sink has stored.
    fn reset(&self) -> SinkResult<()>;

    /// Push buffered writes to their destination.
    fn flush(&self) -> SinkResult<()> {
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for Arc<S> {
    fn register_vehicle(&self, vehicle: &VehicleRow, route: &RouteRow, timeout: Duration) -> SinkResult<()> {
        (**self).register_vehicle(vehicle, route, timeout)
    }

    fn write_sample(&self, sample: &PositionSample, timeout: Duration) -> SinkResult<()> {
        (**self).write_sample(sample, timeout)
    }

    fn update_status(&self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64, timeout: Duration) -> SinkResult<()> {
        (**self).update_status(vehicle, status, at_ms, timeout)
    }

    fn remove_vehicle(&self, vehicle: VehicleId, timeout: Duration) -> SinkResult<()> {
        (**self).remove_vehicle(vehicle, timeout)
    }

    fn reset(&self) -> SinkResult<()> {
        (**self).reset()
    }

    fn flush(&self) -> SinkResult<()> {
        (**self).flush()
    }
}
