//! `SinkObserver<S>`: bridges `FleetObserver` to a [`Dispatcher`].

use fleet_core::{Tick, VehicleId, VehicleStatus};
use fleet_motion::{PositionSample, VehicleState};
use fleet_sim::FleetObserver;

use crate::{Dispatcher, RouteRow, SampleSink, SinkError, SinkResult, VehicleRow};

/// A [`FleetObserver`] that forwards assignments, samples, and status
/// changes to a [`SampleSink`] through a [`Dispatcher`].
///
/// Observer callbacks only enqueue; delivery happens on the dispatcher's
/// shard threads, resets included.  Errors that reach the observer (a
/// closed dispatcher, a failed thread spawn) are stored because
/// `FleetObserver` methods have no return value.  After `fleet.run()`
/// returns, check with [`take_error`][Self::take_error].
pub struct SinkObserver<S: SampleSink + 'static> {
    dispatcher: Dispatcher<S>,
    last_error: Option<SinkError>,
}

impl<S: SampleSink + 'static> SinkObserver<S> {
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self { dispatcher, last_error: None }
    }

    /// Take the stored error (if any) after the run returns.
    ///
    /// Returns `None` if every hand-off succeeded.  Writes dropped after
    /// exhausting their retries are counted in
    /// [`Dispatcher::stats`] instead.
    pub fn take_error(&mut self) -> Option<SinkError> {
        self.last_error.take()
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Unwrap the dispatcher (e.g. to drain it and inspect the sink).
    pub fn into_dispatcher(self) -> Dispatcher<S> {
        self.dispatcher
    }

    fn store_err(&mut self, result: SinkResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<S: SampleSink + 'static> FleetObserver for SinkObserver<S> {
    fn on_assigned(&mut self, vehicle: &VehicleState, initial: PositionSample) {
        let result = self
            .dispatcher
            .send_register(VehicleRow::from_state(vehicle), RouteRow::from_state(vehicle))
            .and_then(|()| self.dispatcher.send_sample(initial));
        self.store_err(result);
    }

    fn on_sample(&mut self, sample: PositionSample) {
        let result = self.dispatcher.send_sample(sample);
        self.store_err(result);
    }

    fn on_status_change(&mut self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64) {
        let result = self.dispatcher.send_status(vehicle, status, at_ms);
        self.store_err(result);
    }

    fn on_removed(&mut self, vehicle: VehicleId) {
        let result = self.dispatcher.send_remove(vehicle);
        self.store_err(result);
    }

    fn on_reset(&mut self) {
        let result = self.dispatcher.send_reset();
        self.store_err(result);
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let result = self.dispatcher.drain();
        self.store_err(result);
    }
}
