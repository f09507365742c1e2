//! In-process publish/subscribe for live position updates.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;
use tracing::warn;

use crate::{RouteRow, SampleSink, SinkResult, VehicleRow};

/// What a subscriber wants to hear about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Topic {
    /// Every vehicle.
    All,
    /// One vehicle only.
    Vehicle(VehicleId),
}

impl Topic {
    #[inline]
    pub fn matches(self, vehicle: VehicleId) -> bool {
        match self {
            Topic::All => true,
            Topic::Vehicle(v) => v == vehicle,
        }
    }
}

struct Subscriber {
    topic: Topic,
    tx:    SyncSender<PositionSample>,
}

/// Fan-out of position samples to any number of subscribers.
///
/// Subscribers join with [`subscribe`][Self::subscribe] and leave by
/// dropping their [`Subscription`]; neither affects the simulation.  Each
/// subscriber has its own queue of `capacity` samples, so a slow reader never
/// holds up publishing: once its queue is full it misses new samples until
/// it catches up.  Samples for one vehicle are delivered in the order they
/// are published.
pub struct Broadcaster {
    subscribers: Mutex<Vec<Subscriber>>,
    capacity:    usize,
}

/// Per-subscriber queue length used by [`Broadcaster::new`].
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1_024;

impl Default for Broadcaster {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each subscriber buffers at most `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self { subscribers: Mutex::new(Vec::new()), capacity: capacity.max(1) }
    }

    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        self.lock().push(Subscriber { topic, tx });
        Subscription { topic, rx }
    }

    /// Deliver `sample` to every matching subscriber and return how many
    /// received it.  Subscribers that have gone away are pruned; those with
    /// a full queue skip this sample.
    pub fn publish(&self, sample: &PositionSample) -> usize {
        let mut delivered = 0;
        let mut lagging = 0;
        self.lock().retain(|sub| {
            if !sub.topic.matches(sample.vehicle_id) {
                return true;
            }
            match sub.tx.try_send(*sample) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    lagging += 1;
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
        if lagging > 0 {
            warn!(
                vehicle   = %sample.vehicle_id,
                lagging,
                timestamp = sample.timestamp_ms,
                "subscriber queue full, sample skipped"
            );
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        // The list is valid after any panic mid-publish; keep serving.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSink for Broadcaster {
    fn register_vehicle(&self, _: &VehicleRow, _: &RouteRow, _: Duration) -> SinkResult<()> {
        Ok(())
    }

    fn write_sample(&self, sample: &PositionSample, _timeout: Duration) -> SinkResult<()> {
        self.publish(sample);
        Ok(())
    }

    fn update_status(&self, _: VehicleId, _: VehicleStatus, _: i64, _: Duration) -> SinkResult<()> {
        Ok(())
    }

    /// Per-vehicle subscriptions end: their receivers see the channel close
    /// after the samples already published.
    fn remove_vehicle(&self, vehicle: VehicleId, _timeout: Duration) -> SinkResult<()> {
        self.lock().retain(|sub| sub.topic != Topic::Vehicle(vehicle));
        Ok(())
    }

    fn reset(&self) -> SinkResult<()> {
        self.lock().retain(|sub| sub.topic == Topic::All);
        Ok(())
    }
}

/// The receiving end of one subscription.
pub struct Subscription {
    topic: Topic,
    rx:    Receiver<PositionSample>,
}

impl Subscription {
    #[inline]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Block for the next sample.  `None` once the broadcaster is gone or
    /// the subscription was closed.
    pub fn recv(&self) -> Option<PositionSample> {
        self.rx.recv().ok()
    }

    /// `Ok(None)` if nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<PositionSample>, Closed> {
        match self.rx.recv_timeout(timeout) {
            Ok(sample) => Ok(Some(sample)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Closed),
        }
    }

    /// Next already-delivered sample, without blocking.
    pub fn try_recv(&self) -> Result<Option<PositionSample>, Closed> {
        match self.rx.try_recv() {
            Ok(sample) => Ok(Some(sample)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Closed),
        }
    }

    /// Everything delivered so far.
    pub fn drain(&self) -> Vec<PositionSample> {
        self.rx.try_iter().collect()
    }
}

/// The subscription will receive nothing more.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Closed;
