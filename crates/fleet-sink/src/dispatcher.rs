//! Sharded, ordered, retrying delivery to a [`SampleSink`].
//!
//! ```text
//!   tick loop ──send_*──► shard[id % N] queue ──► worker thread ──► sink
//! ```
//!
//! Every vehicle maps to one shard, and each shard is a FIFO drained by a
//! single thread, so writes for one vehicle reach the sink in the order they
//! were produced, even while earlier writes are still being retried.
//! Different vehicles progress independently.  The tick loop never waits on
//! sink I/O: queues are bounded by `queue_capacity`, and a write that finds
//! its shard queue full is dropped and counted rather than blocking.
//!
//! A reset travels as a gate on every shard.  Once all shards reach it, a
//! short-lived thread resets the sink and reopens the gates, so writes queued
//! before the reset are applied first and writes queued after it survive.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;
use tracing::{debug, warn};

use crate::{RouteRow, SampleSink, SinkConfig, SinkError, SinkResult, VehicleRow};

// ── Jobs ──────────────────────────────────────────────────────────────────────

enum Job {
    Register(Box<(VehicleRow, RouteRow)>),
    Sample(PositionSample),
    Status { vehicle: VehicleId, status: VehicleStatus, at_ms: i64 },
    Remove(VehicleId),
    /// Acknowledged once every job queued before it has been handled.
    Barrier(Sender<()>),
    /// Signals `arrived`, then holds the shard until `release` fires or is
    /// dropped.
    Gate { arrived: Sender<()>, release: Receiver<()> },
}

impl Job {
    fn vehicle(&self) -> Option<VehicleId> {
        match self {
            Job::Register(rows) => Some(rows.0.id),
            Job::Sample(sample) => Some(sample.vehicle_id),
            Job::Status { vehicle, .. } | Job::Remove(vehicle) => Some(*vehicle),
            Job::Barrier(_) | Job::Gate { .. } => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Job::Register(_) => "register",
            Job::Sample(_) => "sample",
            Job::Status { .. } => "status",
            Job::Remove(_) => "remove",
            Job::Barrier(_) => "barrier",
            Job::Gate { .. } => "reset",
        }
    }

    fn apply<S: SampleSink>(&self, sink: &S, config: &SinkConfig) -> SinkResult<()> {
        let timeout = config.write_timeout();
        match self {
            Job::Register(rows) => sink.register_vehicle(&rows.0, &rows.1, timeout),
            Job::Sample(sample) => sink.write_sample(sample, timeout),
            Job::Status { vehicle, status, at_ms } => {
                sink.update_status(*vehicle, *status, *at_ms, timeout)
            }
            Job::Remove(vehicle) => sink.remove_vehicle(*vehicle, timeout),
            Job::Barrier(_) | Job::Gate { .. } => Ok(()),
        }
    }
}

// ── Counters ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    retried:   AtomicU64,
    dropped:   AtomicU64,
}

/// Delivery totals since the dispatcher was created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Writes the sink accepted.
    pub delivered: u64,
    /// Extra attempts made after transient failures.
    pub retried:   u64,
    /// Writes given up on.
    pub dropped:   u64,
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Owns the shard worker threads feeding one [`SampleSink`].
///
/// Dropping the dispatcher closes the queues and joins the workers after
/// they have delivered everything already queued.
pub struct Dispatcher<S: SampleSink + 'static> {
    sink:     Arc<S>,
    config:   SinkConfig,
    shards:   Vec<SyncSender<Job>>,
    workers:  Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl<S: SampleSink + 'static> Dispatcher<S> {
    /// Start `config.shards` worker threads (at least one) delivering to
    /// `sink`.
    pub fn new(sink: S, config: SinkConfig) -> SinkResult<Self> {
        let sink = Arc::new(sink);
        let counters = Arc::new(Counters::default());
        let shard_count = config.shards.max(1);

        let mut shards = Vec::with_capacity(shard_count);
        let mut workers = Vec::with_capacity(shard_count);
        for shard in 0..shard_count {
            let (tx, rx) = mpsc::sync_channel(config.queue_capacity.max(1));
            let worker = {
                let sink = Arc::clone(&sink);
                let counters = Arc::clone(&counters);
                let config = config.clone();
                thread::Builder::new()
                    .name(format!("fleet-sink-{shard}"))
                    .spawn(move || run_shard(rx, &*sink, &config, &counters))?
            };
            shards.push(tx);
            workers.push(worker);
        }
        debug!(shards = shard_count, "sink dispatcher started");

        Ok(Self { sink, config, shards, workers, counters })
    }

    /// The sink behind this dispatcher, for reads.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn send_register(&self, vehicle: VehicleRow, route: RouteRow) -> SinkResult<()> {
        self.enqueue(Job::Register(Box::new((vehicle, route))))
    }

    pub fn send_sample(&self, sample: PositionSample) -> SinkResult<()> {
        self.enqueue(Job::Sample(sample))
    }

    pub fn send_status(&self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64) -> SinkResult<()> {
        self.enqueue(Job::Status { vehicle, status, at_ms })
    }

    pub fn send_remove(&self, vehicle: VehicleId) -> SinkResult<()> {
        self.enqueue(Job::Remove(vehicle))
    }

    /// Block until every write queued so far has been delivered or dropped,
    /// then flush the sink.
    pub fn drain(&self) -> SinkResult<()> {
        let mut acks = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let (tx, rx) = mpsc::channel();
            shard.send(Job::Barrier(tx)).map_err(|_| SinkError::Closed)?;
            acks.push(rx);
        }
        for ack in acks {
            ack.recv().map_err(|_| SinkError::Closed)?;
        }
        self.sink.flush()
    }

    /// Wait for queued writes, then delete everything stored.
    ///
    /// Blocks the caller; retried like any other write.  The simulator uses
    /// [`send_reset`][Self::send_reset] instead.
    pub fn reset(&self) -> SinkResult<()> {
        self.drain()?;
        reset_with_retry(&*self.sink, &self.config, &self.counters)
    }

    /// Queue a reset behind every write already queued and return at once.
    ///
    /// Writes queued after this call are held until the reset is done and
    /// are kept.  A reset that still fails after its retries is logged and
    /// counted as dropped.  Waits only while a shard queue is full.
    pub fn send_reset(&self) -> SinkResult<()> {
        if self.shards.is_empty() {
            return Err(SinkError::Closed);
        }
        let (arrived_tx, arrived_rx) = mpsc::channel();
        let mut releases = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let (release_tx, release_rx) = mpsc::channel();
            let gate = Job::Gate { arrived: arrived_tx.clone(), release: release_rx };
            shard.send(gate).map_err(|_| SinkError::Closed)?;
            releases.push(release_tx);
        }
        drop(arrived_tx);

        let sink = Arc::clone(&self.sink);
        let config = self.config.clone();
        let counters = Arc::clone(&self.counters);
        thread::Builder::new()
            .name("fleet-sink-reset".to_owned())
            .spawn(move || {
                let shard_count = releases.len();
                if arrived_rx.iter().take(shard_count).count() == shard_count {
                    if let Err(e) = reset_with_retry(&*sink, &config, &counters) {
                        counters.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "sink reset dropped");
                    }
                }
                // Dropping the senders reopens every gate.
                drop(releases);
            })?;
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            retried:   self.counters.retried.load(Ordering::Relaxed),
            dropped:   self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Close the queues, wait for the workers to finish what was queued,
    /// and flush the sink.
    ///
    /// Idempotent: safe to call more than once.
    pub fn close(&mut self) -> SinkResult<()> {
        if self.shards.is_empty() {
            return Ok(());
        }
        self.shards.clear();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("sink shard worker panicked");
            }
        }
        let stats = self.stats();
        debug!(
            delivered = stats.delivered,
            retried   = stats.retried,
            dropped   = stats.dropped,
            "sink dispatcher closed"
        );
        self.sink.flush()
    }

    fn shard_for(&self, vehicle: VehicleId) -> usize {
        (vehicle.as_u128() % self.shards.len() as u128) as usize
    }

    fn enqueue(&self, job: Job) -> SinkResult<()> {
        if self.shards.is_empty() {
            return Err(SinkError::Closed);
        }
        let shard = job.vehicle().map_or(0, |v| self.shard_for(v));
        match self.shards[shard].try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    vehicle  = ?job.vehicle(),
                    kind     = job.kind(),
                    capacity = self.config.queue_capacity,
                    "sink queue full, write dropped"
                );
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(SinkError::Closed),
        }
    }
}

impl<S: SampleSink + 'static> Drop for Dispatcher<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "sink flush failed while closing dispatcher");
        }
    }
}

// ── Shard worker ──────────────────────────────────────────────────────────────

fn run_shard<S: SampleSink>(
    jobs:     Receiver<Job>,
    sink:     &S,
    config:   &SinkConfig,
    counters: &Counters,
) {
    for job in jobs {
        match job {
            Job::Barrier(ack) => {
                // The waiter may have given up; nothing to do then.
                let _ = ack.send(());
            }
            Job::Gate { arrived, release } => {
                let _ = arrived.send(());
                let _ = release.recv();
            }
            job => deliver(&job, sink, config, counters),
        }
    }
}

fn reset_with_retry<S: SampleSink>(sink: &S, config: &SinkConfig, counters: &Counters) -> SinkResult<()> {
    let mut attempt = 1;
    loop {
        match sink.reset() {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                counters.retried.fetch_add(1, Ordering::Relaxed);
                thread::sleep(config.backoff(attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Apply one job, retrying transient failures with exponential backoff.
/// After `max_attempts` the job is dropped and logged.
fn deliver<S: SampleSink>(job: &Job, sink: &S, config: &SinkConfig, counters: &Counters) {
    let mut attempt = 1;
    loop {
        match job.apply(sink, config) {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                counters.retried.fetch_add(1, Ordering::Relaxed);
                thread::sleep(config.backoff(attempt));
                attempt += 1;
            }
            Err(e) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    vehicle  = ?job.vehicle(),
                    kind     = job.kind(),
                    attempts = attempt,
                    error    = %e,
                    "sink write dropped"
                );
                return;
            }
        }
    }
}
