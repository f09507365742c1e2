//! The `Fleet` struct and its tick loop.

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use fleet_core::{FleetConfig, GeoPoint, SimClock, Tick, VehicleId, VehicleStatus};
use fleet_motion::{Advance, MotionModel, MotionResult, PositionSample, VehicleState};
use fleet_route::RouteGeometry;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::handle::Command;
use crate::{FleetHandle, FleetObserver, SimError, SimResult, TickReport};

// ── Events raised between ticks ───────────────────────────────────────────────

/// State changes made outside the tick loop (direct calls or handle
/// commands).  Queued and delivered to the observer at the next tick
/// boundary, so observers only ever see changes on the coordinating thread.
#[derive(Debug)]
pub(crate) enum FleetEvent {
    Assigned { vehicle: VehicleId, initial: PositionSample },
    StatusChanged { vehicle: VehicleId, status: VehicleStatus, at_ms: i64 },
    Removed(VehicleId),
    Reset,
}

impl FleetEvent {
    fn vehicle(&self) -> Option<VehicleId> {
        match self {
            FleetEvent::Assigned { vehicle, .. } | FleetEvent::StatusChanged { vehicle, .. } => {
                Some(*vehicle)
            }
            FleetEvent::Removed(vehicle) => Some(*vehicle),
            FleetEvent::Reset => None,
        }
    }
}

// ── Query results ─────────────────────────────────────────────────────────────

/// Health snapshot of the simulator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FleetStats {
    /// `false` once a stop has been requested.
    pub running:  bool,
    pub tick:     Tick,
    pub total:    usize,
    pub moving:   usize,
    pub idle:     usize,
    pub finished: usize,
}

/// One hit of a proximity query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Nearby {
    pub vehicle:     VehicleId,
    pub position:    GeoPoint,
    pub heading:     f64,
    pub status:      VehicleStatus,
    pub distance_km: f64,
}

// ── Fleet ─────────────────────────────────────────────────────────────────────

/// The fleet simulator.
///
/// `Fleet<M>` owns every [`VehicleState`] and drives the tick loop:
///
/// 1. **Commands**: drain the [`FleetHandle`] channel and apply each command.
/// 2. **Events**: deliver assignments and status changes made since the last
///    tick to the observer.
/// 3. **Compute phase** (parallel, on the fleet's Rayon pool): call
///    [`MotionModel::advance`] for every moving vehicle.  Inputs are shared
///    borrows; nothing is written.
/// 4. **Apply phase** (sequential, ascending `VehicleId` for determinism):
///    commit each result and forward its sample.  A failed computation
///    parks that vehicle as idle and the tick continues.
///
/// Idle and finished vehicles are skipped by the compute phase and emit no
/// sample.
///
/// Create via [`FleetBuilder`][crate::FleetBuilder].
pub struct Fleet<M: MotionModel> {
    /// Configuration the fleet was built with.
    pub config: FleetConfig,

    /// Simulation clock: tracks the current tick and simulated Unix time.
    pub clock: SimClock,

    pub(crate) model:    M,
    pub(crate) vehicles: BTreeMap<VehicleId, VehicleState>,
    pub(crate) pool:     rayon::ThreadPool,
    pub(crate) commands: Receiver<Command>,
    pub(crate) handle:   FleetHandle,
    pub(crate) pending:  Vec<FleetEvent>,
}

impl<M: MotionModel> Fleet<M> {
    // ── Run loops ─────────────────────────────────────────────────────────

    /// Run on the logical clock until no vehicle is moving, the configured
    /// `total_ticks` is reached, or a stop is requested.
    ///
    /// Every tick advances by the nominal interval.
    pub fn run<O: FleetObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let interval = self.config.tick_interval_seconds;
        loop {
            if self.handle.is_stopped() || self.reached_end() {
                break;
            }
            self.drain_commands();
            if !self.vehicles.values().any(VehicleState::is_active) {
                break;
            }
            self.step(interval, observer)?;
        }
        self.finish_run(observer);
        Ok(())
    }

    /// Run exactly `n` ticks of the nominal interval (ignores `total_ticks`
    /// and the stop flag).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_ticks<O: FleetObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        let interval = self.config.tick_interval_seconds;
        for _ in 0..n {
            self.step(interval, observer)?;
        }
        Ok(())
    }

    /// Run against the wall clock: one tick every `tick_interval_seconds`,
    /// each advancing vehicles by the time actually elapsed since the
    /// previous tick.  Keeps going while vehicles are idle or finished so
    /// new assignments can arrive; returns when a stop is requested or
    /// `total_ticks` is reached.
    pub fn run_realtime<O: FleetObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let interval = Duration::from_secs_f64(self.config.tick_interval_seconds);
        let mut last = Instant::now();

        while !self.handle.is_stopped() && !self.reached_end() {
            let deadline = last + interval;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last).as_secs_f64();
            last = now;
            self.step(elapsed, observer)?;
        }
        self.finish_run(observer);
        Ok(())
    }

    /// Process one tick covering `elapsed_secs` of simulated time.
    ///
    /// # Errors
    ///
    /// `InvalidElapsed` if `elapsed_secs` is negative or not finite.  Per
    /// vehicle failures never surface here.
    pub fn step<O: FleetObserver>(
        &mut self,
        elapsed_secs: f64,
        observer:     &mut O,
    ) -> SimResult<TickReport> {
        if !(elapsed_secs.is_finite() && elapsed_secs >= 0.0) {
            return Err(SimError::InvalidElapsed(elapsed_secs));
        }

        // ── Phase 1: commands and queued events ───────────────────────────
        self.drain_commands();
        self.flush_events(observer);

        let tick = self.clock.current_tick;
        observer.on_tick_start(tick);

        // ── Phase 2: compute (parallel, read-only) ────────────────────────
        let timestamp_ms = self.clock.peek_after(elapsed_secs);
        let results = self.compute(elapsed_secs, timestamp_ms);

        // ── Phase 3: apply (sequential, ascending VehicleId) ──────────────
        let mut report = TickReport { tick, timestamp_ms, ..TickReport::default() };
        for (vehicle, result) in results {
            let Some(state) = self.vehicles.get_mut(&vehicle) else {
                continue;
            };
            match result {
                Ok(advance) => {
                    let change = state.apply(&advance);
                    observer.on_sample(advance.sample);
                    report.advanced += 1;

                    if let Some(status) = change {
                        if status == VehicleStatus::Finished {
                            report.finished += 1;
                            info!(vehicle = %vehicle, tick = %tick, "vehicle reached destination");
                        }
                        observer.on_status_change(vehicle, status, timestamp_ms);
                    }
                }
                Err(error) => {
                    warn!(vehicle = %vehicle, error = %error, "position computation failed, parking vehicle");
                    state.mark_faulted(timestamp_ms);
                    report.failed += 1;
                    observer.on_compute_failure(vehicle, &error);
                    observer.on_status_change(vehicle, state.status, timestamp_ms);
                }
            }
        }
        report.moving = self.vehicles.values().filter(|v| v.is_active()).count();

        debug!(
            tick     = %tick,
            advanced = report.advanced,
            finished = report.finished,
            failed   = report.failed,
            moving   = report.moving,
            "tick complete"
        );
        observer.on_tick_end(&report);

        self.clock.advance_by(elapsed_secs);
        Ok(report)
    }

    /// Deliver queued assignment and status events to `observer` without
    /// processing a tick.
    pub fn flush_events<O: FleetObserver>(&mut self, observer: &mut O) {
        for event in std::mem::take(&mut self.pending) {
            match event {
                FleetEvent::Assigned { vehicle, initial } => {
                    if let Some(state) = self.vehicles.get(&vehicle) {
                        observer.on_assigned(state, initial);
                    }
                }
                FleetEvent::StatusChanged { vehicle, status, at_ms } => {
                    observer.on_status_change(vehicle, status, at_ms);
                }
                FleetEvent::Removed(vehicle) => observer.on_removed(vehicle),
                FleetEvent::Reset => observer.on_reset(),
            }
        }
    }

    // ── Vehicle management ────────────────────────────────────────────────

    /// Start `vehicle` on `route` at `speed_kmh`: status `Moving`, progress
    /// 0.  The initial sample at the route's first point is delivered to the
    /// observer at the next tick boundary.
    pub fn assign(
        &mut self,
        vehicle:   VehicleId,
        route:     RouteGeometry,
        speed_kmh: f64,
    ) -> SimResult<()> {
        if self.vehicles.contains_key(&vehicle) {
            return Err(SimError::DuplicateVehicle(vehicle));
        }
        let now = self.clock.now_ms();
        let mut state = VehicleState::assign(vehicle, route, speed_kmh, now)?;
        let initial = state.initial_sample(now);
        state.last_sample = Some(initial);

        info!(
            vehicle    = %vehicle,
            speed_kmh,
            distance_m = state.route().total_distance_m(),
            "route assigned"
        );
        self.vehicles.insert(vehicle, state);
        self.pending.push(FleetEvent::Assigned { vehicle, initial });
        Ok(())
    }

    /// `Moving → Idle`.  Returns `true` if the status changed.
    pub fn pause(&mut self, vehicle: VehicleId) -> SimResult<bool> {
        let now = self.clock.now_ms();
        let state = self.state_mut(vehicle)?;
        let changed = state.pause(now)?;
        if changed {
            self.pending.push(FleetEvent::StatusChanged {
                vehicle,
                status: VehicleStatus::Idle,
                at_ms:  now,
            });
        }
        Ok(changed)
    }

    /// `Idle → Moving`.  Returns `true` if the status changed.
    pub fn resume(&mut self, vehicle: VehicleId) -> SimResult<bool> {
        let now = self.clock.now_ms();
        let state = self.state_mut(vehicle)?;
        let changed = state.resume(now)?;
        if changed {
            self.pending.push(FleetEvent::StatusChanged {
                vehicle,
                status: VehicleStatus::Moving,
                at_ms:  now,
            });
        }
        Ok(changed)
    }

    pub fn set_speed(&mut self, vehicle: VehicleId, speed_kmh: f64) -> SimResult<()> {
        self.state_mut(vehicle)?.set_speed(speed_kmh)?;
        Ok(())
    }

    /// Drop `vehicle` and its route.  No sample is emitted for it after this
    /// returns.
    pub fn remove(&mut self, vehicle: VehicleId) -> SimResult<VehicleState> {
        let state = self
            .vehicles
            .remove(&vehicle)
            .ok_or(SimError::UnknownVehicle(vehicle))?;

        // An assignment the observer has not seen yet is withdrawn together
        // with everything queued for the vehicle after it.  Events before it
        // (an earlier removal of the same id) still go out.
        let unannounced = self.pending.iter().rposition(
            |e| matches!(e, FleetEvent::Assigned { vehicle: v, .. } if *v == vehicle),
        );
        match unannounced {
            Some(at) => {
                let mut index = 0;
                self.pending.retain(|e| {
                    let keep = index < at || e.vehicle() != Some(vehicle);
                    index += 1;
                    keep
                });
            }
            None => self.pending.push(FleetEvent::Removed(vehicle)),
        }
        info!(vehicle = %vehicle, progress = state.progress, "vehicle removed");
        Ok(state)
    }

    /// Remove every vehicle.  The observer receives `on_reset` at the next
    /// tick boundary.
    pub fn reset(&mut self) {
        let cleared = self.vehicles.len();
        self.vehicles.clear();
        self.pending.clear();
        self.pending.push(FleetEvent::Reset);
        info!(cleared, "fleet reset");
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// A cloneable handle for controlling this fleet from other threads.
    pub fn handle(&self) -> FleetHandle {
        self.handle.clone()
    }

    #[inline]
    pub fn vehicle(&self, vehicle: VehicleId) -> Option<&VehicleState> {
        self.vehicles.get(&vehicle)
    }

    /// All vehicles in ascending id order.
    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    #[inline]
    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn stats(&self) -> FleetStats {
        let mut stats = FleetStats {
            running: !self.handle.is_stopped(),
            tick:    self.clock.current_tick,
            total:   self.vehicles.len(),
            ..FleetStats::default()
        };
        for state in self.vehicles.values() {
            match state.status {
                VehicleStatus::Moving => stats.moving += 1,
                VehicleStatus::Idle => stats.idle += 1,
                VehicleStatus::Finished => stats.finished += 1,
            }
        }
        stats
    }

    /// Vehicles whose latest sample lies within `radius_km` of `center`,
    /// nearest first.
    pub fn nearby(&self, center: GeoPoint, radius_km: f64) -> Vec<Nearby> {
        // Degrees of longitude shrink with latitude; size the prefilter box
        // for the wider of the two axes.
        let half_deg = radius_km / (111.32 * center.lat.to_radians().cos().abs().max(0.01));

        let mut hits: Vec<Nearby> = self
            .vehicles
            .values()
            .filter_map(|state| {
                let sample = state.last_sample?;
                let position = sample.position();
                if !position.within_bbox(center, half_deg) {
                    return None;
                }
                let distance_km = center.distance_m(position) / 1000.0;
                (distance_km <= radius_km).then_some(Nearby {
                    vehicle: state.id,
                    position,
                    heading: sample.heading,
                    status: state.status,
                    distance_km,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        hits
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn compute(
        &self,
        elapsed_secs: f64,
        timestamp_ms: i64,
    ) -> Vec<(VehicleId, MotionResult<Advance>)> {
        let model = &self.model;
        let active: Vec<&VehicleState> =
            self.vehicles.values().filter(|v| v.is_active()).collect();

        // Indexed parallel collect keeps ascending VehicleId order.
        self.pool.install(|| {
            active
                .par_iter()
                .map(|state| (state.id, model.advance(state, elapsed_secs, timestamp_ms)))
                .collect()
        })
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            let outcome = match command {
                Command::Assign { vehicle, route, speed_kmh } => {
                    self.assign(vehicle, route, speed_kmh)
                }
                Command::Pause(vehicle) => self.pause(vehicle).map(drop),
                Command::Resume(vehicle) => self.resume(vehicle).map(drop),
                Command::SetSpeed(vehicle, speed) => self.set_speed(vehicle, speed),
                Command::Remove(vehicle) => self.remove(vehicle).map(drop),
                Command::Reset => {
                    self.reset();
                    Ok(())
                }
            };
            if let Err(error) = outcome {
                warn!(error = %error, "fleet command rejected");
            }
        }
    }

    fn state_mut(&mut self, vehicle: VehicleId) -> SimResult<&mut VehicleState> {
        self.vehicles
            .get_mut(&vehicle)
            .ok_or(SimError::UnknownVehicle(vehicle))
    }

    fn reached_end(&self) -> bool {
        self.config
            .end_tick()
            .is_some_and(|end| self.clock.current_tick >= end)
    }

    fn finish_run<O: FleetObserver>(&mut self, observer: &mut O) {
        self.drain_commands();
        self.flush_events(observer);
        let stats = self.stats();
        info!(
            clock    = %self.clock,
            moving   = stats.moving,
            idle     = stats.idle,
            finished = stats.finished,
            "simulation stopped"
        );
        observer.on_sim_end(self.clock.current_tick);
    }
}
