//! Fluent builder for constructing a [`Fleet`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;

use fleet_core::FleetConfig;
use fleet_motion::{MotionModel, PositionSampler};

use crate::{Fleet, FleetHandle, SimError, SimResult};

/// Fluent builder for [`Fleet<M>`].
///
/// # Required inputs
///
/// - [`FleetConfig`]: tick interval, epsilon, worker pool size, …
///
/// # Optional inputs (have defaults)
///
/// | Method            | Default                                          |
/// |-------------------|--------------------------------------------------|
/// | `.model(m)`       | `PositionSampler` with the config's `epsilon`    |
///
/// # Example
///
/// ```rust,ignore
/// let mut fleet = FleetBuilder::new(config).build()?;
/// let handle = fleet.handle();
/// fleet.assign(VehicleId::new_v4(), route, 40.0)?;
/// fleet.run(&mut NoopObserver)?;
/// ```
pub struct FleetBuilder<M: MotionModel> {
    config: FleetConfig,
    model:  M,
}

impl FleetBuilder<PositionSampler> {
    /// Create a builder using the constant-speed [`PositionSampler`].
    pub fn new(config: FleetConfig) -> Self {
        let model = PositionSampler::new(config.epsilon);
        Self { config, model }
    }
}

impl<M: MotionModel> FleetBuilder<M> {
    /// Replace the motion model.
    pub fn model<N: MotionModel>(self, model: N) -> FleetBuilder<N> {
        FleetBuilder { config: self.config, model }
    }

    /// Validate the configuration, start the worker pool, and return a
    /// ready-to-run [`Fleet`].
    ///
    /// A pool that cannot be started is the one fatal condition of the
    /// simulator and surfaces here as [`SimError::WorkerPool`].
    pub fn build(self) -> SimResult<Fleet<M>> {
        self.config.validate()?;

        // num_threads(0) lets Rayon pick one thread per logical core.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_pool_size.unwrap_or(0))
            .thread_name(|i| format!("fleet-worker-{i}"))
            .build()
            .map_err(|e| SimError::WorkerPool(e.to_string()))?;

        let (tx, rx) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));

        tracing::debug!(
            threads  = pool.current_num_threads(),
            interval = self.config.tick_interval_seconds,
            "fleet worker pool started"
        );

        Ok(Fleet {
            clock:    self.config.make_clock(),
            config:   self.config,
            model:    self.model,
            vehicles: BTreeMap::new(),
            pool,
            commands: rx,
            handle:   FleetHandle::new(tx, stopped),
            pending:  Vec::new(),
        })
    }
}
