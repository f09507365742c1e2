//! Simulator configuration.
//!
//! Loaded from a JSON document by the application crate, optionally
//! overlaid with environment variables, then validated once before the
//! simulator is built.
//!
//! ```json
//! { "tick_interval_seconds": 1.0, "epsilon": 1e-6, "worker_pool_size": 4 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, SimClock, Tick};

pub const ENV_TICK_INTERVAL: &str = "FLEET_TICK_INTERVAL_SECONDS";
pub const ENV_EPSILON: &str = "FLEET_EPSILON";
pub const ENV_WORKER_POOL_SIZE: &str = "FLEET_WORKER_POOL_SIZE";

/// Top-level simulator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Seconds between ticks.  Controls update frequency and with it the
    /// network and storage write volume.  Default: 1.0.
    pub tick_interval_seconds: f64,

    /// Finish threshold: a vehicle whose progress reaches `1 - epsilon` is
    /// pinned to the end of its route.  Default: 1e-6.
    pub epsilon: f64,

    /// Compute worker threads.  `None` uses all logical cores.
    pub worker_pool_size: Option<usize>,

    /// Unix timestamp (milliseconds) of tick 0.
    pub start_unix_ms: i64,

    /// Upper bound on ticks processed by `Fleet::run`.  `None` runs until
    /// every vehicle has finished.
    pub total_ticks: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 1.0,
            epsilon:               1e-6,
            worker_pool_size:      None,
            start_unix_ms:         0,
            total_ticks:           None,
        }
    }
}

impl FleetConfig {
    /// Parse a JSON document.  Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Overlay `FLEET_*` environment variables on top of `self`.
    pub fn with_env(self) -> CoreResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup.  `with_env` delegates here;
    /// tests pass a closure over a fixed map.
    pub fn with_vars<F>(mut self, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_TICK_INTERVAL) {
            self.tick_interval_seconds = parse_var(ENV_TICK_INTERVAL, &v)?;
        } else {
            tracing::trace!("{ENV_TICK_INTERVAL} not set, using {}", self.tick_interval_seconds);
        }
        if let Some(v) = lookup(ENV_EPSILON) {
            self.epsilon = parse_var(ENV_EPSILON, &v)?;
        }
        if let Some(v) = lookup(ENV_WORKER_POOL_SIZE) {
            self.worker_pool_size = Some(parse_var(ENV_WORKER_POOL_SIZE, &v)?);
        }
        Ok(self)
    }

    /// Reject values the simulator cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.tick_interval_seconds.is_finite() && self.tick_interval_seconds >= 0.001) {
            return Err(CoreError::Config(format!(
                "tick_interval_seconds must be at least 0.001, got {}",
                self.tick_interval_seconds
            )));
        }
        if !(self.epsilon > 0.0 && self.epsilon < 0.5) {
            return Err(CoreError::Config(format!(
                "epsilon must lie in (0, 0.5), got {}",
                self.epsilon
            )));
        }
        if self.worker_pool_size == Some(0) {
            return Err(CoreError::Config("worker_pool_size must be at least 1".into()));
        }
        Ok(())
    }

    /// The tick at which `Fleet::run` stops, if capped.
    #[inline]
    pub fn end_tick(&self) -> Option<Tick> {
        self.total_ticks.map(Tick)
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_unix_ms, self.tick_interval_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Parse(format!("{key}={value:?}")))
}
