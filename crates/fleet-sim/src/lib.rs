//! `fleet-sim`: tick loop orchestrator for the fleet position simulator.
//!
//! # Three-phase tick loop
//!
//! ```text
//! every tick:
//!   ① Commands: apply assign / pause / resume / remove / reset requests
//!                sent through FleetHandle; deliver queued events.
//!   ② Compute:  MotionModel::advance for each moving vehicle, in parallel
//!                on the fleet's Rayon pool.  Read-only.
//!   ③ Apply:    for each result in ascending VehicleId order:
//!                  Ok(advance) → commit progress/status, on_sample
//!                  Err(e)      → park vehicle as idle, on_compute_failure
//! ```
//!
//! Results become visible to the observer only after the whole compute
//! phase has finished, so every tick is atomic from the outside.
//!
//! # Clocks
//!
//! | Method                  | Elapsed time per tick                        |
//! |-------------------------|----------------------------------------------|
//! | `run` / `run_ticks`     | Nominal `tick_interval_seconds` (logical)    |
//! | `run_realtime`          | Measured wall-clock time between ticks       |
//! | `step(elapsed, ..)`     | Caller-supplied                              |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use fleet_core::{FleetConfig, VehicleId};
//! use fleet_sim::{FleetBuilder, NoopObserver};
//!
//! let mut fleet = FleetBuilder::new(FleetConfig::default()).build()?;
//! fleet.assign(VehicleId::new_v4(), route, 40.0)?;
//! fleet.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod fleet;
pub mod handle;
pub mod observer;


pub use builder::FleetBuilder;
pub use error::{SimError, SimResult};
pub use fleet::{Fleet, FleetStats, Nearby};
pub use handle::{Command, FleetHandle};
pub use observer::{FleetObserver, NoopObserver, TickReport};
