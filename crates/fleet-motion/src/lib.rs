//! `fleet-motion`: vehicle movement state and position sampling.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`state`]   | `VehicleState`: one vehicle's progress, speed, and status      |
//! | [`sample`]  | `PositionSample`: the immutable per-tick output record         |
//! | [`sampler`] | `MotionModel` trait, `PositionSampler`, `Advance`               |
//! | [`error`]   | `MotionError`, `MotionResult<T>`                                |
//!
//! # Movement model
//!
//! Vehicles move at constant speed along a fixed [`RouteGeometry`]:
//!
//! 1. Each tick the sampler converts `speed × elapsed` into metres and adds
//!    `metres / total_distance` to the progress fraction, clamped to `[0, 1]`.
//! 2. Position and heading come from `RouteGeometry::point_at(progress)`.
//! 3. Within `epsilon` of the end the vehicle is pinned to the final point
//!    and becomes `Finished`.
//!
//! The sampler is a pure function of its inputs, so the simulator may run it
//! for many vehicles in parallel.
//!
//! [`RouteGeometry`]: fleet_route::RouteGeometry

pub mod error;
pub mod sample;
pub mod sampler;
pub mod state;


pub use error::{MotionError, MotionResult};
pub use sample::PositionSample;
pub use sampler::{Advance, DEFAULT_EPSILON, MotionModel, PositionSampler};
pub use state::VehicleState;
