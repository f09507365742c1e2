//! `fleet-core`: foundational types for the fleet position simulator.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies of its own.
//!
//! # What lives here
//!
//! | Module      | Contents                                                 |
//! |-------------|----------------------------------------------------------|
//! | [`ids`]     | `VehicleId`                                              |
//! | [`geo`]     | `GeoPoint`, haversine distance, compass bearing          |
//! | [`status`]  | `VehicleStatus` closed enum                              |
//! | [`time`]    | `Tick`, `SimClock`                                       |
//! | [`config`]  | `FleetConfig` (JSON + environment overlay)               |
//! | [`error`]   | `CoreError`, `CoreResult`                                |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod status;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::FleetConfig;
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::VehicleId;
pub use status::VehicleStatus;
pub use time::{SimClock, Tick};
