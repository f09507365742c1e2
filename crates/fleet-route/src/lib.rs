//! `fleet-route`: the path a vehicle follows.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`geometry`] | `RouteGeometry` (points + cumulative distance), `RoutePoint`  |
//! | [`plan`]     | `RoutePlan`: routing-provider / GeoJSON route decoding       |
//! | [`error`]    | `RouteError`, `RouteResult<T>`                                |
//!
//! Routes are computed elsewhere.  This crate only turns a provider's
//! polyline into an immutable, strongly typed point sequence (once, at load
//! time) and answers "where along the route is fraction `f`?".

pub mod error;
pub mod geometry;
pub mod plan;


pub use error::{RouteError, RouteResult};
pub use geometry::{RouteGeometry, RoutePoint, FALLBACK_SPEED_MPS};
pub use plan::{LineString, RoutePlan};
