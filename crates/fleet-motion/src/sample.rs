//! The per-tick output record.

use fleet_core::{GeoPoint, VehicleId};
use fleet_route::RoutePoint;
use serde::{Deserialize, Serialize};

/// Where one vehicle was at one instant.
///
/// Produced once per vehicle per tick and never mutated afterwards.
/// Ownership passes to the sink for persistence and broadcast.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub vehicle_id:   VehicleId,
    pub lat:          f64,
    pub lng:          f64,
    /// Compass bearing of travel, degrees `[0, 360)`.
    pub heading:      f64,
    /// Percentage of the route covered, `[0, 100]`.
    pub progress:     f64,
    /// Unix milliseconds.
    pub timestamp_ms: i64,
}

impl PositionSample {
    /// Build a sample from a route point and a progress fraction in `[0, 1]`.
    pub fn at(vehicle_id: VehicleId, point: RoutePoint, fraction: f64, timestamp_ms: i64) -> Self {
        Self {
            vehicle_id,
            lat:          point.position.lat,
            lng:          point.position.lng,
            heading:      point.heading_deg,
            progress:     fraction * 100.0,
            timestamp_ms,
        }
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}
