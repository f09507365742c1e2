//! Plain data row types written by sink backends.

use fleet_core::{GeoPoint, VehicleId, VehicleStatus};
use fleet_motion::VehicleState;

/// One row of the `vehicles` table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleRow {
    pub id:            VehicleId,
    pub start:         GeoPoint,
    pub end:           GeoPoint,
    pub speed_kmh:     f64,
    pub status:        VehicleStatus,
    /// Unix milliseconds.
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl VehicleRow {
    pub fn from_state(state: &VehicleState) -> Self {
        Self {
            id:            state.id,
            start:         state.origin(),
            end:           state.destination(),
            speed_kmh:     state.speed_kmh,
            status:        state.status,
            created_at_ms: state.assigned_at_ms,
            updated_at_ms: state.updated_at_ms,
        }
    }
}

/// One row of the `routes` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRow {
    pub vehicle_id:    VehicleId,
    /// GeoJSON `LineString`, `[lng, lat]` positions.
    pub geometry:      String,
    /// Metres.
    pub distance_m:    f64,
    /// Seconds.
    pub duration_s:    f64,
    pub created_at_ms: i64,
}

impl RouteRow {
    pub fn from_state(state: &VehicleState) -> Self {
        let route = state.route();
        Self {
            vehicle_id:    state.id,
            geometry:      route.to_geojson().to_string(),
            distance_m:    route.total_distance_m(),
            duration_s:    route.total_duration_s(),
            created_at_ms: state.assigned_at_ms,
        }
    }
}
