//! Geographic coordinate type and spherical-earth helpers.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Progress is tracked to a
//! finish threshold of ~1e-6 of the route length, which single precision
//! cannot resolve on routes longer than a few kilometres.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` if both components are finite numbers.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial great-circle bearing from `self` towards `other`, in compass
    /// degrees `[0, 360)` (0 = north, 90 = east).
    pub fn bearing_deg(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let x = d_lng.sin() * lat2.cos();
        let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

        let deg = x.atan2(y).to_degrees();
        // `rem_euclid` can round up to exactly 360.0 for tiny negative inputs.
        let norm = (deg + 360.0).rem_euclid(360.0);
        if norm >= 360.0 { 0.0 } else { norm }
    }

    /// Linear interpolation in lat/lng space.  `t = 0` returns `self` and
    /// `t = 1` returns `other`, both exactly.
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Approximate bounding-box check: much cheaper than `distance_m` for
    /// quick rejection before a radius query.  Longitude differences wrap
    /// at ±180°.
    #[inline]
    pub fn within_bbox(self, center: GeoPoint, half_deg: f64) -> bool {
        let dlng = (self.lng - center.lng + 180.0).rem_euclid(360.0) - 180.0;
        (self.lat - center.lat).abs() <= half_deg && dlng.abs() <= half_deg
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}
