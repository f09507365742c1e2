//! `RouteGeometry`: an immutable polyline with cumulative distances.

use fleet_core::GeoPoint;

use crate::{RouteError, RouteResult};

/// Assumed speed (m/s) when estimating the duration of a straight-line
/// fallback route.  10 m/s = 36 km/h.
pub const FALLBACK_SPEED_MPS: f64 = 10.0;

/// A position on a route together with the direction of travel there.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoutePoint {
    pub position:    GeoPoint,
    /// Compass bearing in degrees, `[0, 360)`.
    pub heading_deg: f64,
}

/// An ordered sequence of at least two points plus the cumulative
/// great-circle distance to each of them.
///
/// `cumulative_m[0] == 0` and the sequence is non-decreasing; repeated
/// points simply add a zero-length segment.  `total_distance_m` is the
/// distance used for progress accounting: the routing provider's figure when
/// one was supplied, otherwise the geometric length.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    points:           Vec<GeoPoint>,
    cumulative_m:     Vec<f64>,
    total_distance_m: f64,
    total_duration_s: f64,
}

impl RouteGeometry {
    /// Build a route from `points`, measuring its length.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if fewer than two points are supplied or any
    /// coordinate is not finite.
    pub fn new(points: Vec<GeoPoint>) -> RouteResult<Self> {
        if points.len() < 2 {
            return Err(RouteError::InvalidGeometry(format!(
                "a route needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(RouteError::InvalidGeometry(format!("point {i} is not finite")));
        }

        let mut cumulative_m = Vec::with_capacity(points.len());
        let mut acc = 0.0;
        cumulative_m.push(acc);
        for pair in points.windows(2) {
            acc += pair[0].distance_m(pair[1]);
            cumulative_m.push(acc);
        }

        Ok(Self {
            points,
            cumulative_m,
            total_distance_m: acc,
            total_duration_s: 0.0,
        })
    }

    /// Build a route from GeoJSON-ordered `[lng, lat]` pairs.
    pub fn from_lng_lat(coords: &[[f64; 2]]) -> RouteResult<Self> {
        Self::new(coords.iter().map(|&[lng, lat]| GeoPoint::new(lat, lng)).collect())
    }

    /// Record the routing provider's distance and duration.
    ///
    /// A non-positive or non-finite distance is ignored and the geometric
    /// length stays in effect.
    pub fn with_reported(mut self, distance_m: f64, duration_s: f64) -> Self {
        if distance_m.is_finite() && distance_m > 0.0 {
            self.total_distance_m = distance_m;
        }
        if duration_s.is_finite() && duration_s >= 0.0 {
            self.total_duration_s = duration_s;
        }
        self
    }

    /// `steps` equal segments on the straight line from `start` to `end`,
    /// with the duration estimated at [`FALLBACK_SPEED_MPS`].
    ///
    /// Used when no routing provider could answer.
    pub fn straight_line(start: GeoPoint, end: GeoPoint, steps: usize) -> RouteResult<Self> {
        let steps = steps.max(1);
        let points = (0..=steps)
            .map(|i| start.lerp(end, i as f64 / steps as f64))
            .collect();
        let route = Self::new(points)?;
        let length = route.length_m();
        Ok(route.with_reported(length, length / FALLBACK_SPEED_MPS))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[inline]
    pub fn cumulative_m(&self) -> &[f64] {
        &self.cumulative_m
    }

    /// Number of points (always ≥ 2).
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn first(&self) -> GeoPoint {
        self.points[0]
    }

    #[inline]
    pub fn last(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    /// Sum of great-circle segment lengths, in metres.
    #[inline]
    pub fn length_m(&self) -> f64 {
        self.cumulative_m[self.cumulative_m.len() - 1]
    }

    /// Distance used for progress accounting, in metres.
    #[inline]
    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Provider-estimated duration in seconds (0 if unknown).
    #[inline]
    pub fn total_duration_s(&self) -> f64 {
        self.total_duration_s
    }

    /// Bearing of the first segment with non-zero length (0 if none).
    pub fn initial_heading(&self) -> f64 {
        self.points
            .windows(2)
            .find(|w| w[0] != w[1])
            .map_or(0.0, |w| w[0].bearing_deg(w[1]))
    }

    /// Bearing of the last segment with non-zero length (0 if none).
    pub fn final_heading(&self) -> f64 {
        self.points
            .windows(2)
            .rev()
            .find(|w| w[0] != w[1])
            .map_or(0.0, |w| w[0].bearing_deg(w[1]))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// The point `fraction` of the way along the route.
    ///
    /// Interpolates linearly between the two points bracketing
    /// `fraction * length`.  The heading is the bearing from the
    /// interpolated point to the next route point; at `fraction = 1` it is
    /// the final segment's bearing.  `point_at(0)` and `point_at(1)` return
    /// the first and last points exactly.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `fraction` is outside `[0, 1]` or NaN.
    pub fn point_at(&self, fraction: f64) -> RouteResult<RoutePoint> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(RouteError::OutOfRange(fraction));
        }
        if fraction == 0.0 {
            return Ok(RoutePoint { position: self.first(), heading_deg: self.initial_heading() });
        }
        let length = self.length_m();
        let target = fraction * length;
        if fraction == 1.0 || length <= 0.0 || target >= length {
            return Ok(RoutePoint { position: self.last(), heading_deg: self.final_heading() });
        }

        // Segment `i` satisfies cumulative[i] <= target < cumulative[i + 1];
        // the strict upper bound skips zero-length segments.
        let i = self.cumulative_m[1..].partition_point(|&c| c <= target);
        let (a, b) = (self.points[i], self.points[i + 1]);
        let seg_len = self.cumulative_m[i + 1] - self.cumulative_m[i];
        let t = (target - self.cumulative_m[i]) / seg_len;

        let position = a.lerp(b, t);
        let heading_deg = if position == b {
            a.bearing_deg(b)
        } else {
            position.bearing_deg(b)
        };
        Ok(RoutePoint { position, heading_deg })
    }

    /// GeoJSON `LineString` with `[lng, lat]` positions, as stored in the
    /// `routes.geometry` column.
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self.points.iter().map(|p| [p.lng, p.lat]).collect();
        serde_json::json!({
            "type": "LineString",
            "coordinates": coordinates,
        })
    }
}
