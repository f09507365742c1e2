//! Decoding routes handed over by a routing provider.
//!
//! Providers answer with a GeoJSON geometry plus total distance and
//! duration:
//!
//! ```json
//! {
//!   "geometry": { "type": "LineString", "coordinates": [[-7.62, 33.55], [-7.64, 33.54]] },
//!   "distance": 2150.4,
//!   "duration": 312.0
//! }
//! ```
//!
//! The JSON is decoded once into a [`RouteGeometry`]; the simulator never
//! touches the raw document again.

use serde::{Deserialize, Serialize};

use crate::{RouteError, RouteGeometry, RouteResult};

/// A GeoJSON geometry object.  Only `LineString` is accepted as a route;
/// positions are `[lng, lat]` with an optional trailing altitude.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind:        String,
    pub coordinates: serde_json::Value,
}

impl LineString {
    /// Decode into `[lng, lat]` pairs.
    pub fn positions(&self) -> RouteResult<Vec<[f64; 2]>> {
        if self.kind != "LineString" {
            return Err(RouteError::UnsupportedGeometry(self.kind.clone()));
        }
        let raw: Vec<Vec<f64>> = serde_json::from_value(self.coordinates.clone())?;
        raw.into_iter()
            .enumerate()
            .map(|(i, pos)| match pos.as_slice() {
                [lng, lat, ..] => Ok([*lng, *lat]),
                _ => Err(RouteError::InvalidGeometry(format!(
                    "position {i} has {} components",
                    pos.len()
                ))),
            })
            .collect()
    }
}

/// One route as returned by a routing provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutePlan {
    pub geometry: LineString,
    /// Metres.
    #[serde(default)]
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
}

impl RoutePlan {
    pub fn from_json_str(json: &str) -> RouteResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and convert into an immutable [`RouteGeometry`].
    pub fn into_geometry(self) -> RouteResult<RouteGeometry> {
        let coords = self.geometry.positions()?;
        Ok(RouteGeometry::from_lng_lat(&coords)?.with_reported(self.distance, self.duration))
    }
}
