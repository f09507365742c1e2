//! Strongly typed vehicle identifier.
//!
//! Vehicle ids are UUIDs assigned upstream when a vehicle record is created.
//! The wrapper is `Copy + Ord + Hash` so it can key both hash maps and the
//! ordered vehicle map used for deterministic apply order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one simulated vehicle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub Uuid);

impl VehicleId {
    /// A fresh random (v4) id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an id from a raw 128-bit value.  Handy for stable ids in tests.
    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    /// Numeric form of the id, used to partition vehicles across shards.
    #[inline]
    pub fn as_u128(self) -> u128 {
        self.0.as_u128()
    }

    /// First eight hex digits: enough to tell vehicles apart in logs.
    pub fn short(self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for VehicleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(VehicleId)
    }
}
