//! Vehicle lifecycle status shared by the simulator and the sinks.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Where a vehicle is in its route lifecycle.
///
/// `Finished` is terminal.  `Idle` vehicles keep their progress until they
/// are resumed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Moving,
    Finished,
    Idle,
}

impl VehicleStatus {
    /// `true` for the terminal status.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, VehicleStatus::Finished)
    }

    /// Column value used by the persistent store.
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleStatus::Moving   => "moving",
            VehicleStatus::Finished => "finished",
            VehicleStatus::Idle     => "idle",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moving"   => Ok(VehicleStatus::Moving),
            "finished" => Ok(VehicleStatus::Finished),
            "idle"     => Ok(VehicleStatus::Idle),
            other      => Err(CoreError::UnknownStatus(other.to_owned())),
        }
    }
}
