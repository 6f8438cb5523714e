//! Mission state machine.
//!
//! ```text
//! PLANNED ──start──▶ ACTIVE ◀──resume/start── PAUSED
//!    │                 │  ──pause──────────────▶ │
//!    │                 ├──complete──▶ COMPLETED  │
//!    └──abort──────────┴──abort─────▶ ABORTED ◀──┘
//! PLANNED ──fail──▶ FAILED
//! ```

use crate::error::MissionError;
use crate::models::{Drone, DroneStatus, MissionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionAction {
    Start,
    Pause,
    Resume,
    Abort,
    /// Engine-driven: every waypoint reached
    Complete,
    /// Planner or infrastructure error before the mission flew
    Fail,
}

impl std::fmt::Display for MissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Abort => "abort",
            Self::Complete => "complete",
            Self::Fail => "fail",
        };
        f.write_str(label)
    }
}

impl MissionStatus {
    /// Status reached by applying `action`, or `InvalidTransition`.
    pub fn apply(self, action: MissionAction) -> Result<MissionStatus, MissionError> {
        use MissionAction::*;
        use MissionStatus::*;

        let next = match (self, action) {
            (Planned | Paused, Start) => Active,
            (Active, Pause) => Paused,
            (Paused, Resume) => Active,
            (Planned | Active | Paused, Abort) => Aborted,
            (Active, Complete) => Completed,
            (Planned, Fail) => Failed,
            (from, action) => return Err(MissionError::InvalidTransition { from, action }),
        };
        Ok(next)
    }

    pub fn can_apply(self, action: MissionAction) -> bool {
        self.apply(action).is_ok()
    }
}

/// Drone precondition for `start`.
///
/// A fresh mission needs an AVAILABLE drone; a paused mission already holds
/// its drone, so only existence (checked by the caller's lookup) matters.
pub fn ensure_drone_ready(from: MissionStatus, drone: &Drone) -> Result<(), MissionError> {
    if from == MissionStatus::Planned && drone.status != DroneStatus::Available {
        return Err(MissionError::DroneUnavailable {
            drone_id: drone.id.clone(),
            status: drone.status,
        });
    }
    Ok(())
}
