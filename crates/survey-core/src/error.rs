//! Error kinds surfaced by mission planning and execution.

use crate::lifecycle::MissionAction;
use crate::models::{DroneStatus, MissionStatus};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Mission,
    Drone,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mission => f.write_str("mission"),
            Self::Drone => f.write_str("drone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("cannot {action} a mission in status {from}")]
    InvalidTransition {
        from: MissionStatus,
        action: MissionAction,
    },

    #[error("drone {drone_id} is not available (status {status})")]
    DroneUnavailable {
        drone_id: String,
        status: DroneStatus,
    },

    #[error("no waypoints could be generated for the survey area")]
    EmptyPath,

    #[error("battery exhausted at {battery:.1}%")]
    BatteryExhausted { battery: f64 },

    #[error("simulation worker failed: {0}")]
    WorkerFailure(String),

    #[error("invalid mission request: {0}")]
    InvalidRequest(String),
}

impl MissionError {
    pub fn mission_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Mission,
            id: id.into(),
        }
    }

    pub fn drone_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Drone,
            id: id.into(),
        }
    }

    /// Failures worth retrying when handing a mission to a worker.
    ///
    /// A missing drone may still be registering; collaborator hiccups surface
    /// as `WorkerFailure`. Everything else is a permanent rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound {
                entity: Entity::Drone,
                ..
            } | Self::WorkerFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = MissionError::InvalidTransition {
            from: MissionStatus::Completed,
            action: MissionAction::Pause,
        };
        assert_eq!(err.to_string(), "cannot pause a mission in status COMPLETED");
        assert_eq!(
            MissionError::drone_not_found("D1").to_string(),
            "drone not found: D1"
        );
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(MissionError::drone_not_found("D1").is_retryable());
        assert!(MissionError::WorkerFailure("boom".into()).is_retryable());
        assert!(!MissionError::mission_not_found("M1").is_retryable());
        assert!(!MissionError::EmptyPath.is_retryable());
    }
}
