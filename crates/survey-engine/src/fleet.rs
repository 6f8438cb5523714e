//! Fleet registry seam.
//!
//! The engine never owns drones; it calls into the registry each tick to
//! move them, drain their battery and flip their status.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use survey_core::{ensure_drone_ready, Drone, DroneStatus, MissionError, MissionStatus, PathPoint};

pub trait FleetRegistry: Send + Sync {
    fn get_drone(&self, drone_id: &str) -> Result<Drone, MissionError>;
    /// Atomically move an AVAILABLE drone to IN_MISSION, or fail with
    /// `DroneUnavailable` leaving it untouched.
    fn claim_drone(&self, drone_id: &str) -> Result<Drone, MissionError>;
    fn set_drone_status(&self, drone_id: &str, status: DroneStatus) -> Result<(), MissionError>;
    fn set_drone_position(&self, drone_id: &str, position: PathPoint) -> Result<(), MissionError>;
    fn set_drone_battery(&self, drone_id: &str, battery: f64) -> Result<(), MissionError>;
    fn list_drones(&self) -> Vec<Drone>;
}

/// In-memory fleet keyed by drone id.
#[derive(Default)]
pub struct InMemoryFleet {
    drones: DashMap<String, Drone>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a drone.
    pub fn register(&self, drone: Drone) {
        self.drones.insert(drone.id.clone(), drone);
    }

    fn update(&self, drone_id: &str, f: impl FnOnce(&mut Drone)) -> Result<(), MissionError> {
        let mut drone = self
            .drones
            .get_mut(drone_id)
            .ok_or_else(|| MissionError::drone_not_found(drone_id))?;
        f(&mut drone);
        drone.last_update = Utc::now();
        Ok(())
    }
}

impl FleetRegistry for InMemoryFleet {
    fn get_drone(&self, drone_id: &str) -> Result<Drone, MissionError> {
        self.drones
            .get(drone_id)
            .map(|d| d.value().clone())
            .ok_or_else(|| MissionError::drone_not_found(drone_id))
    }

    fn claim_drone(&self, drone_id: &str) -> Result<Drone, MissionError> {
        // The entry guard holds the shard lock across check and write.
        let mut drone = self
            .drones
            .get_mut(drone_id)
            .ok_or_else(|| MissionError::drone_not_found(drone_id))?;
        ensure_drone_ready(MissionStatus::Planned, &drone)?;
        drone.status = DroneStatus::InMission;
        drone.last_update = Utc::now();
        Ok(drone.clone())
    }

    fn set_drone_status(&self, drone_id: &str, status: DroneStatus) -> Result<(), MissionError> {
        self.update(drone_id, |d| d.status = status)
    }

    fn set_drone_position(&self, drone_id: &str, position: PathPoint) -> Result<(), MissionError> {
        self.update(drone_id, |d| {
            d.lon = position.lon;
            d.lat = position.lat;
            d.altitude_m = position.altitude_m;
        })
    }

    fn set_drone_battery(&self, drone_id: &str, battery: f64) -> Result<(), MissionError> {
        self.update(drone_id, |d| d.battery = battery.clamp(0.0, 100.0))
    }

    fn list_drones(&self) -> Vec<Drone> {
        self.drones.iter().map(|r| r.value().clone()).collect()
    }
}

/// Fleet-wide counters published on `fleet:stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_drones: usize,
    pub available: usize,
    pub in_mission: usize,
    pub maintenance: usize,
    pub offline: usize,
    pub active_missions: usize,
    pub paused_missions: usize,
}

impl FleetStats {
    pub fn from_drones(drones: &[Drone]) -> Self {
        drones.iter().fold(
            Self {
                total_drones: drones.len(),
                ..Self::default()
            },
            |mut stats, drone| {
                match drone.status {
                    DroneStatus::Available => stats.available += 1,
                    DroneStatus::InMission => stats.in_mission += 1,
                    DroneStatus::Maintenance => stats.maintenance += 1,
                    DroneStatus::Offline => stats.offline += 1,
                }
                stats
            },
        )
    }
}
