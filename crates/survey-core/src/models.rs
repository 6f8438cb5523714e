//! Core data models for survey missions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic point in decimal degrees.
///
/// Serialized as a `[lon, lat]` pair so a polygon reads as a plain array of pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lon, point.lat]
    }
}

/// Survey area boundary. The ring is implicitly closed; callers may pass it
/// open or closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub vertices: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    /// Build from `[lon, lat]` pairs.
    pub fn from_coords(coords: &[[f64; 2]]) -> Self {
        Self::new(coords.iter().copied().map(GeoPoint::from).collect())
    }

    /// Vertices with the first vertex repeated at the end if it was missing.
    pub fn closed_ring(&self) -> Vec<GeoPoint> {
        crate::spatial::close_ring(&self.vertices)
    }
}

/// A planned 3D position produced by the path planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
}

impl PathPoint {
    pub fn new(lon: f64, lat: f64, altitude_m: f64) -> Self {
        Self { lon, lat, altitude_m }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathPattern {
    /// Boustrophedon sweep of parallel lines
    Grid,
    /// Single ring inside the boundary
    Perimeter,
    /// Two grid passes concatenated
    Crosshatch,
}

/// A waypoint owned by a mission. Only `reached`/`reached_at` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub sequence: u32,
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub reached: bool,
    #[serde(default)]
    pub reached_at: Option<DateTime<Utc>>,
}

impl Waypoint {
    pub fn from_path(sequence: u32, point: PathPoint) -> Self {
        Self {
            sequence,
            lon: point.lon,
            lat: point.lat,
            altitude_m: point.altitude_m,
            reached: false,
            reached_at: None,
        }
    }

    pub fn point(&self) -> PathPoint {
        PathPoint::new(self.lon, self.lat, self.altitude_m)
    }

    /// Mark the waypoint reached. Returns false if it already was.
    pub fn mark_reached(&mut self, at: DateTime<Utc>) -> bool {
        if self.reached {
            return false;
        }
        self.reached = true;
        self.reached_at = Some(at);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    /// Created, waypoints planned, not yet flown
    Planned,
    /// Simulation worker is advancing the drone
    Active,
    /// Halted by operator, resumable
    Paused,
    /// All waypoints reached
    Completed,
    /// Stopped by operator or by the engine (battery, worker failure)
    Aborted,
    /// Unrecoverable error before the mission ever flew
    Failed,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Aborted => "ABORTED",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// A survey mission and the waypoint batch it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub drone_id: String,
    pub survey_area: Polygon,
    pub path_pattern: PathPattern,
    pub altitude_m: f64,
    pub speed_mps: f64,
    pub overlap_percent: f64,
    pub status: MissionStatus,
    pub waypoints: Vec<Waypoint>,
    pub total_waypoints: u32,
    /// Index of the waypoint the drone most recently reached (segment cursor)
    pub current_waypoint: u32,
    /// Whole-second steps already flown on the segment leaving `current_waypoint`
    #[serde(default)]
    pub segment_step: u32,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub distance_covered_m: f64,
    pub estimated_time_s: f64,
    /// Simulated flight time accumulated across all active periods
    #[serde(default)]
    pub actual_time_s: f64,
    /// Battery percentage consumed so far
    #[serde(default)]
    pub battery_used: f64,
    /// Simulation ticks executed; orders telemetry across pause/resume
    #[serde(default)]
    pub ticks: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Mission {
    /// Number of path segments between consecutive waypoints.
    pub fn segment_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    pub fn progress_snapshot(&self) -> MissionProgress {
        MissionProgress {
            mission_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            current_waypoint: self.current_waypoint,
            distance_covered_m: self.distance_covered_m,
        }
    }

    pub fn reached_waypoints(&self) -> usize {
        self.waypoints.iter().filter(|wp| wp.reached).count()
    }
}

/// Request to create a new mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMissionRequest {
    pub drone_id: String,
    pub survey_area: Polygon,
    pub path_pattern: PathPattern,
    pub altitude_m: f64,
    pub speed_mps: f64,
    pub overlap_percent: f64,
}

/// Progress view returned by `report_progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionProgress {
    pub mission_id: String,
    pub status: MissionStatus,
    pub progress: f64,
    pub current_waypoint: u32,
    pub distance_covered_m: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneStatus {
    /// Idle and ready for a mission
    #[default]
    Available,
    /// Flying a mission
    InMission,
    /// Grounded for service
    Maintenance,
    /// Not reachable
    Offline,
}

impl std::fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Available => "AVAILABLE",
            Self::InMission => "IN_MISSION",
            Self::Maintenance => "MAINTENANCE",
            Self::Offline => "OFFLINE",
        };
        f.write_str(label)
    }
}

/// Drone record owned by the fleet registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub status: DroneStatus,
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
    /// Battery percentage in `[0, 100]`
    pub battery: f64,
    pub last_update: DateTime<Utc>,
}

impl Drone {
    /// A fully charged, available drone parked at the origin.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: DroneStatus::Available,
            lon: 0.0,
            lat: 0.0,
            altitude_m: 0.0,
            battery: 100.0,
            last_update: Utc::now(),
        }
    }

    pub fn with_battery(mut self, battery: f64) -> Self {
        self.battery = battery.clamp(0.0, 100.0);
        self
    }

    pub fn with_status(mut self, status: DroneStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_serializes_as_lon_lat_pairs() {
        let polygon = Polygon::from_coords(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let json = serde_json::to_string(&polygon).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0],[5.0,6.0]]");

        let parsed: Polygon = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, polygon);
    }

    #[test]
    fn enums_use_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&DroneStatus::InMission).unwrap(),
            "\"IN_MISSION\""
        );
        assert_eq!(
            serde_json::to_string(&PathPattern::Crosshatch).unwrap(),
            "\"CROSSHATCH\""
        );
        assert_eq!(MissionStatus::Paused.to_string(), "PAUSED");
    }

    #[test]
    fn waypoint_is_marked_reached_once() {
        let mut wp = Waypoint::from_path(0, PathPoint::new(1.0, 2.0, 50.0));
        let first = Utc::now();
        assert!(wp.mark_reached(first));
        assert!(!wp.mark_reached(Utc::now()));
        assert_eq!(wp.reached_at, Some(first));
    }
}
