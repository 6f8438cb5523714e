//! Mission operations exposed to collaborators.

use std::sync::Arc;

use chrono::Utc;
use survey_core::spatial;
use survey_core::{
    generate_path_with_config, CreateMissionRequest, DroneTotals, Mission, MissionAction,
    MissionError, MissionProgress, MissionStatus, PathPattern, PathPoint, Polygon, SurveyReport,
    Waypoint,
};
use tracing::info;
use uuid::Uuid;

use crate::fleet::FleetStats;
use crate::scheduler::JobScheduler;
use crate::state::AppState;

pub struct MissionService {
    state: Arc<AppState>,
    scheduler: JobScheduler,
}

impl MissionService {
    pub fn new(state: Arc<AppState>) -> Self {
        let scheduler = JobScheduler::new(Arc::clone(&state));
        Self { state, scheduler }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Plan waypoints for a survey area. Empty when nothing can be flown.
    pub fn plan_path(
        &self,
        polygon: &Polygon,
        pattern: PathPattern,
        altitude_m: f64,
        overlap_percent: f64,
    ) -> Vec<PathPoint> {
        generate_path_with_config(
            polygon,
            pattern,
            altitude_m,
            overlap_percent,
            &self.state.config().planner,
        )
    }

    /// Validate, plan and store a mission with its waypoints.
    pub fn create_mission(&self, request: CreateMissionRequest) -> Result<Mission, MissionError> {
        validate(&request)?;
        self.state.fleet().get_drone(&request.drone_id)?;

        let path = self.plan_path(
            &request.survey_area,
            request.path_pattern,
            request.altitude_m,
            request.overlap_percent,
        );
        if path.is_empty() {
            return Err(MissionError::EmptyPath);
        }

        let waypoints: Vec<Waypoint> = path
            .iter()
            .enumerate()
            .map(|(i, point)| Waypoint::from_path(i as u32, *point))
            .collect();

        let mission = Mission {
            id: Uuid::new_v4().to_string(),
            drone_id: request.drone_id,
            survey_area: request.survey_area,
            path_pattern: request.path_pattern,
            altitude_m: request.altitude_m,
            speed_mps: request.speed_mps,
            overlap_percent: request.overlap_percent,
            status: MissionStatus::Planned,
            total_waypoints: waypoints.len() as u32,
            waypoints,
            current_waypoint: 0,
            segment_step: 0,
            progress: 0.0,
            distance_covered_m: 0.0,
            estimated_time_s: spatial::path_length(&path) / request.speed_mps,
            actual_time_s: 0.0,
            battery_used: 0.0,
            ticks: 0,
            start_time: None,
            end_time: None,
            status_reason: None,
            created_at: Utc::now(),
        };

        self.state.missions().insert(mission.clone())?;
        info!(
            mission_id = %mission.id,
            drone_id = %mission.drone_id,
            pattern = ?mission.path_pattern,
            waypoints = mission.total_waypoints,
            "Mission created"
        );
        Ok(mission)
    }

    /// PLANNED/PAUSED → ACTIVE, then hand the mission to a worker.
    pub fn start(&self, mission_id: &str) -> Result<Mission, MissionError> {
        let mission = self.state.transition(mission_id, MissionAction::Start, None)?;
        self.scheduler.enqueue(mission_id);
        Ok(mission)
    }

    pub fn pause(&self, mission_id: &str) -> Result<Mission, MissionError> {
        self.state.transition(mission_id, MissionAction::Pause, None)
    }

    pub fn resume(&self, mission_id: &str) -> Result<Mission, MissionError> {
        let mission = self.state.transition(mission_id, MissionAction::Resume, None)?;
        self.scheduler.enqueue(mission_id);
        Ok(mission)
    }

    pub fn abort(&self, mission_id: &str) -> Result<Mission, MissionError> {
        self.state.transition(mission_id, MissionAction::Abort, None)
    }

    /// Record an unrecoverable error for a mission that never flew.
    pub fn mark_failed(&self, mission_id: &str, reason: impl Into<String>) -> Result<Mission, MissionError> {
        self.state
            .transition(mission_id, MissionAction::Fail, Some(reason.into()))
    }

    pub fn report_progress(&self, mission_id: &str) -> Result<MissionProgress, MissionError> {
        self.state.missions().progress(mission_id)
    }

    pub fn mission(&self, mission_id: &str) -> Result<Mission, MissionError> {
        self.state.missions().get(mission_id)
    }

    pub fn missions(&self) -> Vec<Mission> {
        self.state.missions().list()
    }

    pub fn report(&self, mission_id: &str) -> Option<SurveyReport> {
        self.state.reports().get(mission_id)
    }

    pub fn fleet_stats(&self) -> FleetStats {
        self.state.fleet_stats()
    }

    pub fn drone_totals(&self) -> Vec<DroneTotals> {
        self.state.reports().drone_totals()
    }
}

fn validate(request: &CreateMissionRequest) -> Result<(), MissionError> {
    if !request.altitude_m.is_finite() || request.altitude_m <= 0.0 {
        return Err(MissionError::InvalidRequest(format!(
            "altitude must be positive, got {}",
            request.altitude_m
        )));
    }
    if !request.speed_mps.is_finite() || request.speed_mps <= 0.0 {
        return Err(MissionError::InvalidRequest(format!(
            "speed must be positive, got {}",
            request.speed_mps
        )));
    }
    if !(0.0..100.0).contains(&request.overlap_percent) {
        return Err(MissionError::InvalidRequest(format!(
            "overlap must be in [0, 100), got {}",
            request.overlap_percent
        )));
    }
    if request.survey_area.vertices.len() < 3 {
        return Err(MissionError::InvalidRequest(
            "survey area needs at least three vertices".to_string(),
        ));
    }
    if let Some(p) = request.survey_area.vertices.iter().find(|p| {
        !(-180.0..=180.0).contains(&p.lon) || !(-90.0..=90.0).contains(&p.lat)
    }) {
        return Err(MissionError::InvalidRequest(format!(
            "vertex ({}, {}) is outside lon [-180, 180] / lat [-90, 90]",
            p.lon, p.lat
        )));
    }
    // Collinear or zero-area rings fall through to the planner as EmptyPath.
    Ok(())
}
