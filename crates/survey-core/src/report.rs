//! Survey reports for completed missions and per-drone aggregates.

use crate::models::{Mission, MissionStatus};
use crate::spatial;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable summary of a COMPLETED mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    pub mission_id: String,
    pub drone_id: String,
    pub duration_s: f64,
    pub distance_m: f64,
    /// Area of the survey polygon in square meters
    pub coverage_area_m2: f64,
    pub waypoints_reached: u32,
    pub total_waypoints: u32,
    /// Reached waypoints as a percentage of planned waypoints
    pub completion_rate: f64,
    pub battery_used: f64,
    pub created_at: DateTime<Utc>,
}

impl SurveyReport {
    /// Build the report for a completed mission; `None` for any other status.
    pub fn from_mission(mission: &Mission) -> Option<Self> {
        if mission.status != MissionStatus::Completed {
            return None;
        }

        let reached = mission.reached_waypoints() as u32;
        let completion_rate = if mission.total_waypoints == 0 {
            0.0
        } else {
            reached as f64 / mission.total_waypoints as f64 * 100.0
        };

        Some(Self {
            mission_id: mission.id.clone(),
            drone_id: mission.drone_id.clone(),
            duration_s: mission.actual_time_s,
            distance_m: mission.distance_covered_m,
            coverage_area_m2: spatial::area(&mission.survey_area.vertices),
            waypoints_reached: reached,
            total_waypoints: mission.total_waypoints,
            completion_rate,
            battery_used: mission.battery_used,
            created_at: Utc::now(),
        })
    }
}

/// Totals for one drone across its completed missions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneTotals {
    pub drone_id: String,
    pub missions: u32,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub total_area_m2: f64,
    pub total_battery_used: f64,
    pub mean_completion_rate: f64,
}

/// Fold reports into per-drone totals, ordered by drone id.
pub fn summarize_by_drone<'a>(reports: impl IntoIterator<Item = &'a SurveyReport>) -> Vec<DroneTotals> {
    let mut by_drone: BTreeMap<&str, DroneTotals> = BTreeMap::new();

    for report in reports {
        let totals = by_drone
            .entry(report.drone_id.as_str())
            .or_insert_with(|| DroneTotals {
                drone_id: report.drone_id.clone(),
                ..DroneTotals::default()
            });
        totals.missions += 1;
        totals.total_distance_m += report.distance_m;
        totals.total_duration_s += report.duration_s;
        totals.total_area_m2 += report.coverage_area_m2;
        totals.total_battery_used += report.battery_used;
        // Running mean keeps a single pass over the reports.
        totals.mean_completion_rate +=
            (report.completion_rate - totals.mean_completion_rate) / totals.missions as f64;
    }

    by_drone.into_values().collect()
}
