//! Survey reports for completed missions.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use survey_core::{summarize_by_drone, DroneTotals, SurveyReport};

#[derive(Default)]
pub struct ReportStore {
    reports: DashMap<String, SurveyReport>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report unless one exists for the mission. Returns whether it was stored.
    pub fn insert_once(&self, report: SurveyReport) -> bool {
        match self.reports.entry(report.mission_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(report);
                true
            }
        }
    }

    pub fn get(&self, mission_id: &str) -> Option<SurveyReport> {
        self.reports.get(mission_id).map(|r| r.value().clone())
    }

    pub fn list(&self) -> Vec<SurveyReport> {
        self.reports.iter().map(|r| r.value().clone()).collect()
    }

    pub fn drone_totals(&self) -> Vec<DroneTotals> {
        summarize_by_drone(&self.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(mission_id: &str, distance_m: f64) -> SurveyReport {
        SurveyReport {
            mission_id: mission_id.to_string(),
            drone_id: "D1".to_string(),
            duration_s: 10.0,
            distance_m,
            coverage_area_m2: 100.0,
            waypoints_reached: 4,
            total_waypoints: 4,
            completion_rate: 100.0,
            battery_used: 1.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn second_report_for_mission_is_ignored() {
        let store = ReportStore::new();
        assert!(store.insert_once(report("M1", 100.0)));
        assert!(!store.insert_once(report("M1", 999.0)));
        assert_eq!(store.get("M1").unwrap().distance_m, 100.0);
    }

    #[test]
    fn totals_fold_stored_reports() {
        let store = ReportStore::new();
        store.insert_once(report("M1", 100.0));
        store.insert_once(report("M2", 50.0));
        let totals = store.drone_totals();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].missions, 2);
        assert!((totals[0].total_distance_m - 150.0).abs() < 1e-9);
    }
}
