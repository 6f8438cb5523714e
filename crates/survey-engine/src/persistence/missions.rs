//! Mission records and their status signal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use survey_core::{Mission, MissionError, MissionProgress, MissionStatus};
use tokio::sync::watch;

/// One stored mission.
///
/// The mutex is the serialization point between the simulation worker and
/// external control operations. The watch channel mirrors the stored status
/// and is only written while the mutex is held.
pub struct MissionSlot {
    mission: Mutex<Mission>,
    status_tx: watch::Sender<MissionStatus>,
}

impl MissionSlot {
    fn new(mission: Mission) -> Self {
        let (status_tx, _rx) = watch::channel(mission.status);
        Self {
            mission: Mutex::new(mission),
            status_tx,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Mission> {
        self.mission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receiver that observes every status change of this mission.
    pub fn subscribe(&self) -> watch::Receiver<MissionStatus> {
        self.status_tx.subscribe()
    }

    /// Mirror a status already written to the locked record.
    pub(crate) fn publish_status(&self, status: MissionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Last published status, without taking the mission lock.
    pub fn status(&self) -> MissionStatus {
        *self.status_tx.borrow()
    }

    pub fn snapshot(&self) -> Mission {
        self.lock().clone()
    }
}

#[derive(Default)]
pub struct MissionStore {
    slots: DashMap<String, Arc<MissionSlot>>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new mission together with its waypoints.
    pub fn insert(&self, mission: Mission) -> Result<Arc<MissionSlot>, MissionError> {
        match self.slots.entry(mission.id.clone()) {
            Entry::Occupied(_) => Err(MissionError::InvalidRequest(format!(
                "mission {} already exists",
                mission.id
            ))),
            Entry::Vacant(entry) => {
                let slot = Arc::new(MissionSlot::new(mission));
                entry.insert(Arc::clone(&slot));
                Ok(slot)
            }
        }
    }

    pub fn slot(&self, mission_id: &str) -> Result<Arc<MissionSlot>, MissionError> {
        self.slots
            .get(mission_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| MissionError::mission_not_found(mission_id))
    }

    pub fn get(&self, mission_id: &str) -> Result<Mission, MissionError> {
        Ok(self.slot(mission_id)?.snapshot())
    }

    pub fn progress(&self, mission_id: &str) -> Result<MissionProgress, MissionError> {
        Ok(self.slot(mission_id)?.lock().progress_snapshot())
    }

    /// Handles to every slot. Map shards are released before any mission lock
    /// is taken by the caller.
    pub fn slots(&self) -> Vec<Arc<MissionSlot>> {
        self.slots.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub fn list(&self) -> Vec<Mission> {
        self.slots().iter().map(|slot| slot.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use survey_core::{PathPattern, Polygon};

    fn mission(id: &str) -> Mission {
        Mission {
            id: id.to_string(),
            drone_id: "D1".to_string(),
            survey_area: Polygon::from_coords(&[[0.0, 0.0], [0.001, 0.0], [0.001, 0.001]]),
            path_pattern: PathPattern::Grid,
            altitude_m: 50.0,
            speed_mps: 10.0,
            overlap_percent: 70.0,
            status: MissionStatus::Planned,
            waypoints: Vec::new(),
            total_waypoints: 0,
            current_waypoint: 0,
            segment_step: 0,
            progress: 0.0,
            distance_covered_m: 0.0,
            estimated_time_s: 0.0,
            actual_time_s: 0.0,
            battery_used: 0.0,
            ticks: 0,
            start_time: None,
            end_time: None,
            status_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = MissionStore::new();
        store.insert(mission("M1")).unwrap();
        assert!(matches!(
            store.insert(mission("M1")),
            Err(MissionError::InvalidRequest(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_mission_is_not_found() {
        let store = MissionStore::new();
        assert_eq!(
            store.get("nope").unwrap_err(),
            MissionError::mission_not_found("nope")
        );
    }

    #[test]
    fn status_signal_follows_published_status() {
        let store = MissionStore::new();
        let slot = store.insert(mission("M1")).unwrap();
        let rx = slot.subscribe();

        {
            let mut guard = slot.lock();
            guard.status = MissionStatus::Active;
            slot.publish_status(guard.status);
        }

        assert_eq!(slot.status(), MissionStatus::Active);
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.progress("M1").unwrap().status, MissionStatus::Active);
    }
}
