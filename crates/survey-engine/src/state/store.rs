//! Application state and the mission transition path.

use std::sync::Arc;

use chrono::Utc;
use survey_core::{DroneStatus, Mission, MissionAction, MissionError, MissionStatus};
use tracing::{info, warn};

use crate::config::Config;
use crate::fleet::{FleetRegistry, FleetStats};
use crate::persistence::{MissionSlot, MissionStore, ReportStore};
use crate::scheduler::WorkerRegistry;
use crate::telemetry::{StatusUpdate, TelemetryPayload, TelemetrySink, Topic};

const RELEASE_ATTEMPTS: u32 = 2;

/// Application state shared by the service, the scheduler and every worker.
pub struct AppState {
    missions: MissionStore,
    reports: ReportStore,
    fleet: Arc<dyn FleetRegistry>,
    telemetry: Arc<dyn TelemetrySink>,
    workers: WorkerRegistry,
    config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        fleet: Arc<dyn FleetRegistry>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            missions: MissionStore::new(),
            reports: ReportStore::new(),
            fleet,
            telemetry,
            workers: WorkerRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn missions(&self) -> &MissionStore {
        &self.missions
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn fleet(&self) -> &dyn FleetRegistry {
        self.fleet.as_ref()
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    pub fn publish(&self, topic: Topic, payload: TelemetryPayload) {
        self.telemetry.publish(topic, payload);
    }

    /// Drone counts plus active/paused mission counts.
    ///
    /// Mission statuses come from the status signals, so no mission lock is taken.
    pub fn fleet_stats(&self) -> FleetStats {
        let mut stats = FleetStats::from_drones(&self.fleet.list_drones());
        for slot in self.missions.slots() {
            match slot.status() {
                MissionStatus::Active => stats.active_missions += 1,
                MissionStatus::Paused => stats.paused_missions += 1,
                _ => {}
            }
        }
        stats
    }

    pub fn publish_fleet_stats(&self) {
        self.publish(Topic::FleetStats, TelemetryPayload::Fleet(self.fleet_stats()));
    }

    /// Apply `action` to a mission whose lock the caller holds.
    ///
    /// Drone side effects happen before the status is written, so a rejected
    /// start leaves both the mission and the drone untouched. Releasing the
    /// drone on abort/complete never fails the transition; a drone that stays
    /// claimed is recorded in the status reason.
    pub(crate) fn transition_locked(
        &self,
        slot: &MissionSlot,
        mission: &mut Mission,
        action: MissionAction,
        reason: Option<String>,
    ) -> Result<(), MissionError> {
        let from = mission.status;
        let to = from.apply(action)?;
        let now = Utc::now();

        let mut reason = reason;
        match action {
            MissionAction::Start => {
                if from == MissionStatus::Planned {
                    // Availability check and claim happen under the fleet entry lock.
                    self.fleet.claim_drone(&mission.drone_id)?;
                } else {
                    // A paused mission still holds its drone.
                    self.fleet.get_drone(&mission.drone_id)?;
                    self.fleet
                        .set_drone_status(&mission.drone_id, DroneStatus::InMission)?;
                }
                if mission.start_time.is_none() {
                    mission.start_time = Some(now);
                }
            }
            MissionAction::Abort | MissionAction::Complete => {
                // A PLANNED mission never claimed its drone.
                if matches!(from, MissionStatus::Active | MissionStatus::Paused) {
                    if let Some(note) = self.release_drone(mission) {
                        reason = Some(match reason {
                            Some(r) => format!("{r}; {note}"),
                            None => note,
                        });
                    }
                }
                mission.end_time = Some(now);
            }
            MissionAction::Fail => mission.end_time = Some(now),
            MissionAction::Pause | MissionAction::Resume => {}
        }

        mission.status = to;
        mission.status_reason = reason.clone();
        slot.publish_status(to);

        self.publish(
            Topic::MissionStatus,
            TelemetryPayload::Status(StatusUpdate {
                mission_id: mission.id.clone(),
                drone_id: mission.drone_id.clone(),
                status: to,
                reason,
                timestamp: now,
            }),
        );

        info!(
            mission_id = %mission.id,
            drone_id = %mission.drone_id,
            %from,
            %to,
            "Mission {}",
            action
        );
        Ok(())
    }

    /// Set the mission's drone back to AVAILABLE, retrying once.
    ///
    /// Returns a note for the status reason when the drone stays claimed.
    fn release_drone(&self, mission: &Mission) -> Option<String> {
        let mut last_err = None;
        for attempt in 1..=RELEASE_ATTEMPTS {
            match self
                .fleet
                .set_drone_status(&mission.drone_id, DroneStatus::Available)
            {
                Ok(()) => return None,
                Err(err) => {
                    warn!(
                        mission_id = %mission.id,
                        drone_id = %mission.drone_id,
                        attempt,
                        error = %err,
                        "Failed to release drone"
                    );
                    last_err = Some(err);
                }
            }
        }
        last_err.map(|err| format!("drone {} not released: {}", mission.drone_id, err))
    }

    /// Lock, transition and snapshot one mission, then refresh fleet stats.
    pub fn transition(
        &self,
        mission_id: &str,
        action: MissionAction,
        reason: Option<String>,
    ) -> Result<Mission, MissionError> {
        let slot = self.missions.slot(mission_id)?;
        let mission = {
            let mut guard = slot.lock();
            self.transition_locked(&slot, &mut guard, action, reason)?;
            guard.clone()
        };
        self.publish_fleet_stats();
        Ok(mission)
    }

    /// Abort a mission whose worker failed, releasing its drone.
    pub fn recover_worker_failure(&self, mission_id: &str, err: &MissionError) {
        let slot = match self.missions.slot(mission_id) {
            Ok(slot) => slot,
            Err(lookup) => {
                warn!(mission_id, error = %lookup, "Worker failed for unknown mission");
                return;
            }
        };

        let aborted = {
            let mut guard = slot.lock();
            if guard.status.can_apply(MissionAction::Abort) {
                self.transition_locked(&slot, &mut guard, MissionAction::Abort, Some(err.to_string()))
                    .is_ok()
            } else {
                false
            }
        };

        if aborted {
            warn!(mission_id, error = %err, "Mission aborted after worker failure");
            self.publish_fleet_stats();
        } else {
            info!(mission_id, error = %err, "Worker failed after mission left ACTIVE");
        }
    }
}
