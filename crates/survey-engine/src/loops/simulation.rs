//! Per-mission simulation worker.
//!
//! Each ACTIVE mission gets one worker that flies the waypoint route one
//! step per tick. Every step runs under the mission lock: the status check,
//! the drone update, the telemetry and the progress write happen together,
//! so a pause or abort recorded before the lock is taken always wins.
//!
//! Between ticks the worker waits on the mission's status signal as well as
//! the tick deadline, so a pause or abort wakes it immediately.

use std::sync::Arc;

use chrono::Utc;
use survey_core::rules::STEP_SECS;
use survey_core::spatial;
use survey_core::{
    Mission, MissionAction, MissionError, MissionStatus, PathPoint, SimulationRules, SurveyReport,
};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::persistence::MissionSlot;
use crate::scheduler::WorkerLease;
use crate::state::AppState;
use crate::telemetry::{PositionUpdate, ProgressUpdate, TelemetryPayload, Topic};

/// Why a worker stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerExit {
    /// Every waypoint reached; the mission is COMPLETED
    Completed,
    /// Mission paused; a resume starts a fresh worker from the persisted cursor
    Paused,
    /// Mission left ACTIVE for a terminal status set elsewhere
    Stopped(MissionStatus),
    /// Battery fell below the threshold; the mission is ABORTED
    BatteryExhausted { battery: f64 },
}

/// Position along the route: the segment leaving waypoint `segment`, and the
/// whole-second steps already flown on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SegmentCursor {
    segment: usize,
    step: u32,
}

pub struct MissionWorker {
    state: Arc<AppState>,
    slot: Arc<MissionSlot>,
    lease: WorkerLease,
    control: watch::Receiver<MissionStatus>,
    mission_id: String,
    drone_id: String,
    route: Vec<PathPoint>,
    speed_mps: f64,
    estimated_time_s: f64,
    cursor: SegmentCursor,
    battery: f64,
    rules: SimulationRules,
}

impl MissionWorker {
    /// Build a worker from the persisted mission.
    ///
    /// Returns `Ok(None)` when the mission is no longer ACTIVE; the lease is
    /// then released under the mission lock so a later resume can claim it.
    pub fn prepare(state: Arc<AppState>, lease: WorkerLease) -> Result<Option<Self>, MissionError> {
        let slot = state.missions().slot(&lease.mission_id)?;
        // Subscribe before reading status so no change is missed.
        let control = slot.subscribe();

        let worker = {
            let mission = slot.lock();
            if mission.status != MissionStatus::Active {
                state.workers().release(&lease);
                debug!(mission_id = %mission.id, status = %mission.status, "Mission not active, worker not started");
                return Ok(None);
            }

            let drone = state.fleet().get_drone(&mission.drone_id)?;
            Self {
                state: Arc::clone(&state),
                slot: Arc::clone(&slot),
                lease,
                control,
                mission_id: mission.id.clone(),
                drone_id: mission.drone_id.clone(),
                route: mission.waypoints.iter().map(|wp| wp.point()).collect(),
                speed_mps: mission.speed_mps,
                estimated_time_s: mission.estimated_time_s,
                cursor: SegmentCursor {
                    segment: mission.current_waypoint as usize,
                    step: mission.segment_step,
                },
                battery: drone.battery,
                rules: state.config().rules.clone(),
            }
        };
        Ok(Some(worker))
    }

    pub async fn run(mut self) -> Result<WorkerExit, MissionError> {
        info!(
            mission_id = %self.mission_id,
            drone_id = %self.drone_id,
            segment = self.cursor.segment,
            step = self.cursor.step,
            "Simulation worker started"
        );

        let tick = self.rules.tick();
        let mut deadline = Instant::now() + tick;

        loop {
            self.wait_for_tick(deadline).await;

            if let Some(exit) = self.advance()? {
                if matches!(exit, WorkerExit::Completed | WorkerExit::BatteryExhausted { .. }) {
                    self.state.publish_fleet_stats();
                }
                return Ok(exit);
            }
            deadline += tick;
        }
    }

    /// Sleep until `deadline`, waking early if the mission leaves ACTIVE.
    async fn wait_for_tick(&mut self, deadline: Instant) {
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return,
                changed = self.control.changed() => {
                    if changed.is_err() {
                        sleep_until(deadline).await;
                        return;
                    }
                    if *self.control.borrow_and_update() != MissionStatus::Active {
                        return;
                    }
                }
            }
        }
    }

    /// Fly one step. Returns the exit reason once the worker must stop.
    fn advance(&mut self) -> Result<Option<WorkerExit>, MissionError> {
        let slot = Arc::clone(&self.slot);
        let mut mission = slot.lock();

        match mission.status {
            MissionStatus::Active => {}
            MissionStatus::Paused => {
                self.state.workers().release(&self.lease);
                info!(mission_id = %self.mission_id, tick = mission.ticks, "Simulation worker paused");
                return Ok(Some(WorkerExit::Paused));
            }
            status => {
                self.state.workers().release(&self.lease);
                info!(mission_id = %self.mission_id, %status, "Simulation worker stopped");
                return Ok(Some(WorkerExit::Stopped(status)));
            }
        }

        let segments = self.route.len().saturating_sub(1);
        if self.cursor.segment >= segments {
            self.finish(&slot, &mut mission)?;
            return Ok(Some(WorkerExit::Completed));
        }

        let segment = self.cursor.segment;
        let from = self.route[segment];
        let to = self.route[segment + 1];
        let segment_m = spatial::distance(from.position(), to.position());
        let steps = self.rules.segment_steps(segment_m, self.speed_mps);
        let step = (self.cursor.step + 1).min(steps);
        let now = Utc::now();

        if self.cursor.step == 0 {
            if let Some(wp) = mission.waypoints.get_mut(segment) {
                wp.mark_reached(now);
            }
        }

        let position = spatial::interpolate(from, to, step as f64 / steps as f64);
        let before = self.battery;
        self.battery = self.rules.drain(before);

        let fleet = self.state.fleet();
        fleet.set_drone_position(&self.drone_id, position)?;
        fleet.set_drone_battery(&self.drone_id, self.battery)?;

        mission.ticks += 1;
        mission.actual_time_s += STEP_SECS;
        mission.battery_used += before - self.battery;

        self.state.publish(
            Topic::DronePosition,
            TelemetryPayload::Position(PositionUpdate {
                mission_id: self.mission_id.clone(),
                drone_id: self.drone_id.clone(),
                tick: mission.ticks,
                lon: position.lon,
                lat: position.lat,
                altitude_m: position.altitude_m,
                heading_deg: spatial::bearing(from.position(), to.position()),
                speed_mps: self.speed_mps,
                battery: self.battery,
                timestamp: now,
            }),
        );

        if self.rules.is_low(self.battery) {
            let battery = self.battery;
            warn!(mission_id = %self.mission_id, drone_id = %self.drone_id, battery, "Battery exhausted, aborting mission");
            let reason = MissionError::BatteryExhausted { battery }.to_string();
            self.state
                .transition_locked(&slot, &mut mission, MissionAction::Abort, Some(reason))?;
            return Ok(Some(WorkerExit::BatteryExhausted { battery }));
        }

        mission.distance_covered_m += segment_m / steps as f64;

        let progress = if step >= steps {
            if let Some(wp) = mission.waypoints.get_mut(segment + 1) {
                wp.mark_reached(now);
            }
            self.cursor = SegmentCursor {
                segment: segment + 1,
                step: 0,
            };
            (segment + 1) as f64 / segments as f64 * 100.0
        } else {
            self.cursor.step = step;
            (segment as f64 + step as f64 / steps as f64) / segments as f64 * 100.0
        };

        mission.progress = mission.progress.max(progress).min(100.0);
        mission.current_waypoint = self.cursor.segment as u32;
        mission.segment_step = self.cursor.step;
        self.publish_progress(&mission);

        if self.cursor.segment >= segments {
            self.finish(&slot, &mut mission)?;
            return Ok(Some(WorkerExit::Completed));
        }
        Ok(None)
    }

    /// Complete the mission and store its report.
    fn finish(&mut self, slot: &MissionSlot, mission: &mut Mission) -> Result<(), MissionError> {
        let last = self.route.len().saturating_sub(1);
        if let Some(wp) = mission.waypoints.get_mut(last) {
            wp.mark_reached(Utc::now());
        }
        mission.current_waypoint = last as u32;
        mission.segment_step = 0;

        // Routes with no segments never emitted a progress event.
        if mission.progress < 100.0 {
            mission.progress = 100.0;
            self.publish_progress(mission);
        }

        self.state
            .transition_locked(slot, mission, MissionAction::Complete, None)?;

        if let Some(report) = SurveyReport::from_mission(mission) {
            self.state.reports().insert_once(report);
        }
        info!(
            mission_id = %self.mission_id,
            distance_m = mission.distance_covered_m,
            ticks = mission.ticks,
            "Mission completed"
        );
        Ok(())
    }

    fn publish_progress(&self, mission: &Mission) {
        let remaining = (1.0 - mission.progress / 100.0).max(0.0);
        self.state.publish(
            Topic::MissionProgress,
            TelemetryPayload::Progress(ProgressUpdate {
                mission_id: self.mission_id.clone(),
                tick: mission.ticks,
                progress: mission.progress,
                current_waypoint: mission.current_waypoint,
                distance_covered_m: mission.distance_covered_m,
                eta_s: remaining * self.estimated_time_s,
                timestamp: Utc::now(),
            }),
        );
    }
}
