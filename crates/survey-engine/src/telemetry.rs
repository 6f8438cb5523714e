//! Telemetry sink seam and the broadcast-backed implementation.
//!
//! Publishing is fire-and-forget: no subscriber, a lagging subscriber or a
//! closed channel never blocks or fails the publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use survey_core::MissionStatus;
use tokio::sync::broadcast;

use crate::fleet::FleetStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "drone:position")]
    DronePosition,
    #[serde(rename = "mission:progress")]
    MissionProgress,
    #[serde(rename = "mission:status")]
    MissionStatus,
    #[serde(rename = "fleet:stats")]
    FleetStats,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DronePosition => "drone:position",
            Self::MissionProgress => "mission:progress",
            Self::MissionStatus => "mission:status",
            Self::FleetStats => "fleet:stats",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub mission_id: String,
    pub drone_id: String,
    pub tick: u64,
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub battery: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub mission_id: String,
    pub tick: u64,
    pub progress: f64,
    pub current_waypoint: u32,
    pub distance_covered_m: f64,
    /// Estimated seconds remaining
    pub eta_s: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub mission_id: String,
    pub drone_id: String,
    pub status: MissionStatus,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryPayload {
    Position(PositionUpdate),
    Progress(ProgressUpdate),
    Status(StatusUpdate),
    Fleet(FleetStats),
}

impl TelemetryPayload {
    pub fn mission_id(&self) -> Option<&str> {
        match self {
            Self::Position(p) => Some(&p.mission_id),
            Self::Progress(p) => Some(&p.mission_id),
            Self::Status(s) => Some(&s.mission_id),
            Self::Fleet(_) => None,
        }
    }
}

/// A message as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub topic: Topic,
    pub payload: TelemetryPayload,
}

impl TelemetryMessage {
    /// JSON text of the payload, for transports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

pub trait TelemetrySink: Send + Sync {
    fn publish(&self, topic: Topic, payload: TelemetryPayload);
}

/// Fan-out sink over a `tokio::sync::broadcast` channel.
pub struct BroadcastSink {
    tx: broadcast::Sender<TelemetryMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.tx.subscribe()
    }
}

impl TelemetrySink for BroadcastSink {
    fn publish(&self, topic: Topic, payload: TelemetryPayload) {
        // No receivers is fine; telemetry is at-most-once.
        let _ = self.tx.send(TelemetryMessage { topic, payload });
    }
}
