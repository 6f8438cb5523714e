//! Survey mission engine: scheduling, per-mission simulation and telemetry.

pub mod backoff;
pub mod config;
pub mod fleet;
pub mod loops;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use fleet::{FleetRegistry, FleetStats, InMemoryFleet};
pub use service::MissionService;
pub use state::AppState;
pub use telemetry::{BroadcastSink, TelemetryMessage, TelemetryPayload, TelemetrySink, Topic};
