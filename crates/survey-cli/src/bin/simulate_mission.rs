//! CLI tool to fly a survey mission in-process.
//!
//! Registers one drone, creates and starts a mission, then prints every
//! telemetry message as `<topic> <json>` until the mission ends.

use std::sync::Arc;

use clap::Parser;
use survey_cli::input::{parse_polygon, PatternArg};
use survey_core::{CreateMissionRequest, Drone};
use survey_engine::{
    AppState, BroadcastSink, Config, InMemoryFleet, MissionService, TelemetryPayload,
};
use tokio::sync::broadcast::error::RecvError;

/// Simulate a survey mission and stream its telemetry
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Survey area as a JSON array of [lon, lat] pairs, or @file
    #[arg(long)]
    polygon: String,

    /// Path pattern
    #[arg(long, value_enum, default_value_t = PatternArg::Grid)]
    pattern: PatternArg,

    /// Altitude in meters
    #[arg(long, default_value_t = 50.0)]
    altitude: f64,

    /// Image overlap in percent, [0, 100)
    #[arg(long, default_value_t = 70.0)]
    overlap: f64,

    /// Cruise speed in m/s
    #[arg(long, default_value_t = 10.0)]
    speed: f64,

    /// Drone identifier
    #[arg(long, default_value = "SURVEY001")]
    drone: String,

    /// Starting battery percentage
    #[arg(long, default_value_t = 100.0)]
    battery: f64,

    /// Tick length in milliseconds (overrides SURVEY_TICK_MS)
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    survey_cli::init_tracing("survey_engine=info")?;
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(tick_ms) = args.tick_ms {
        config.rules.tick_ms = tick_ms;
    }

    let fleet = Arc::new(InMemoryFleet::new());
    fleet.register(Drone::new(&args.drone, &args.drone).with_battery(args.battery));
    let sink = Arc::new(BroadcastSink::new(config.telemetry_capacity));
    let mut telemetry = sink.subscribe();

    let service = MissionService::new(Arc::new(AppState::new(config, fleet, sink)));

    let mission = service.create_mission(CreateMissionRequest {
        drone_id: args.drone.clone(),
        survey_area: parse_polygon(&args.polygon)?,
        path_pattern: args.pattern.into(),
        altitude_m: args.altitude,
        speed_mps: args.speed,
        overlap_percent: args.overlap,
    })?;
    tracing::info!(
        mission_id = %mission.id,
        waypoints = mission.total_waypoints,
        estimated_s = mission.estimated_time_s,
        "Starting survey"
    );
    service.start(&mission.id)?;

    loop {
        let msg = match telemetry.recv().await {
            Ok(msg) => msg,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Telemetry output lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        println!("{} {}", msg.topic, msg.to_json()?);

        if let TelemetryPayload::Status(status) = &msg.payload {
            if status.mission_id == mission.id && status.status.is_terminal() {
                break;
            }
        }
    }

    let done = service.mission(&mission.id)?;
    println!(
        "mission {} {} progress={:.1}% distance={:.1}m",
        done.id, done.status, done.progress, done.distance_covered_m
    );
    if let Some(report) = service.report(&mission.id) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
