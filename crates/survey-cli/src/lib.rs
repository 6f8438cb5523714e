//! Survey CLI - command line tools for survey missions.
//!
//! Binaries:
//! - plan_path: print the planned waypoints for a survey area
//! - simulate_mission: fly a mission in-process and stream its telemetry

pub mod input;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber, filtered by `RUST_LOG` plus `default_directive`.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .try_init()?;
    Ok(())
}
