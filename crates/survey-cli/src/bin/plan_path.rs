//! CLI tool to plan a survey path and print its waypoints as JSON.

use clap::Parser;
use survey_cli::input::{parse_polygon, PatternArg};
use survey_core::spatial::path_length;
use survey_core::{generate_path_with_config, CrosshatchMode, PlannerConfig};

/// Plan survey waypoints for a polygon
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

    /// Inward margin for the perimeter pattern in meters
    #[arg(long, default_value_t = 10.0)]
    margin: f64,

    /// Repeat the same sweep for the crosshatch second pass instead of rotating it
    #[arg(long)]
    repeat_crosshatch: bool,
}

fn main() -> anyhow::Result<()> {
    survey_cli::init_tracing("plan_path=info")?;
    let args = Args::parse();
    let polygon = parse_polygon(&args.polygon)?;

    let config = PlannerConfig {
        perimeter_margin_m: args.margin,
        crosshatch: if args.repeat_crosshatch {
            CrosshatchMode::Repeated
        } else {
            CrosshatchMode::Rotated
        },
    };

    let path = generate_path_with_config(
        &polygon,
        args.pattern.into(),
        args.altitude,
        args.overlap,
        &config,
    );
    if path.is_empty() {
        anyhow::bail!("no waypoints could be generated for this survey area");
    }

    tracing::info!(
        waypoints = path.len(),
        length_m = (path_length(&path) * 10.0).round() / 10.0,
        "Planned survey path"
    );
    println!("{}", serde_json::to_string_pretty(&path)?);
    Ok(())
}
