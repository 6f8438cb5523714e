//! Argument parsing shared by the binaries.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use survey_core::{PathPattern, Polygon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatternArg {
    Grid,
    Perimeter,
    Crosshatch,
}

impl From<PatternArg> for PathPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Grid => PathPattern::Grid,
            PatternArg::Perimeter => PathPattern::Perimeter,
            PatternArg::Crosshatch => PathPattern::Crosshatch,
        }
    }
}

/// Parse a polygon given as a JSON array of `[lon, lat]` pairs, or as
/// `@path` naming a file that contains one.
pub fn parse_polygon(arg: &str) -> Result<Polygon> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading polygon file {}", path))?,
        None => arg.to_string(),
    };

    let polygon: Polygon =
        serde_json::from_str(text.trim()).context("polygon must be a JSON array of [lon, lat] pairs")?;
    if polygon.vertices.len() < 3 {
        bail!("polygon needs at least three vertices, got {}", polygon.vertices.len());
    }
    Ok(polygon)
}
