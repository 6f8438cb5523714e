//! Survey path planner.
//!
//! Turns a polygon, flight pattern, altitude and image overlap into an ordered
//! sequence of 3D waypoints. An empty result means the area cannot be
//! surveyed with the given parameters.

use crate::models::{GeoPoint, PathPattern, PathPoint, Polygon};
use crate::spatial::{bounding_box, buffer, is_degenerate, line_intersect};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Flat meters-per-degree factor used to convert line spacing to degrees.
///
/// Equirectangular approximation: fine for survey-sized areas, wrong near the
/// poles and not latitude-corrected for longitude sweeps.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// How the second pass of a crosshatch survey is generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrosshatchMode {
    /// Second pass sweeps along longitude, perpendicular to the first
    #[default]
    Rotated,
    /// Second pass repeats the latitude sweep unchanged
    Repeated,
}

impl FromStr for CrosshatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rotated" => Ok(Self::Rotated),
            "repeated" => Ok(Self::Repeated),
            other => Err(format!("unknown crosshatch mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Inward offset applied to the boundary for perimeter surveys (meters)
    pub perimeter_margin_m: f64,
    pub crosshatch: CrosshatchMode,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            perimeter_margin_m: 10.0,
            crosshatch: CrosshatchMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepAxis {
    /// Lines of constant latitude, stepping north
    Latitude,
    /// Lines of constant longitude, stepping east
    Longitude,
}

/// Distance between adjacent sweep lines in meters.
pub fn line_spacing_m(altitude_m: f64, overlap_percent: f64) -> f64 {
    altitude_m * 0.5 * (1.0 - overlap_percent / 100.0)
}

/// Distance between adjacent sweep lines in degrees.
pub fn line_spacing_deg(altitude_m: f64, overlap_percent: f64) -> f64 {
    line_spacing_m(altitude_m, overlap_percent) / METERS_PER_DEGREE
}

/// Plan a survey path with the default planner configuration.
pub fn generate_path(
    polygon: &Polygon,
    pattern: PathPattern,
    altitude_m: f64,
    overlap_percent: f64,
) -> Vec<PathPoint> {
    generate_path_with_config(
        polygon,
        pattern,
        altitude_m,
        overlap_percent,
        &PlannerConfig::default(),
    )
}

/// Plan a survey path. Every returned point carries `altitude_m`.
pub fn generate_path_with_config(
    polygon: &Polygon,
    pattern: PathPattern,
    altitude_m: f64,
    overlap_percent: f64,
    config: &PlannerConfig,
) -> Vec<PathPoint> {
    if !altitude_m.is_finite() || altitude_m <= 0.0 {
        return Vec::new();
    }
    if !(0.0..100.0).contains(&overlap_percent) {
        return Vec::new();
    }
    let ring = polygon.closed_ring();
    if is_degenerate(&ring) {
        return Vec::new();
    }

    let spacing_deg = line_spacing_deg(altitude_m, overlap_percent);
    match pattern {
        PathPattern::Grid => sweep(&ring, spacing_deg, altitude_m, SweepAxis::Latitude),
        PathPattern::Perimeter => perimeter(&ring, altitude_m, config.perimeter_margin_m),
        PathPattern::Crosshatch => {
            let mut path = sweep(&ring, spacing_deg, altitude_m, SweepAxis::Latitude);
            let second_axis = match config.crosshatch {
                CrosshatchMode::Rotated => SweepAxis::Longitude,
                CrosshatchMode::Repeated => SweepAxis::Latitude,
            };
            path.extend(sweep(&ring, spacing_deg, altitude_m, second_axis));
            path
        }
    }
}

/// Upper bound on sweep lines per pass. Larger spans yield an empty path
/// instead of an unbounded allocation.
pub const MAX_SWEEP_LINES: usize = 10_000_000;

/// Boustrophedon sweep. Each line crossing the polygon contributes its first
/// and last boundary hit; direction alternates between emitted lines.
fn sweep(ring: &[GeoPoint], spacing_deg: f64, altitude_m: f64, axis: SweepAxis) -> Vec<PathPoint> {
    // Longitude sweeps run the same algorithm on coordinates with the axes swapped.
    let swap = |p: GeoPoint| GeoPoint::new(p.lat, p.lon);
    let working: Vec<GeoPoint> = match axis {
        SweepAxis::Latitude => ring.to_vec(),
        SweepAxis::Longitude => ring.iter().copied().map(swap).collect(),
    };

    let Some(bbox) = bounding_box(&working) else {
        return Vec::new();
    };
    if spacing_deg.is_nan() || spacing_deg <= 0.0 {
        return Vec::new();
    }

    let span_lines = ((bbox.max_lat - bbox.min_lat) / spacing_deg).floor();
    if !span_lines.is_finite() || span_lines >= MAX_SWEEP_LINES as f64 {
        return Vec::new();
    }
    let line_count = span_lines as usize + 1;
    let mut path = Vec::new();
    let mut forward = true;

    for k in 0..line_count {
        let v = bbox.min_lat + k as f64 * spacing_deg;
        let hits = line_intersect(
            GeoPoint::new(bbox.min_lon, v),
            GeoPoint::new(bbox.max_lon, v),
            &working,
        );
        if hits.len() < 2 {
            continue;
        }

        let (first, last) = (hits[0], hits[hits.len() - 1]);
        let (a, b) = if forward { (first, last) } else { (last, first) };
        for p in [a, b] {
            let p = match axis {
                SweepAxis::Latitude => p,
                SweepAxis::Longitude => swap(p),
            };
            path.push(PathPoint::new(p.lon, p.lat, altitude_m));
        }
        forward = !forward;
    }

    path
}

/// Closed ring inset from the boundary by the survey margin.
fn perimeter(ring: &[GeoPoint], altitude_m: f64, margin_m: f64) -> Vec<PathPoint> {
    buffer(ring, -margin_m.abs())
        .into_iter()
        .map(|p| PathPoint::new(p.lon, p.lat, altitude_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::distance;

    fn square(size_deg: f64) -> Polygon {
        Polygon::from_coords(&[[0.0, 0.0], [0.0, size_deg], [size_deg, size_deg], [size_deg, 0.0]])
    }

    #[test]
    fn spacing_follows_altitude_and_overlap() {
        assert!((line_spacing_m(50.0, 70.0) - 7.5).abs() < 1e-12);
        assert!((line_spacing_deg(50.0, 70.0) - 7.5 / 111_320.0).abs() < 1e-15);
    }

    #[test]
    fn grid_on_square_is_even_and_alternates() {
        let path = generate_path(&square(0.001), PathPattern::Grid, 50.0, 70.0);
        assert!(!path.is_empty());
        assert_eq!(path.len() % 2, 0);

        // Line spacing 7.5m over a ~111m square: floor(0.001 / 6.737e-5) + 1 lines.
        assert_eq!(path.len(), 2 * 15);

        for (i, pair) in path.chunks(2).enumerate() {
            assert!((pair[0].lat - pair[1].lat).abs() < 1e-12);
            if i % 2 == 0 {
                assert!(pair[0].lon < pair[1].lon, "line {i} should run west to east");
            } else {
                assert!(pair[0].lon > pair[1].lon, "line {i} should run east to west");
            }
        }
        assert!(path.iter().all(|p| p.altitude_m == 50.0));
    }

    #[test]
    fn square_scenario_starts_and_ends_on_opposite_edges() {
        let path = generate_path(&square(0.001), PathPattern::Grid, 50.0, 70.0);
        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert!(first.lon.abs() < 1e-12 && first.lat.abs() < 1e-12);
        assert!((last.lon - 0.001).abs() < 1e-12);
    }

    #[test]
    fn grid_on_hundred_degree_square() {
        let polygon = Polygon::from_coords(&[[0.0, 0.0], [0.0, 100.0], [100.0, 100.0], [100.0, 0.0]]);
        let path = generate_path(&polygon, PathPattern::Grid, 50.0, 70.0);

        // floor(100 / (7.5 / 111320)) + 1 lines, two waypoints each.
        let lines = 1_484_267;
        assert_eq!(path.len(), 2 * lines);
        assert!(path.first().unwrap().lon.abs() < 1e-9);
        assert!((path.last().unwrap().lon - 100.0).abs() < 1e-9);

        for i in [0, 1, 2, 3, 741_132, 741_133, lines - 2, lines - 1] {
            let (a, b) = (path[2 * i], path[2 * i + 1]);
            if i % 2 == 0 {
                assert!(a.lon < b.lon, "line {i} should run west to east");
            } else {
                assert!(a.lon > b.lon, "line {i} should run east to west");
            }
        }
    }

    #[test]
    fn oversized_span_yields_empty_path() {
        let sliver = Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1e308]]);
        assert!(generate_path(&sliver, PathPattern::Grid, 50.0, 70.0).is_empty());
    }

    #[test]
    fn grid_on_triangle_is_even() {
        let triangle = Polygon::from_coords(&[[0.0, 0.0], [0.002, 0.0], [0.001, 0.0015]]);
        let path = generate_path(&triangle, PathPattern::Grid, 60.0, 50.0);
        assert!(!path.is_empty());
        assert_eq!(path.len() % 2, 0);
    }

    #[test]
    fn closed_and_open_rings_plan_identically() {
        let open = square(0.001);
        let closed = Polygon::new(open.closed_ring());
        assert_eq!(
            generate_path(&open, PathPattern::Grid, 50.0, 70.0),
            generate_path(&closed, PathPattern::Grid, 50.0, 70.0)
        );
    }

    #[test]
    fn perimeter_is_closed_ring_near_vertices() {
        let polygon = square(0.001);
        let config = PlannerConfig::default();
        let path = generate_path(&polygon, PathPattern::Perimeter, 40.0, 60.0);

        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), path.last());
        assert!(path.iter().all(|p| p.altitude_m == 40.0));

        for vertex in &polygon.vertices {
            let nearest = path
                .iter()
                .map(|p| distance(*vertex, p.position()))
                .fold(f64::INFINITY, f64::min);
            assert!(nearest <= 2.0 * config.perimeter_margin_m, "vertex {vertex:?} is {nearest}m away");
        }
    }

    #[test]
    fn perimeter_on_tiny_area_is_empty() {
        let path = generate_path(&square(0.0001), PathPattern::Perimeter, 40.0, 60.0);
        assert!(path.is_empty());
    }

    #[test]
    fn crosshatch_rotated_adds_perpendicular_pass() {
        let polygon = square(0.001);
        let grid = generate_path(&polygon, PathPattern::Grid, 50.0, 70.0);
        let hatch = generate_path(&polygon, PathPattern::Crosshatch, 50.0, 70.0);

        assert_eq!(&hatch[..grid.len()], &grid[..]);
        let second = &hatch[grid.len()..];
        assert!(!second.is_empty());
        for pair in second.chunks(2) {
            assert!((pair[0].lon - pair[1].lon).abs() < 1e-12, "second pass lines run north/south");
        }
    }

    #[test]
    fn crosshatch_repeated_duplicates_grid() {
        let polygon = square(0.001);
        let config = PlannerConfig {
            crosshatch: CrosshatchMode::Repeated,
            ..PlannerConfig::default()
        };
        let grid = generate_path(&polygon, PathPattern::Grid, 50.0, 70.0);
        let hatch = generate_path_with_config(&polygon, PathPattern::Crosshatch, 50.0, 70.0, &config);
        assert_eq!(hatch.len(), grid.len() * 2);
        assert_eq!(&hatch[grid.len()..], &grid[..]);
    }

    #[test]
    fn invalid_inputs_yield_empty_paths() {
        let degenerate = Polygon::from_coords(&[[0.0, 0.0], [0.001, 0.001], [0.0, 0.0]]);
        assert!(generate_path(&degenerate, PathPattern::Grid, 50.0, 70.0).is_empty());
        assert!(generate_path(&square(0.001), PathPattern::Grid, 50.0, 100.0).is_empty());
        assert!(generate_path(&square(0.001), PathPattern::Grid, 0.0, 70.0).is_empty());
        assert!(generate_path(&square(0.001), PathPattern::Grid, 50.0, -5.0).is_empty());
    }

    #[test]
    fn crosshatch_mode_parses() {
        assert_eq!("Rotated".parse::<CrosshatchMode>(), Ok(CrosshatchMode::Rotated));
        assert_eq!(" repeated ".parse::<CrosshatchMode>(), Ok(CrosshatchMode::Repeated));
        assert!("diagonal".parse::<CrosshatchMode>().is_err());
    }
}
