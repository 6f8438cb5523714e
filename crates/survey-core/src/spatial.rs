//! Geometry kernel: distances, bearings, areas, line/polygon intersection and
//! polygon buffering on lon/lat coordinates.
//!
//! Polygon-consuming functions accept open or closed rings and close them
//! before use. Degenerate input (fewer than three distinct vertices, zero
//! area) produces an empty result instead of an error.

use crate::models::{GeoPoint, PathPoint};
use std::cmp::Ordering;

/// Mean Earth radius used by every great-circle computation here.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Relative tolerance for parametric positions along a segment.
const PARAM_EPS: f64 = 1e-9;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two points in meters.
pub fn distance(from: GeoPoint, to: GeoPoint) -> f64 {
    haversine_distance(from.lat, from.lon, to.lat, to.lon)
}

/// Initial bearing from `from` to `to` in degrees, normalized to `[0, 360)`.
/// 0 = north, 90 = east.
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lambda = (to.lon - from.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let deg = x.atan2(y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

// ==== Local metric projection ====
// Latitude-aware scaling used to work in meters around a reference point.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

/// Convert an east/west offset in meters to degrees longitude.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lon(ref_lat_deg).max(1e-9)
}

/// Convert degrees latitude to meters using local scaling.
pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

/// Convert degrees longitude to meters at a given latitude.
pub fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

// ==== Rings ====

/// Return the ring with its first vertex repeated at the end if missing.
pub fn close_ring(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = vertices.to_vec();
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if ring.len() > 1 && !same_point(first, last) {
            ring.push(first);
        }
    }
    ring
}

/// Open ring with consecutive duplicates and the closing vertex removed.
fn open_ring(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut open: Vec<GeoPoint> = Vec::with_capacity(vertices.len());
    for &vertex in vertices {
        if open.last().is_some_and(|&prev| same_point(prev, vertex)) {
            continue;
        }
        open.push(vertex);
    }
    while open.len() > 1 && same_point(open[0], open[open.len() - 1]) {
        open.pop();
    }
    open
}

/// Whether the ring has at least three distinct vertices.
pub fn is_degenerate(vertices: &[GeoPoint]) -> bool {
    open_ring(vertices).len() < 3
}

fn same_point(a: GeoPoint, b: GeoPoint) -> bool {
    (a.lon - b.lon).abs() <= 1e-12 && (a.lat - b.lat).abs() <= 1e-12
}

/// Axis-aligned bounds of a ring in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

pub fn bounding_box(vertices: &[GeoPoint]) -> Option<BoundingBox> {
    let first = vertices.first()?;
    let init = BoundingBox {
        min_lon: first.lon,
        min_lat: first.lat,
        max_lon: first.lon,
        max_lat: first.lat,
    };
    Some(vertices.iter().fold(init, |bbox, p| BoundingBox {
        min_lon: bbox.min_lon.min(p.lon),
        min_lat: bbox.min_lat.min(p.lat),
        max_lon: bbox.max_lon.max(p.lon),
        max_lat: bbox.max_lat.max(p.lat),
    }))
}

/// Geodesic area of a polygon in square meters (spherical ring approximation).
///
/// Returns 0.0 for degenerate rings.
pub fn area(vertices: &[GeoPoint]) -> f64 {
    let ring = open_ring(vertices);
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let lower = ring[i];
        let middle = ring[(i + 1) % n];
        let upper = ring[(i + 2) % n];
        total += (upper.lon.to_radians() - lower.lon.to_radians()) * middle.lat.to_radians().sin();
    }

    (total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

// ==== Intersection ====

/// Planar intersection of segments `p1-p2` and `q1-q2` in degree space.
///
/// Parallel and collinear segments report no intersection. Returns the
/// parameter along `p1-p2` together with the point.
fn segment_intersection(
    p1: GeoPoint,
    p2: GeoPoint,
    q1: GeoPoint,
    q2: GeoPoint,
) -> Option<(f64, GeoPoint)> {
    let r = (p2.lon - p1.lon, p2.lat - p1.lat);
    let s = (q2.lon - q1.lon, q2.lat - q1.lat);
    let cross = |a: (f64, f64), b: (f64, f64)| a.0 * b.1 - a.1 * b.0;

    let denom = cross(r, s);
    let scale = (r.0.hypot(r.1)) * (s.0.hypot(s.1));
    if scale == 0.0 || denom.abs() <= f64::EPSILON * scale {
        return None;
    }

    let qp = (q1.lon - p1.lon, q1.lat - p1.lat);
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    let range = -PARAM_EPS..=1.0 + PARAM_EPS;
    if !range.contains(&t) || !range.contains(&u) {
        return None;
    }

    let t = t.clamp(0.0, 1.0);
    Some((t, GeoPoint::new(p1.lon + t * r.0, p1.lat + t * r.1)))
}

/// Points where the segment `start-end` crosses the polygon boundary.
///
/// Points are ordered by their position along the segment, starting at
/// `start`; a crossing exactly through a vertex is reported once.
pub fn line_intersect(start: GeoPoint, end: GeoPoint, polygon: &[GeoPoint]) -> Vec<GeoPoint> {
    let ring = close_ring(&open_ring(polygon));
    if ring.len() < 4 {
        return Vec::new();
    }

    let mut hits: Vec<(f64, GeoPoint)> = ring
        .windows(2)
        .filter_map(|edge| segment_intersection(start, end, edge[0], edge[1]))
        .collect();

    hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    hits.dedup_by(|b, a| (b.0 - a.0).abs() <= PARAM_EPS);
    hits.into_iter().map(|(_, point)| point).collect()
}

// ==== Buffering ====

/// Offset a polygon by `offset_m` meters: positive grows it outward, negative
/// shrinks it inward. Corners use miter joins.
///
/// Returns a closed ring, or an empty vector when the input is degenerate or
/// an inward offset collapses the polygon.
pub fn buffer(vertices: &[GeoPoint], offset_m: f64) -> Vec<GeoPoint> {
    let ring = open_ring(vertices);
    let n = ring.len();
    if n < 3 {
        return Vec::new();
    }
    if offset_m == 0.0 {
        return close_ring(&ring);
    }

    let ref_lon = ring.iter().map(|p| p.lon).sum::<f64>() / n as f64;
    let ref_lat = ring.iter().map(|p| p.lat).sum::<f64>() / n as f64;
    let local: Vec<(f64, f64)> = ring
        .iter()
        .map(|p| {
            (
                lon_to_meters(p.lon - ref_lon, ref_lat),
                lat_to_meters(p.lat - ref_lat, ref_lat),
            )
        })
        .collect();

    let original_area = signed_area(&local);
    if original_area.abs() < 1e-6 {
        return Vec::new();
    }
    // Counter-clockwise rings have their outward normal on the right of each edge.
    let orientation = original_area.signum();

    // Each edge shifted along its outward normal: (point on line, unit direction).
    let offset_edges: Vec<((f64, f64), (f64, f64))> = (0..n)
        .map(|i| {
            let a = local[i];
            let b = local[(i + 1) % n];
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            let len = dx.hypot(dy);
            let dir = (dx / len, dy / len);
            let normal = (orientation * dir.1, -orientation * dir.0);
            (
                (a.0 + normal.0 * offset_m, a.1 + normal.1 * offset_m),
                dir,
            )
        })
        .collect();

    let shifted: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let prev = offset_edges[(i + n - 1) % n];
            let next = offset_edges[i];
            line_line_intersection(prev, next).unwrap_or(next.0)
        })
        .collect();

    // An inward offset past the inradius reverses edges; treat as collapsed.
    for i in 0..n {
        let orig = (local[(i + 1) % n].0 - local[i].0, local[(i + 1) % n].1 - local[i].1);
        let moved = (
            shifted[(i + 1) % n].0 - shifted[i].0,
            shifted[(i + 1) % n].1 - shifted[i].1,
        );
        if orig.0 * moved.0 + orig.1 * moved.1 <= 0.0 {
            return Vec::new();
        }
    }
    let new_area = signed_area(&shifted);
    if new_area.signum() != orientation || (offset_m < 0.0 && new_area.abs() >= original_area.abs())
    {
        return Vec::new();
    }

    let out: Vec<GeoPoint> = shifted
        .iter()
        .map(|&(x, y)| {
            GeoPoint::new(
                ref_lon + meters_to_lon(x, ref_lat),
                ref_lat + meters_to_lat(y, ref_lat),
            )
        })
        .collect();
    close_ring(&out)
}

fn signed_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum::<f64>()
        / 2.0
}

/// Intersection of two infinite lines given as (point, unit direction).
fn line_line_intersection(
    a: ((f64, f64), (f64, f64)),
    b: ((f64, f64), (f64, f64)),
) -> Option<(f64, f64)> {
    let ((px, py), (rx, ry)) = a;
    let ((qx, qy), (sx, sy)) = b;
    let denom = rx * sy - ry * sx;
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = ((qx - px) * sy - (qy - py) * sx) / denom;
    Some((px + t * rx, py + t * ry))
}

// ==== Paths ====

/// Linear interpolation between two path points.
///
/// `fraction <= 0` returns `from` exactly and `fraction >= 1` returns `to` exactly.
pub fn interpolate(from: PathPoint, to: PathPoint, fraction: f64) -> PathPoint {
    if fraction <= 0.0 {
        return from;
    }
    if fraction >= 1.0 {
        return to;
    }
    PathPoint::new(
        from.lon + (to.lon - from.lon) * fraction,
        from.lat + (to.lat - from.lat) * fraction,
        from.altitude_m + (to.altitude_m - from.altitude_m) * fraction,
    )
}

/// Total great-circle length of a path in meters.
pub fn path_length(points: &[PathPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance(pair[0].position(), pair[1].position()))
        .sum()
}
