//! Measurement geometry model
//!
//! Lines and polygons drawn on the map surface. All vertices are stored in the
//! map's working projection; reprojection to geographic coordinates happens
//! only when metrics are computed.

use crate::error::MeasureError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stable identifier of a measurement geometry
///
/// Time-ordered (UUID v7), assigned when the geometry is created and unique
/// for the lifetime of the session.
pub type GeometryId = uuid::Uuid;

/// Coordinate in the map's working projection
///
/// Units depend on the projection (degrees for EPSG:4326, meters for
/// EPSG:3857).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCoordinate {
    pub x: f64,
    pub y: f64,
}

impl MapCoordinate {
    /// Create a new map coordinate
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Planar distance to another coordinate in map units
    pub fn distance_to(&self, other: &MapCoordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two coordinates
    pub fn midpoint(&self, other: &MapCoordinate) -> MapCoordinate {
        MapCoordinate::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl FromStr for MapCoordinate {
    type Err = MeasureError;

    /// Parse `"X,Y"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MeasureError::InvalidCoordinate(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        let coordinate = MapCoordinate::new(x, y);
        if !coordinate.is_finite() {
            return Err(invalid());
        }
        Ok(coordinate)
    }
}

/// Geographic coordinate in degrees (EPSG:4326 axis order: lon, lat)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Kind tag of a measurement geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    /// Polyline, measured by length
    Line,
    /// Closed ring, measured by area
    Polygon,
}

impl GeometryKind {
    /// Minimum vertex count for a finished geometry of this kind
    pub fn min_vertices(&self) -> usize {
        match self {
            GeometryKind::Line => 2,
            GeometryKind::Polygon => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Line => "line",
            GeometryKind::Polygon => "polygon",
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line or polygon geometry under measurement
///
/// A polygon ring is implicitly closed. The host may or may not repeat the
/// first vertex at the end; both forms measure identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MeasureGeometry {
    Line { points: Vec<MapCoordinate> },
    Polygon { ring: Vec<MapCoordinate> },
}

impl MeasureGeometry {
    pub fn line(points: Vec<MapCoordinate>) -> Self {
        MeasureGeometry::Line { points }
    }

    pub fn polygon(ring: Vec<MapCoordinate>) -> Self {
        MeasureGeometry::Polygon { ring }
    }

    /// Build a geometry of the given kind from a vertex list
    pub fn from_vertices(kind: GeometryKind, vertices: Vec<MapCoordinate>) -> Self {
        match kind {
            GeometryKind::Line => MeasureGeometry::line(vertices),
            GeometryKind::Polygon => MeasureGeometry::polygon(vertices),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            MeasureGeometry::Line { .. } => GeometryKind::Line,
            MeasureGeometry::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    /// All stored vertices, including a closing duplicate if present
    pub fn vertices(&self) -> &[MapCoordinate] {
        match self {
            MeasureGeometry::Line { points } => points,
            MeasureGeometry::Polygon { ring } => ring,
        }
    }

    fn vertices_mut(&mut self) -> &mut Vec<MapCoordinate> {
        match self {
            MeasureGeometry::Line { points } => points,
            MeasureGeometry::Polygon { ring } => ring,
        }
    }

    /// Distinct vertices: for polygons the closing duplicate is dropped
    pub fn open_vertices(&self) -> &[MapCoordinate] {
        match self {
            MeasureGeometry::Line { points } => points,
            MeasureGeometry::Polygon { ring } => {
                if ring.len() > 1 && ring.first() == ring.last() {
                    &ring[..ring.len() - 1]
                } else {
                    ring
                }
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.open_vertices().len()
    }

    /// Whether the geometry has enough vertices to be kept after drawing
    pub fn is_complete(&self) -> bool {
        self.vertex_count() >= self.kind().min_vertices()
    }

    /// Move one vertex. Moving the first vertex of an explicitly closed
    /// ring moves the closing duplicate with it.
    ///
    /// Returns `false` if the index is out of range.
    pub fn set_vertex(&mut self, index: usize, position: MapCoordinate) -> bool {
        let closed = matches!(self, MeasureGeometry::Polygon { .. })
            && self.vertices().len() > 1
            && self.vertices().first() == self.vertices().last();
        let vertices = self.vertices_mut();
        if index >= vertices.len() {
            return false;
        }
        let last = vertices.len() - 1;
        vertices[index] = position;
        if closed {
            if index == 0 {
                vertices[last] = position;
            } else if index == last {
                vertices[0] = position;
            }
        }
        true
    }

    /// Get the bounding box
    ///
    /// Returns (min_x, min_y, max_x, max_y) in map coordinates.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let points = self.vertices();
        if points.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let mut min_x = points[0].x;
        let mut max_x = points[0].x;
        let mut min_y = points[0].y;
        let mut max_y = points[0].y;
        for point in points.iter().skip(1) {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// A point guaranteed to lie inside a polygon ring
    ///
    /// Scans the horizontal line through the middle of the bounding box and
    /// returns the midpoint of the widest span inside the ring. Falls back
    /// to the vertex average when the scan finds no span (degenerate ring).
    /// For lines this is the vertex average.
    pub fn interior_point(&self) -> Option<MapCoordinate> {
        let vertices = self.open_vertices();
        if vertices.is_empty() {
            return None;
        }
        let centroid = vertex_average(vertices);
        if self.kind() == GeometryKind::Line || vertices.len() < 3 {
            return Some(centroid);
        }

        let (_, min_y, _, max_y) = self.bounding_box();
        let scan_y = (min_y + max_y) / 2.0;
        let n = vertices.len();
        let mut crossings: Vec<f64> = Vec::new();
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            // Half-open rule so a vertex exactly on the scanline counts once
            if (a.y <= scan_y && b.y > scan_y) || (b.y <= scan_y && a.y > scan_y) {
                let t = (scan_y - a.y) / (b.y - a.y);
                crossings.push(a.x + t * (b.x - a.x));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        let mut best: Option<(f64, f64)> = None;
        for pair in crossings.chunks_exact(2) {
            let width = pair[1] - pair[0];
            if best.map_or(true, |(w, _)| width > w) {
                best = Some((width, (pair[0] + pair[1]) / 2.0));
            }
        }
        match best {
            Some((width, x)) if width > 0.0 => Some(MapCoordinate::new(x, scan_y)),
            _ => Some(centroid),
        }
    }

    /// Index of the vertex nearest to `point` within `tolerance`
    pub fn nearest_vertex(&self, point: &MapCoordinate, tolerance: f64) -> Option<usize> {
        self.open_vertices()
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.distance_to(point)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Check if a point hits this geometry (within tolerance)
    ///
    /// Lines are hit near any segment. Polygons are hit near any edge or
    /// anywhere inside the ring.
    pub fn contains_point(&self, point: &MapCoordinate, tolerance: f64) -> bool {
        let points = self.open_vertices();
        match self {
            MeasureGeometry::Line { .. } => {
                if points.len() == 1 {
                    return points[0].distance_to(point) <= tolerance;
                }
                points
                    .windows(2)
                    .any(|w| point_near_line_segment(point, &w[0], &w[1], tolerance))
            }
            MeasureGeometry::Polygon { .. } => {
                let n = points.len();
                if n == 0 {
                    return false;
                }
                for i in 0..n {
                    let next = (i + 1) % n;
                    if point_near_line_segment(point, &points[i], &points[next], tolerance) {
                        return true;
                    }
                }
                n >= 3 && ring_contains(points, point)
            }
        }
    }
}

fn vertex_average(points: &[MapCoordinate]) -> MapCoordinate {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.x).sum();
    let sum_y: f64 = points.iter().map(|p| p.y).sum();
    MapCoordinate::new(sum_x / n, sum_y / n)
}

/// Even-odd point-in-ring test
fn ring_contains(ring: &[MapCoordinate], point: &MapCoordinate) -> bool {
    let mut inside = false;
    let n = ring.len();
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Helper function for point-to-line-segment distance check
fn point_near_line_segment(
    point: &MapCoordinate,
    start: &MapCoordinate,
    end: &MapCoordinate,
    tolerance: f64,
) -> bool {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-12 {
        // Degenerate line segment
        return point.distance_to(start) <= tolerance;
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let t = t.clamp(0.0, 1.0);

    let closest = MapCoordinate::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest) <= tolerance
}
