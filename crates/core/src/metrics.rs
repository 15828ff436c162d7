//! Length and area of measurement geometries
//!
//! The default planar mode is an equirectangular approximation: vertices are
//! reprojected to lon/lat and degree distances are scaled by a fixed
//! meters-per-degree factor, with a cosine-of-latitude correction for area.
//! Error stays well under a percent for regional extents and grows with
//! extent and latitude.
//!
//! The spherical mode integrates on a sphere instead and is the better
//! choice for long lines or large polygons. Both modes return canonical
//! meters / square meters, never negative, and zero for degenerate input.

use crate::error::MeasureError;
use crate::geometry::{GeoCoordinate, MapCoordinate, MeasureGeometry};
use crate::projection::Projection;
use serde::{Deserialize, Serialize};

/// Meters per degree used for planar length
pub const METERS_PER_DEGREE: f64 = 111_139.0;

/// Meters per degree (both axes) used for planar area
pub const METERS_PER_DEGREE_AREA: f64 = 111_320.0;

/// Mean earth radius for spherical computations
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// How lengths and areas are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricMode {
    /// Equirectangular approximation
    #[default]
    Planar,
    /// Haversine length and spherical-excess area
    Spherical,
}

impl std::str::FromStr for MetricMode {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planar" => Ok(MetricMode::Planar),
            "spherical" | "geodesic" => Ok(MetricMode::Spherical),
            _ => Err(MeasureError::UnknownMetricMode(s.to_string())),
        }
    }
}

/// Live metric of one geometry, in canonical units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryMetrics {
    /// Length in meters (lines) or area in square meters (polygons)
    pub value: f64,
    /// Per-segment lengths in meters; empty for polygons
    pub segments: Vec<f64>,
}

fn to_geographic(points: &[MapCoordinate], projection: &dyn Projection) -> Vec<GeoCoordinate> {
    points.iter().map(|p| projection.to_geographic(*p)).collect()
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.abs()
    } else {
        0.0
    }
}

fn planar_segment(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    (dx * dx + dy * dy).sqrt() * METERS_PER_DEGREE
}

fn haversine_segment(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}

/// Length of each segment of a polyline, in meters
pub fn segment_lengths(
    points: &[MapCoordinate],
    projection: &dyn Projection,
    mode: MetricMode,
) -> Vec<f64> {
    let geo = to_geographic(points, projection);
    geo.windows(2)
        .map(|w| match mode {
            MetricMode::Planar => planar_segment(&w[0], &w[1]),
            MetricMode::Spherical => haversine_segment(&w[0], &w[1]),
        })
        .map(sanitize)
        .collect()
}

/// Planar-approximated length of a polyline, in meters
pub fn length(points: &[MapCoordinate], projection: &dyn Projection) -> f64 {
    segment_lengths(points, projection, MetricMode::Planar)
        .iter()
        .sum()
}

/// Planar-approximated area of an implicitly closed ring, in square meters
///
/// The latitude correction uses the ring's interior point, so the result
/// reflects where the polygon lies rather than where its vertices cluster.
pub fn area(ring: &[MapCoordinate], projection: &dyn Projection) -> f64 {
    let polygon = MeasureGeometry::polygon(ring.to_vec());
    let open = polygon.open_vertices();
    if open.len() < 3 {
        return 0.0;
    }

    let geo = to_geographic(open, projection);
    let n = geo.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p1 = geo[i];
        let p2 = geo[(i + 1) % n];
        sum += (p2.lon - p1.lon) * (p1.lat + p2.lat) / 2.0;
    }
    let square_degrees = sum.abs();

    let center = match polygon.interior_point() {
        Some(point) => projection.to_geographic(point),
        None => return 0.0,
    };
    let lat_adjustment = center.lat.to_radians().cos();
    sanitize(square_degrees * METERS_PER_DEGREE_AREA * METERS_PER_DEGREE_AREA * lat_adjustment)
}

/// Haversine length of a polyline, in meters
pub fn spherical_length(points: &[MapCoordinate], projection: &dyn Projection) -> f64 {
    segment_lengths(points, projection, MetricMode::Spherical)
        .iter()
        .sum()
}

/// Area of an implicitly closed ring on the sphere, in square meters
pub fn spherical_area(ring: &[MapCoordinate], projection: &dyn Projection) -> f64 {
    let polygon = MeasureGeometry::polygon(ring.to_vec());
    let open = polygon.open_vertices();
    if open.len() < 3 {
        return 0.0;
    }

    let geo = to_geographic(open, projection);
    let n = geo.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p1 = geo[i];
        let p2 = geo[(i + 1) % n];
        sum += (p2.lon - p1.lon).to_radians()
            * (2.0 + p1.lat.to_radians().sin() + p2.lat.to_radians().sin());
    }
    sanitize(sum * EARTH_RADIUS * EARTH_RADIUS / 2.0)
}

/// Measure a geometry: length for lines, area for polygons
pub fn measure(geometry: &MeasureGeometry, projection: &dyn Projection, mode: MetricMode) -> f64 {
    match (geometry, mode) {
        (MeasureGeometry::Line { points }, MetricMode::Planar) => length(points, projection),
        (MeasureGeometry::Line { points }, MetricMode::Spherical) => {
            spherical_length(points, projection)
        }
        (MeasureGeometry::Polygon { ring }, MetricMode::Planar) => area(ring, projection),
        (MeasureGeometry::Polygon { ring }, MetricMode::Spherical) => {
            spherical_area(ring, projection)
        }
    }
}

/// Full metrics of a geometry, including the per-segment breakdown for lines
pub fn evaluate(
    geometry: &MeasureGeometry,
    projection: &dyn Projection,
    mode: MetricMode,
) -> GeometryMetrics {
    match geometry {
        MeasureGeometry::Line { points } => {
            let segments = segment_lengths(points, projection, mode);
            GeometryMetrics {
                value: segments.iter().sum(),
                segments,
            }
        }
        MeasureGeometry::Polygon { .. } => GeometryMetrics {
            value: measure(geometry, projection, mode),
            segments: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{Geographic, WebMercator};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn c(x: f64, y: f64) -> MapCoordinate {
        MapCoordinate::new(x, y)
    }

    fn square_at(lon: f64, lat: f64, side: f64) -> Vec<MapCoordinate> {
        let h = side / 2.0;
        vec![
            c(lon - h, lat - h),
            c(lon + h, lat - h),
            c(lon + h, lat + h),
            c(lon - h, lat + h),
        ]
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        assert_eq!(length(&[], &Geographic), 0.0);
        assert_eq!(length(&[c(1.0, 1.0)], &Geographic), 0.0);
        assert_eq!(area(&[], &Geographic), 0.0);
        assert_eq!(area(&[c(0.0, 0.0), c(1.0, 1.0)], &Geographic), 0.0);
        assert_eq!(spherical_length(&[c(1.0, 1.0)], &Geographic), 0.0);
        assert_eq!(spherical_area(&[c(0.0, 0.0), c(1.0, 1.0)], &Geographic), 0.0);
    }

    #[test]
    fn test_three_vertex_line() {
        let points = [c(0.0, 0.0), c(0.0, 0.001), c(0.001, 0.001)];
        let expected = 0.001 * METERS_PER_DEGREE * 2.0;
        assert_relative_eq!(length(&points, &Geographic), expected, max_relative = 1e-9);
        assert_relative_eq!(length(&points, &Geographic), 222.28, max_relative = 0.01);
    }

    #[test]
    fn test_square_area_with_latitude_correction() {
        let ring = square_at(20.0, 10.0, 0.001);
        let expected = (0.001 * METERS_PER_DEGREE_AREA).powi(2) * 10f64.to_radians().cos();
        assert_relative_eq!(area(&ring, &Geographic), expected, max_relative = 1e-6);
        assert_relative_eq!(area(&ring, &Geographic), 12103.0, max_relative = 0.02);
    }

    #[test]
    fn test_area_ignores_winding_and_closing_duplicate() {
        let mut ring = square_at(5.0, 45.0, 0.01);
        let ccw = area(&ring, &Geographic);
        ring.reverse();
        let cw = area(&ring, &Geographic);
        ring.push(ring[0]);
        let closed = area(&ring, &Geographic);
        assert_relative_eq!(ccw, cw);
        assert_relative_eq!(ccw, closed);
        assert!(ccw > 0.0);
    }

    #[test]
    fn test_web_mercator_input_matches_geographic() {
        let geo = [c(10.0, 50.0), c(10.01, 50.0), c(10.01, 50.02)];
        let projected: Vec<MapCoordinate> = geo
            .iter()
            .map(|p| WebMercator.from_geographic(GeoCoordinate::new(p.x, p.y)))
            .collect();
        assert_relative_eq!(
            length(&projected, &WebMercator),
            length(&geo, &Geographic),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_spherical_close_to_planar_for_small_extents() {
        let points = [c(0.0, 0.0), c(0.0, 0.01)];
        let planar = length(&points, &Geographic);
        let spherical = spherical_length(&points, &Geographic);
        assert_relative_eq!(planar, spherical, max_relative = 0.001);

        let ring = square_at(0.0, 0.0, 0.01);
        let planar = area(&ring, &Geographic);
        let spherical = spherical_area(&ring, &Geographic);
        assert_relative_eq!(planar, spherical, max_relative = 0.01);
    }

    #[test]
    fn test_non_finite_projection_output_measures_zero() {
        let points = [c(0.0, 0.0), c(f64::NAN, 1.0)];
        assert_eq!(length(&points, &Geographic), 0.0);
    }

    #[test]
    fn test_evaluate_line_segments() {
        let line = MeasureGeometry::line(vec![c(0.0, 0.0), c(0.0, 0.001), c(0.001, 0.001)]);
        let metrics = evaluate(&line, &Geographic, MetricMode::Planar);
        assert_eq!(metrics.segments.len(), 2);
        assert_abs_diff_eq!(metrics.segments[0], 111.139, epsilon = 1e-6);
        assert_abs_diff_eq!(metrics.value, 222.278, epsilon = 1e-6);
    }

    #[test]
    fn test_evaluate_polygon_has_no_segments() {
        let polygon = MeasureGeometry::polygon(square_at(0.0, 0.0, 0.001));
        let metrics = evaluate(&polygon, &Geographic, MetricMode::Planar);
        assert!(metrics.segments.is_empty());
        assert!(metrics.value > 0.0);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Spherical".parse::<MetricMode>().unwrap(), MetricMode::Spherical);
        assert!(matches!(
            "flat".parse::<MetricMode>(),
            Err(MeasureError::UnknownMetricMode(mode)) if mode == "flat"
        ));
    }
}
