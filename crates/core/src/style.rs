//! Visual style of measurement geometries
//!
//! A style is derived, never stored as a source of truth: it is a pure
//! function of the geometry, its live metric and the current display units.
//! The session re-derives it on every geometry change, on every unit change
//! (for all geometries), and once when a draw finishes.

use crate::geometry::{GeometryKind, MapCoordinate, MeasureGeometry};
use crate::metrics::GeometryMetrics;
use crate::units::{format_value, DisplayUnits};
use serde::{Deserialize, Serialize};

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// CSS `rgba(...)` notation for web hosts
    pub fn to_css(&self) -> String {
        format!(
            "rgba({}, {}, {}, {:.2})",
            self.r,
            self.g,
            self.b,
            self.a as f32 / 255.0
        )
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const MEASURE_STROKE: Color = Color::new(0, 0, 255, 179);
    pub const MEASURE_FILL: Color = Color::new(0, 0, 255, 26);
    pub const LABEL_BACKGROUND: Color = Color::rgb(255, 204, 51);
    pub const VERTEX_FILL: Color = Color::new(13, 61, 219, 179);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: Color,
}

/// Text label anchored in map space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    pub text: String,
    pub anchor: MapCoordinate,
    pub font_size: f32,
    /// Vertical offset in screen pixels (negative is up)
    pub offset_y: f32,
    pub color: Color,
    pub background: Option<Color>,
}

/// Circle drawn on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexMarker {
    pub position: MapCoordinate,
    pub radius: f32,
    pub fill: Color,
    pub stroke: Stroke,
}

/// Rendering knobs that do not depend on the geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleOptions {
    /// Label every line segment with its own length
    pub segment_labels: bool,
    /// Radius of vertex markers in screen pixels
    pub marker_radius: f32,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            segment_labels: false,
            marker_radius: 5.0,
        }
    }
}

/// Complete style of one measurement geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementStyle {
    pub stroke: Stroke,
    /// Polygons only
    pub fill: Option<Fill>,
    pub label: TextLabel,
    /// Per-segment labels (lines with segment labelling enabled)
    pub segment_labels: Vec<TextLabel>,
    pub markers: Vec<VertexMarker>,
}

impl MeasurementStyle {
    /// Main label text, e.g. `"0.22 km"`
    pub fn label_text(&self) -> &str {
        &self.label.text
    }
}

/// Where the main label of a geometry is drawn
///
/// Lines are labelled at their last vertex (the pointer end while drawing),
/// polygons at their interior point.
pub fn label_anchor(geometry: &MeasureGeometry) -> MapCoordinate {
    let fallback = MapCoordinate::new(0.0, 0.0);
    match geometry {
        MeasureGeometry::Line { points } => points.last().copied().unwrap_or(fallback),
        MeasureGeometry::Polygon { .. } => geometry.interior_point().unwrap_or(fallback),
    }
}

/// Markers on every vertex of a line, and on every vertex of a polygon
/// except the closing duplicate
pub fn vertex_markers(geometry: &MeasureGeometry, radius: f32) -> Vec<VertexMarker> {
    geometry
        .open_vertices()
        .iter()
        .map(|position| VertexMarker {
            position: *position,
            radius,
            fill: Color::VERTEX_FILL,
            stroke: Stroke {
                color: Color::WHITE,
                width: 1.0,
            },
        })
        .collect()
}

/// Derive the style of a geometry from its live metric and the display units
pub fn style_for(
    geometry: &MeasureGeometry,
    metrics: &GeometryMetrics,
    units: &DisplayUnits,
    options: &StyleOptions,
) -> MeasurementStyle {
    let kind = geometry.kind();
    let mut text = units.format(kind, metrics.value);

    let mut segment_labels = Vec::new();
    if options.segment_labels && kind == GeometryKind::Line {
        let points = geometry.vertices();
        for (segment, meters) in points.windows(2).zip(metrics.segments.iter()) {
            segment_labels.push(TextLabel {
                text: format_value(units.length.from_meters(*meters), units.length.label()),
                anchor: segment[0].midpoint(&segment[1]),
                font_size: 12.0,
                offset_y: -10.0,
                color: Color::BLACK,
                background: None,
            });
        }
        if points.len() > 1 {
            text = format!("Total: {}", text);
        }
    }

    MeasurementStyle {
        stroke: Stroke {
            color: Color::MEASURE_STROKE,
            width: 2.0,
        },
        fill: match kind {
            GeometryKind::Polygon => Some(Fill {
                color: Color::MEASURE_FILL,
            }),
            GeometryKind::Line => None,
        },
        label: TextLabel {
            text,
            anchor: label_anchor(geometry),
            font_size: 14.0,
            offset_y: -10.0,
            color: Color::BLACK,
            background: Some(Color::LABEL_BACKGROUND),
        },
        segment_labels,
        markers: vertex_markers(geometry, options.marker_radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{AreaUnit, LengthUnit};

    fn line() -> MeasureGeometry {
        MeasureGeometry::line(vec![
            MapCoordinate::new(0.0, 0.0),
            MapCoordinate::new(0.0, 1.0),
            MapCoordinate::new(1.0, 1.0),
        ])
    }

    #[test]
    fn test_line_label_and_markers() {
        let metrics = GeometryMetrics {
            value: 1500.0,
            segments: vec![1000.0, 500.0],
        };
        let style = style_for(
            &line(),
            &metrics,
            &DisplayUnits::default(),
            &StyleOptions::default(),
        );
        assert_eq!(style.label_text(), "1.50 km");
        assert_eq!(style.label.anchor, MapCoordinate::new(1.0, 1.0));
        assert_eq!(style.markers.len(), 3);
        assert!(style.fill.is_none());
        assert!(style.segment_labels.is_empty());
    }

    #[test]
    fn test_polygon_skips_closing_marker() {
        let polygon = MeasureGeometry::polygon(vec![
            MapCoordinate::new(0.0, 0.0),
            MapCoordinate::new(2.0, 0.0),
            MapCoordinate::new(2.0, 2.0),
            MapCoordinate::new(0.0, 0.0),
        ]);
        let metrics = GeometryMetrics {
            value: 2_000_000.0,
            segments: Vec::new(),
        };
        let units = DisplayUnits::new(LengthUnit::Meters, AreaUnit::SquareKilometers);
        let style = style_for(&polygon, &metrics, &units, &StyleOptions::default());
        assert_eq!(style.markers.len(), 3);
        assert!(style.fill.is_some());
        assert_eq!(style.label_text(), "2.00 km²");
    }

    #[test]
    fn test_segment_labels() {
        let metrics = GeometryMetrics {
            value: 1500.0,
            segments: vec![1000.0, 500.0],
        };
        let options = StyleOptions {
            segment_labels: true,
            ..StyleOptions::default()
        };
        let units = DisplayUnits::new(LengthUnit::Meters, AreaUnit::SquareMeters);
        let style = style_for(&line(), &metrics, &units, &options);
        assert_eq!(style.label_text(), "Total: 1500.00 meters");
        assert_eq!(style.segment_labels.len(), 2);
        assert_eq!(style.segment_labels[1].text, "500.00 meters");
        assert_eq!(style.segment_labels[0].anchor, MapCoordinate::new(0.0, 0.5));
    }

    #[test]
    fn test_zero_valued_label_for_degenerate_geometry() {
        let single = MeasureGeometry::line(vec![MapCoordinate::new(3.0, 4.0)]);
        let style = style_for(
            &single,
            &GeometryMetrics::default(),
            &DisplayUnits::default(),
            &StyleOptions::default(),
        );
        assert_eq!(style.label_text(), "0.00 km");
        assert_eq!(style.markers.len(), 1);
    }

    #[test]
    fn test_css_color() {
        assert_eq!(Color::MEASURE_STROKE.to_css(), "rgba(0, 0, 255, 0.70)");
    }
}
