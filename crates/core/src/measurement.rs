//! Measurement storage
//!
//! A [`Measurement`] pairs a geometry with its cached canonical metric and
//! derived style. The [`MeasurementCollection`] owns every measurement of a
//! session; only the session mutates it.

use crate::geometry::{GeometryId, GeometryKind, MapCoordinate, MeasureGeometry};
use crate::metrics::{self, GeometryMetrics, MetricMode};
use crate::projection::Projection;
use crate::style::{style_for, MeasurementStyle, StyleOptions};
use crate::units::{format_value, DisplayUnits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to turn a geometry into a metric
pub struct MetricContext<'a> {
    pub projection: &'a dyn Projection,
    pub mode: MetricMode,
}

/// A measured geometry with its cached metric and style
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Stable identifier
    id: GeometryId,
    /// Live geometry in map coordinates
    geometry: MeasureGeometry,
    /// Cached metric in canonical units
    metrics: GeometryMetrics,
    /// Style derived from metric and display units
    style: MeasurementStyle,
}

impl Measurement {
    /// Create a measurement and compute its initial metric and style
    pub fn new(
        id: GeometryId,
        geometry: MeasureGeometry,
        context: &MetricContext<'_>,
        units: &DisplayUnits,
        options: &StyleOptions,
    ) -> Self {
        let metrics = metrics::evaluate(&geometry, context.projection, context.mode);
        let style = style_for(&geometry, &metrics, units, options);
        Self {
            id,
            geometry,
            metrics,
            style,
        }
    }

    /// Get the measurement ID
    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    /// Get the geometry
    pub fn geometry(&self) -> &MeasureGeometry {
        &self.geometry
    }

    /// Canonical value: meters for lines, square meters for polygons
    pub fn value(&self) -> f64 {
        self.metrics.value
    }

    pub fn metrics(&self) -> &GeometryMetrics {
        &self.metrics
    }

    pub fn style(&self) -> &MeasurementStyle {
        &self.style
    }

    /// Get the formatted label
    pub fn formatted_label(&self) -> &str {
        self.style.label_text()
    }

    /// Replace the geometry. Metric and style must be refreshed afterwards.
    pub(crate) fn set_geometry(&mut self, geometry: MeasureGeometry) {
        self.geometry = geometry;
    }

    /// Recompute the cached metric from the live geometry
    pub(crate) fn recompute(&mut self, context: &MetricContext<'_>) {
        self.metrics = metrics::evaluate(&self.geometry, context.projection, context.mode);
    }

    /// Re-derive the style from the cached metric
    pub(crate) fn restyle(&mut self, units: &DisplayUnits, options: &StyleOptions) {
        self.style = style_for(&self.geometry, &self.metrics, units, options);
    }
}

/// The currently tracked measurement, backing the floating readout
///
/// Always canonical units. All fields are `None` when nothing is active;
/// while a draw has started but no vertex exists yet only `kind` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub value: Option<f64>,
    pub geometry_id: Option<GeometryId>,
    pub kind: Option<GeometryKind>,
}

impl MeasurementRecord {
    /// Nothing active
    pub fn empty() -> Self {
        Self::default()
    }

    /// A draw of `kind` is armed but has no geometry yet
    pub fn pending(kind: GeometryKind) -> Self {
        Self {
            value: None,
            geometry_id: None,
            kind: Some(kind),
        }
    }

    /// Tracking a live measurement
    pub fn tracking(measurement: &Measurement) -> Self {
        Self {
            value: Some(measurement.value()),
            geometry_id: Some(measurement.id()),
            kind: Some(measurement.kind()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.geometry_id.is_none() && self.kind.is_none()
    }

    /// Whether the record points at the given geometry
    pub fn references(&self, id: GeometryId) -> bool {
        self.geometry_id == Some(id)
    }

    /// Readout text in the display unit of the record's kind
    ///
    /// A record without a value reads `"0.00 {unit}"`; a record without a
    /// kind uses the length unit.
    pub fn display_text(&self, units: &DisplayUnits) -> String {
        let kind = self.kind.unwrap_or(GeometryKind::Line);
        match self.value {
            Some(value) => units.format(kind, value),
            None => format_value(0.0, units.label(kind)),
        }
    }
}

/// Collection of measurements in creation order
#[derive(Debug, Default)]
pub struct MeasurementCollection {
    /// All measurements indexed by ID
    measurements: HashMap<GeometryId, Measurement>,
    /// Creation order, oldest first
    order: Vec<GeometryId>,
}

impl MeasurementCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a measurement
    pub(crate) fn add(&mut self, measurement: Measurement) {
        let id = measurement.id();
        if self.measurements.insert(id, measurement).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a measurement
    pub(crate) fn remove(&mut self, id: GeometryId) -> Option<Measurement> {
        let removed = self.measurements.remove(&id)?;
        self.order.retain(|&mid| mid != id);
        Some(removed)
    }

    /// Get a measurement by ID
    pub fn get(&self, id: GeometryId) -> Option<&Measurement> {
        self.measurements.get(&id)
    }

    /// Get a mutable measurement by ID
    pub(crate) fn get_mut(&mut self, id: GeometryId) -> Option<&mut Measurement> {
        self.measurements.get_mut(&id)
    }

    pub fn contains(&self, id: GeometryId) -> bool {
        self.measurements.contains_key(&id)
    }

    /// Measurements in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> + '_ {
        self.order.iter().filter_map(|id| self.measurements.get(id))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Measurement> + '_ {
        self.measurements.values_mut()
    }

    /// IDs in creation order
    pub fn ids(&self) -> &[GeometryId] {
        &self.order
    }

    /// IDs of all measurements of one kind, in creation order
    pub fn ids_of_kind(&self, kind: GeometryKind) -> Vec<GeometryId> {
        self.iter()
            .filter(|m| m.kind() == kind)
            .map(|m| m.id())
            .collect()
    }

    /// Get total count of measurements
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn count_of_kind(&self, kind: GeometryKind) -> usize {
        self.measurements.values().filter(|m| m.kind() == kind).count()
    }

    /// Topmost (most recently created) measurement hit by a point
    pub fn hit_test(
        &self,
        point: &MapCoordinate,
        tolerance: f64,
        skip: Option<GeometryId>,
    ) -> Option<GeometryId> {
        self.order
            .iter()
            .rev()
            .filter(|id| Some(**id) != skip)
            .filter_map(|id| self.measurements.get(id))
            .find(|m| m.geometry().contains_point(point, tolerance))
            .map(|m| m.id())
    }

    /// Topmost measurement with a vertex near a point, and that vertex index
    pub fn vertex_hit_test(
        &self,
        point: &MapCoordinate,
        tolerance: f64,
        skip: Option<GeometryId>,
    ) -> Option<(GeometryId, usize)> {
        self.order
            .iter()
            .rev()
            .filter(|id| Some(**id) != skip)
            .filter_map(|id| self.measurements.get(id))
            .find_map(|m| {
                m.geometry()
                    .nearest_vertex(point, tolerance)
                    .map(|index| (m.id(), index))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Geographic;
    use crate::units::{AreaUnit, LengthUnit};
    use approx::assert_relative_eq;

    fn context() -> MetricContext<'static> {
        MetricContext {
            projection: &Geographic,
            mode: MetricMode::Planar,
        }
    }

    fn line(points: &[(f64, f64)]) -> MeasureGeometry {
        MeasureGeometry::line(points.iter().map(|(x, y)| MapCoordinate::new(*x, *y)).collect())
    }

    fn measurement(geometry: MeasureGeometry) -> Measurement {
        Measurement::new(
            GeometryId::now_v7(),
            geometry,
            &context(),
            &DisplayUnits::default(),
            &StyleOptions::default(),
        )
    }

    #[test]
    fn test_measurement_distance() {
        let m = measurement(line(&[(0.0, 0.0), (0.0, 0.001), (0.001, 0.001)]));
        assert_relative_eq!(m.value(), 222.278, max_relative = 1e-9);
        assert_eq!(m.formatted_label(), "0.22 km");
        assert_eq!(m.kind(), GeometryKind::Line);
    }

    #[test]
    fn test_recompute_after_geometry_change() {
        let mut m = measurement(line(&[(0.0, 0.0), (0.0, 0.001)]));
        m.set_geometry(line(&[(0.0, 0.0), (0.0, 0.01)]));
        m.recompute(&context());
        let units = DisplayUnits::new(LengthUnit::Meters, AreaUnit::SquareMeters);
        m.restyle(&units, &StyleOptions::default());
        assert_relative_eq!(m.value(), 1111.39, max_relative = 1e-9);
        assert_eq!(m.formatted_label(), "1111.39 meters");
    }

    #[test]
    fn test_record_display_text() {
        let units = DisplayUnits::default();
        assert_eq!(MeasurementRecord::empty().display_text(&units), "0.00 km");
        assert_eq!(
            MeasurementRecord::pending(GeometryKind::Polygon).display_text(&units),
            "0.00 km²"
        );
        let m = measurement(line(&[(0.0, 0.0), (0.0, 0.01)]));
        let record = MeasurementRecord::tracking(&m);
        assert!(record.references(m.id()));
        assert_eq!(record.display_text(&units), "1.11 km");
    }

    #[test]
    fn test_measurement_collection() {
        let mut collection = MeasurementCollection::new();
        let first = measurement(line(&[(0.0, 0.0), (1.0, 0.0)]));
        let second = measurement(MeasureGeometry::polygon(vec![
            MapCoordinate::new(0.0, 0.0),
            MapCoordinate::new(1.0, 0.0),
            MapCoordinate::new(1.0, 1.0),
        ]));
        let (first_id, second_id) = (first.id(), second.id());
        collection.add(first);
        collection.add(second);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.ids(), &[first_id, second_id]);
        assert_eq!(collection.ids_of_kind(GeometryKind::Polygon), vec![second_id]);
        assert_eq!(collection.count_of_kind(GeometryKind::Line), 1);

        assert!(collection.remove(first_id).is_some());
        assert!(collection.remove(first_id).is_none());
        assert_eq!(collection.ids(), &[second_id]);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut collection = MeasurementCollection::new();
        let bottom = measurement(line(&[(0.0, 0.0), (10.0, 0.0)]));
        let top = measurement(line(&[(5.0, -5.0), (5.0, 5.0)]));
        let (bottom_id, top_id) = (bottom.id(), top.id());
        collection.add(bottom);
        collection.add(top);

        let at_crossing = MapCoordinate::new(5.0, 0.0);
        assert_eq!(collection.hit_test(&at_crossing, 0.1, None), Some(top_id));
        assert_eq!(collection.hit_test(&at_crossing, 0.1, Some(top_id)), Some(bottom_id));
        assert_eq!(
            collection.vertex_hit_test(&MapCoordinate::new(10.0, 0.2), 0.5, None),
            Some((bottom_id, 1))
        );
        assert!(collection
            .hit_test(&MapCoordinate::new(50.0, 50.0), 0.1, None)
            .is_none());
    }
}
