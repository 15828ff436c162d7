//! Measurement session state machine
//!
//! The session owns every measurement geometry, the change-listener
//! registry, the display-unit selection and the current measurement record.
//! Interaction callbacks (draw, modify, select) and the clear/exit actions
//! are its only mutation points.
//!
//! Invariants held after every public call:
//! - at most one draw is active, and at most one in-progress sketch exists;
//! - a record that names a geometry names one that exists;
//! - listeners exist only for the sketch being drawn and the geometry being
//!   modified.
//!
//! Operations never fail. Unknown or stale geometry IDs, repeated exits and
//! clears of an empty session are no-ops.

use crate::config::EngineConfig;
use crate::geometry::{GeometryId, GeometryKind, MapCoordinate, MeasureGeometry};
use crate::listeners::{ListenerRegistry, ListenerScope};
use crate::measurement::{Measurement, MeasurementCollection, MeasurementRecord, MetricContext};
use crate::projection::{Projection, ProjectionCode};
use crate::units::{AreaUnit, DisplayUnit, DisplayUnits, LengthUnit};
use serde::{Deserialize, Serialize};

/// Drawing state of the session
///
/// Idle and the drawing modes are mutually exclusive. Editing and selecting
/// are tracked separately in [`Capabilities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Idle,
    DrawingLine,
    DrawingPolygon,
}

impl SessionMode {
    pub fn drawing(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Line => SessionMode::DrawingLine,
            GeometryKind::Polygon => SessionMode::DrawingPolygon,
        }
    }

    /// Kind being drawn, if any
    pub fn draw_kind(&self) -> Option<GeometryKind> {
        match self {
            SessionMode::Idle => None,
            SessionMode::DrawingLine => Some(GeometryKind::Line),
            SessionMode::DrawingPolygon => Some(GeometryKind::Polygon),
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.draw_kind().is_some()
    }
}

/// Editing and selecting, enabled together once a measurement starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Vertex dragging on existing geometries
    pub editing: bool,
    /// Click-to-select of existing geometries
    pub selecting: bool,
}

impl Capabilities {
    pub fn any(&self) -> bool {
        self.editing || self.selecting
    }
}

/// Interactions the host should have attached to its map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    /// The single draw interaction, by kind
    pub draw: Option<GeometryKind>,
    pub modify: bool,
    pub select: bool,
}

/// Notification sent to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Drawing mode or capabilities changed
    ModeChanged {
        mode: SessionMode,
        capabilities: Capabilities,
    },
    /// The geometry set became empty (`true`) or non-empty (`false`)
    GeometriesChanged { empty: bool },
    /// Geometries were removed
    GeometriesRemoved(Vec<GeometryId>),
    /// The current measurement record changed, or its units did
    MeasurementChanged(MeasurementRecord),
    /// Styles of these geometries were re-derived
    StylesChanged(Vec<GeometryId>),
}

/// Identifier returned by [`MeasurementSession::subscribe`]
pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&SessionEvent)>;

/// The single active draw interaction
#[derive(Debug, Clone, Copy)]
struct ActiveDraw {
    kind: GeometryKind,
    /// Geometry created by draw-start, until draw-end
    sketch: Option<GeometryId>,
}

/// Serializable view of one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub id: GeometryId,
    pub kind: GeometryKind,
    pub vertices: Vec<MapCoordinate>,
    /// Canonical value
    pub value: f64,
    pub label: String,
}

/// Serializable view of a whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub capabilities: Capabilities,
    pub units: DisplayUnits,
    pub record: MeasurementRecord,
    pub readout: String,
    pub geometries: Vec<GeometrySnapshot>,
}

/// Interactive measurement session
pub struct MeasurementSession {
    config: EngineConfig,
    projection: Box<dyn Projection>,
    mode: SessionMode,
    capabilities: Capabilities,
    draw: Option<ActiveDraw>,
    measurements: MeasurementCollection,
    listeners: ListenerRegistry,
    record: MeasurementRecord,
    selection: Option<GeometryId>,
    units: DisplayUnits,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl std::fmt::Debug for MeasurementSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementSession")
            .field("projection", &self.projection.code())
            .field("mode", &self.mode)
            .field("capabilities", &self.capabilities)
            .field("measurements", &self.measurements.len())
            .field("listeners", &self.listeners.len())
            .field("record", &self.record)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

impl MeasurementSession {
    /// Create an idle session on a map with the given projection
    pub fn new(config: EngineConfig, projection: Box<dyn Projection>) -> Self {
        let units = config.initial_units();
        Self {
            config,
            projection,
            mode: SessionMode::Idle,
            capabilities: Capabilities::default(),
            draw: None,
            measurements: MeasurementCollection::new(),
            listeners: ListenerRegistry::new(),
            record: MeasurementRecord::empty(),
            selection: None,
            units,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Create a session using one of the built-in projections
    pub fn with_projection(config: EngineConfig, code: ProjectionCode) -> Self {
        Self::new(config, code.boxed())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a callback for session events
    pub fn subscribe(&mut self, callback: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        self.subscribers
            .push((self.next_subscription, Box::new(callback)));
        self.next_subscription
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: SessionEvent) {
        log::trace!("session event: {:?}", event);
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }

    fn set_mode(&mut self, mode: SessionMode, capabilities: Capabilities) {
        if self.mode == mode && self.capabilities == capabilities {
            return;
        }
        log::debug!(
            "mode {:?} -> {:?} (editing: {}, selecting: {})",
            self.mode,
            mode,
            capabilities.editing,
            capabilities.selecting
        );
        self.mode = mode;
        self.capabilities = capabilities;
        self.emit(SessionEvent::ModeChanged { mode, capabilities });
    }

    fn set_record(&mut self, record: MeasurementRecord) {
        if self.record != record {
            self.record = record;
            self.emit(SessionEvent::MeasurementChanged(record));
        }
    }

    fn emit_emptiness_change(&mut self, was_empty: bool) {
        let empty = self.measurements.is_empty();
        if empty != was_empty {
            self.emit(SessionEvent::GeometriesChanged { empty });
        }
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    /// Recompute metric and style of one geometry from its live vertices
    fn refresh(&mut self, id: GeometryId) -> bool {
        let context = MetricContext {
            projection: self.projection.as_ref(),
            mode: self.config.metric_mode,
        };
        let options = self.config.style_options();
        match self.measurements.get_mut(id) {
            Some(measurement) => {
                measurement.recompute(&context);
                measurement.restyle(&self.units, &options);
                log::trace!("{} {} -> {}", measurement.kind(), id, measurement.value());
                true
            }
            None => false,
        }
    }

    fn tracking_record(&self, id: GeometryId) -> Option<MeasurementRecord> {
        self.measurements.get(id).map(MeasurementRecord::tracking)
    }

    /// Record to fall back to when the tracked geometry goes away
    fn idle_record(&self) -> MeasurementRecord {
        match self.draw {
            Some(draw) => MeasurementRecord::pending(draw.kind),
            None => MeasurementRecord::empty(),
        }
    }

    /// Remove a geometry together with everything that points at it
    ///
    /// This is the only path that deletes geometries. It updates state
    /// silently; callers emit events once the whole operation is applied.
    fn detach_geometry(&mut self, id: GeometryId) -> bool {
        if self.measurements.remove(id).is_none() {
            return false;
        }
        self.listeners.unregister(id);
        if self.selection == Some(id) {
            self.selection = None;
        }
        if let Some(draw) = self.draw.as_mut() {
            if draw.sketch == Some(id) {
                draw.sketch = None;
            }
        }
        if self.record.references(id) {
            self.record = self.idle_record();
        }
        true
    }

    /// Remove a batch of geometries as one transaction, then notify
    fn remove_geometries(&mut self, ids: Vec<GeometryId>) -> usize {
        let was_empty = self.measurements.is_empty();
        let record_before = self.record;
        let removed: Vec<GeometryId> = ids
            .into_iter()
            .filter(|id| self.detach_geometry(*id))
            .collect();

        if !removed.is_empty() {
            log::debug!("removed {} geometries", removed.len());
            let count = removed.len();
            self.emit(SessionEvent::GeometriesRemoved(removed));
            if self.record != record_before {
                let record = self.record;
                self.emit(SessionEvent::MeasurementChanged(record));
            }
            self.emit_emptiness_change(was_empty);
            count
        } else {
            0
        }
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Arm a draw of the given kind
    ///
    /// An active draw is cancelled first, discarding its sketch, so two
    /// draws never coexist. Editing and selecting are enabled as configured
    /// so earlier geometries stay adjustable while drawing.
    pub fn start_measurement(&mut self, kind: GeometryKind) {
        if let Some(previous) = self.draw.take() {
            log::debug!("cancelling {} draw to start {} draw", previous.kind, kind);
            if let Some(sketch) = previous.sketch {
                self.remove_geometries(vec![sketch]);
            }
        }
        self.draw = Some(ActiveDraw { kind, sketch: None });
        self.selection = None;
        let capabilities = Capabilities {
            editing: self.config.enable_modify_after_draw,
            selecting: self.config.enable_select,
        };
        self.set_mode(SessionMode::drawing(kind), capabilities);
        self.set_record(MeasurementRecord::pending(kind));
    }

    /// Draw-start callback: the first vertex of a new geometry was placed
    ///
    /// Assigns a fresh ID, stores the geometry and attaches a change listener
    /// so every later vertex update drives the live readout. Returns `None`
    /// if no draw of the geometry's kind is active.
    pub fn on_draw_start(&mut self, geometry: MeasureGeometry) -> Option<GeometryId> {
        let draw = match self.draw {
            Some(draw) if draw.kind == geometry.kind() => draw,
            Some(draw) => {
                log::warn!(
                    "ignoring {} draw-start during {} draw",
                    geometry.kind(),
                    draw.kind
                );
                return None;
            }
            None => {
                log::warn!("ignoring draw-start without an active draw");
                return None;
            }
        };
        if let Some(stale) = draw.sketch {
            log::debug!("draw restarted, discarding sketch {}", stale);
            self.remove_geometries(vec![stale]);
        }

        let id = GeometryId::now_v7();
        let was_empty = self.measurements.is_empty();
        let context = MetricContext {
            projection: self.projection.as_ref(),
            mode: self.config.metric_mode,
        };
        let measurement = Measurement::new(
            id,
            geometry,
            &context,
            &self.units,
            &self.config.style_options(),
        );
        let record = MeasurementRecord::tracking(&measurement);
        self.measurements.add(measurement);
        self.listeners.register(id, ListenerScope::Draw);
        if let Some(draw) = self.draw.as_mut() {
            draw.sketch = Some(id);
        }
        log::debug!("draw-start {} {}", draw.kind, id);

        self.emit_emptiness_change(was_empty);
        self.emit(SessionEvent::StylesChanged(vec![id]));
        self.set_record(record);
        Some(id)
    }

    /// Geometry-change callback: the vertices of a geometry changed
    ///
    /// The metric and style are recomputed synchronously. If the geometry
    /// has a live listener (drawing or modifying) or is the tracked
    /// measurement, the record follows the change. Stale IDs are ignored.
    pub fn on_geometry_change(&mut self, id: GeometryId, geometry: MeasureGeometry) -> bool {
        match self.measurements.get_mut(id) {
            Some(measurement) if measurement.kind() == geometry.kind() => {
                measurement.set_geometry(geometry);
            }
            Some(measurement) => {
                log::warn!(
                    "ignoring {} geometry for {} measurement {}",
                    geometry.kind(),
                    measurement.kind(),
                    id
                );
                return false;
            }
            None => {
                log::warn!("ignoring change for unknown geometry {}", id);
                return false;
            }
        }
        self.refresh(id);
        self.emit(SessionEvent::StylesChanged(vec![id]));

        if self.listeners.is_listening(id) || self.record.references(id) {
            if let Some(record) = self.tracking_record(id) {
                self.set_record(record);
            }
        }
        true
    }

    /// Move one vertex of a geometry. Same semantics as
    /// [`on_geometry_change`](Self::on_geometry_change).
    pub fn move_vertex(&mut self, id: GeometryId, index: usize, position: MapCoordinate) -> bool {
        let Some(mut geometry) = self.measurements.get(id).map(|m| m.geometry().clone()) else {
            log::warn!("ignoring vertex move on unknown geometry {}", id);
            return false;
        };
        if !geometry.set_vertex(index, position) {
            return false;
        }
        self.on_geometry_change(id, geometry)
    }

    /// Draw-end callback: the sketch was finished
    ///
    /// Detaches the draw listener, bakes the final metric and style, and
    /// returns the session to idle with editing/selecting left enabled. A
    /// sketch with too few vertices is discarded. Returns `true` if the
    /// geometry was kept.
    pub fn on_draw_end(&mut self, id: GeometryId) -> bool {
        let draw = match self.draw {
            Some(draw) if draw.sketch == Some(id) => draw,
            _ => {
                log::warn!("ignoring draw-end for {} which is not being drawn", id);
                return false;
            }
        };

        self.listeners.unregister_scoped(id, ListenerScope::Draw);
        let complete = self
            .measurements
            .get(id)
            .map(|m| m.geometry().is_complete())
            .unwrap_or(false);

        if complete {
            self.draw = None;
            self.refresh(id);
            self.emit(SessionEvent::StylesChanged(vec![id]));
            if let Some(record) = self.tracking_record(id) {
                self.set_record(record);
            }
            log::debug!("draw-end {} {}", draw.kind, id);
        } else {
            log::debug!("draw-end {} {} with too few vertices, discarded", draw.kind, id);
            self.remove_geometries(vec![id]);
            self.draw = None;
            self.set_record(MeasurementRecord::empty());
        }

        let capabilities = self.capabilities;
        self.set_mode(SessionMode::Idle, capabilities);
        complete
    }

    /// Disarm the draw, discarding its sketch. Finished geometries and
    /// capabilities are untouched.
    pub fn cancel_drawing(&mut self) {
        let Some(draw) = self.draw.take() else {
            return;
        };
        log::debug!("cancelling {} draw", draw.kind);
        if let Some(sketch) = draw.sketch {
            self.remove_geometries(vec![sketch]);
        }
        if self.record.geometry_id.is_none() {
            self.set_record(MeasurementRecord::empty());
        }
        let capabilities = self.capabilities;
        self.set_mode(SessionMode::Idle, capabilities);
    }

    // ------------------------------------------------------------------
    // Modify and select
    // ------------------------------------------------------------------

    /// Modify-start callback: a finished geometry is about to be reshaped
    ///
    /// Attaches a change listener scoped to exactly this geometry, replacing
    /// any modify listener left on another one.
    pub fn on_modify_start(&mut self, id: GeometryId) -> bool {
        if !self.capabilities.editing {
            log::warn!("ignoring modify-start while editing is disabled");
            return false;
        }
        if !self.measurements.contains(id) {
            log::warn!("ignoring modify-start for unknown geometry {}", id);
            return false;
        }
        if self.draw.and_then(|d| d.sketch) == Some(id) {
            log::warn!("ignoring modify-start on sketch {}", id);
            return false;
        }
        for stale in self.listeners.unregister_scope(ListenerScope::Modify) {
            log::warn!("modify listener on {} was never released", stale);
        }
        self.listeners.register(id, ListenerScope::Modify);
        if let Some(record) = self.tracking_record(id) {
            self.set_record(record);
        }
        true
    }

    /// Modify-end callback: detaches the listener of this geometry
    ///
    /// Idempotent; ending a modify that never started is a no-op.
    pub fn on_modify_end(&mut self, id: GeometryId) -> bool {
        if self
            .listeners
            .unregister_scoped(id, ListenerScope::Modify)
            .is_none()
        {
            return false;
        }
        if self.refresh(id) {
            self.emit(SessionEvent::StylesChanged(vec![id]));
        }
        true
    }

    /// Select callback: a geometry was selected, or the selection cleared
    pub fn on_select(&mut self, selection: Option<GeometryId>) {
        match selection {
            Some(id) => {
                if !self.capabilities.selecting {
                    log::warn!("ignoring selection while selecting is disabled");
                    return;
                }
                match self.tracking_record(id) {
                    Some(record) => {
                        self.selection = Some(id);
                        self.set_record(record);
                    }
                    None => log::warn!("ignoring selection of unknown geometry {}", id),
                }
            }
            None => {
                self.selection = None;
                self.set_record(MeasurementRecord::empty());
            }
        }
    }

    // ------------------------------------------------------------------
    // Clear and exit
    // ------------------------------------------------------------------

    /// Remove every line, including a line sketch in progress
    pub fn clear_lines(&mut self) -> usize {
        let ids = self.measurements.ids_of_kind(GeometryKind::Line);
        self.remove_geometries(ids)
    }

    /// Remove every polygon, including a polygon sketch in progress
    pub fn clear_areas(&mut self) -> usize {
        let ids = self.measurements.ids_of_kind(GeometryKind::Polygon);
        self.remove_geometries(ids)
    }

    /// Remove every geometry. The mode is left as it is.
    pub fn clear_all(&mut self) -> usize {
        let ids = self.measurements.ids().to_vec();
        self.remove_geometries(ids)
    }

    /// Leave measurement mode without deleting finished geometries
    ///
    /// Disarms the draw (discarding its sketch), releases any modify
    /// listener, clears the selection and disables editing and selecting.
    pub fn exit_measurement_mode(&mut self) {
        if let Some(draw) = self.draw.take() {
            if let Some(sketch) = draw.sketch {
                self.remove_geometries(vec![sketch]);
            }
        }
        self.listeners.unregister_scope(ListenerScope::Modify);
        self.selection = None;
        if self.record.geometry_id.is_none() {
            self.set_record(MeasurementRecord::empty());
        }
        self.set_mode(SessionMode::Idle, Capabilities::default());
    }

    /// Delete every geometry and leave measurement mode
    pub fn clear_measurements(&mut self) {
        self.clear_all();
        self.exit_measurement_mode();
        self.set_record(MeasurementRecord::empty());
    }

    /// Tear the session down when its map goes away
    pub fn detach(&mut self) {
        self.clear_measurements();
        self.listeners.clear();
        self.subscribers.clear();
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Change a display unit and re-style every geometry
    ///
    /// Canonical values are untouched. Returns `false` if the unit was
    /// already selected.
    pub fn set_display_unit(&mut self, unit: DisplayUnit) -> bool {
        if !self.units.apply(unit) {
            return false;
        }
        log::debug!("display unit for {} set to {:?}", unit.kind(), unit);
        let options = self.config.style_options();
        for measurement in self.measurements.iter_mut() {
            measurement.restyle(&self.units, &options);
        }
        let ids = self.measurements.ids().to_vec();
        if !ids.is_empty() {
            self.emit(SessionEvent::StylesChanged(ids));
        }
        let record = self.record;
        self.emit(SessionEvent::MeasurementChanged(record));
        true
    }

    pub fn set_length_unit(&mut self, unit: LengthUnit) -> bool {
        self.set_display_unit(DisplayUnit::Line(unit))
    }

    pub fn set_area_unit(&mut self, unit: AreaUnit) -> bool {
        self.set_display_unit(DisplayUnit::Polygon(unit))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_drawing(&self) -> bool {
        self.draw.is_some()
    }

    /// Whether a draw is armed or editing/selecting is enabled
    pub fn is_active(&self) -> bool {
        self.is_drawing() || self.capabilities.any()
    }

    /// Geometry currently being drawn
    pub fn sketch(&self) -> Option<GeometryId> {
        self.draw.and_then(|d| d.sketch)
    }

    /// Interactions the host should have attached right now
    pub fn interactions(&self) -> Interactions {
        Interactions {
            draw: self.draw.map(|d| d.kind),
            modify: self.capabilities.editing,
            select: self.capabilities.selecting,
        }
    }

    /// The current measurement record
    pub fn current_measurement(&self) -> MeasurementRecord {
        self.record
    }

    /// Floating readout text for the current measurement
    pub fn readout_text(&self) -> String {
        self.record.display_text(&self.units)
    }

    pub fn units(&self) -> DisplayUnits {
        self.units
    }

    pub fn measurements(&self) -> &MeasurementCollection {
        &self.measurements
    }

    pub fn get(&self, id: GeometryId) -> Option<&Measurement> {
        self.measurements.get(id)
    }

    pub fn has_geometries(&self) -> bool {
        !self.measurements.is_empty()
    }

    pub fn selection(&self) -> Option<GeometryId> {
        self.selection
    }

    /// Geometry under a modify interaction, if any
    pub fn editing(&self) -> Option<GeometryId> {
        self.measurements
            .ids()
            .iter()
            .copied()
            .find(|id| {
                self.listeners
                    .get(*id)
                    .is_some_and(|h| h.scope == ListenerScope::Modify)
            })
    }

    /// Number of live change listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, id: GeometryId) -> bool {
        self.listeners.is_listening(id)
    }

    /// Serializable view of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            capabilities: self.capabilities,
            units: self.units,
            record: self.record,
            readout: self.readout_text(),
            geometries: self
                .measurements
                .iter()
                .map(|m| GeometrySnapshot {
                    id: m.id(),
                    kind: m.kind(),
                    vertices: m.geometry().vertices().to_vec(),
                    value: m.value(),
                    label: m.formatted_label().to_string(),
                })
                .collect(),
        }
    }
}
