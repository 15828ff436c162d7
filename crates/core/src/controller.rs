//! Pointer-driven interaction controller
//!
//! Translates raw pointer input (in map coordinates) into the draw, modify
//! and select lifecycle callbacks of a [`MeasurementSession`], and owns the
//! right-click context menu. The controller never touches geometries itself;
//! every change goes through the session.

use crate::geometry::{GeometryId, GeometryKind, MapCoordinate, MeasureGeometry};
use crate::session::{MeasurementSession, SessionMode};
use crate::units::DisplayUnit;
use serde::{Deserialize, Serialize};

/// Mouse button of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Pointer input in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        position: MapCoordinate,
        button: PointerButton,
    },
    Move {
        position: MapCoordinate,
    },
    Up {
        position: MapCoordinate,
        button: PointerButton,
    },
    Click {
        position: MapCoordinate,
        button: PointerButton,
    },
    DoubleClick {
        position: MapCoordinate,
    },
    ContextMenu {
        position: MapCoordinate,
    },
}

/// Entry of the context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuItem {
    ClearLines,
    ClearAreas,
    ClearAll,
    Exit,
}

impl ContextMenuItem {
    pub const ALL: [ContextMenuItem; 4] = [
        ContextMenuItem::ClearLines,
        ContextMenuItem::ClearAreas,
        ContextMenuItem::ClearAll,
        ContextMenuItem::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContextMenuItem::ClearLines => "Clear Lines",
            ContextMenuItem::ClearAreas => "Clear Areas",
            ContextMenuItem::ClearAll => "Clear All",
            ContextMenuItem::Exit => "Exit Measurement",
        }
    }
}

/// An open context menu
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextMenu {
    /// Where the right-click happened
    pub position: MapCoordinate,
}

impl ContextMenu {
    pub fn items(&self) -> &'static [ContextMenuItem] {
        &ContextMenuItem::ALL
    }
}

/// Geometry being drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    /// Session ID of the geometry
    pub id: GeometryId,
    pub kind: GeometryKind,
    /// Vertices placed by clicks
    pub committed: Vec<MapCoordinate>,
    /// Trailing vertex following the pointer
    pub cursor: MapCoordinate,
}

impl Sketch {
    /// Committed vertices plus the rubber-band vertex
    pub fn live_geometry(&self) -> MeasureGeometry {
        let mut vertices = self.committed.clone();
        vertices.push(self.cursor);
        MeasureGeometry::from_vertices(self.kind, vertices)
    }

    /// Committed vertices only
    pub fn committed_geometry(&self) -> MeasureGeometry {
        MeasureGeometry::from_vertices(self.kind, self.committed.clone())
    }
}

/// State of a vertex drag
#[derive(Debug, Clone, Copy, PartialEq)]
struct VertexDrag {
    geometry_id: GeometryId,
    vertex: usize,
    /// Modify-start has been sent to the session
    started: bool,
}

/// Interaction controller owning a measurement session
#[derive(Debug)]
pub struct InteractionController {
    session: MeasurementSession,
    sketch: Option<Sketch>,
    drag: Option<VertexDrag>,
    menu: Option<ContextMenu>,
    /// The click that follows a finished drag is not a click
    suppress_click: bool,
}

impl InteractionController {
    pub fn new(session: MeasurementSession) -> Self {
        Self {
            session,
            sketch: None,
            drag: None,
            menu: None,
            suppress_click: false,
        }
    }

    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }

    pub fn into_session(self) -> MeasurementSession {
        self.session
    }

    pub fn sketch(&self) -> Option<&Sketch> {
        self.sketch.as_ref()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|d| d.started)
    }

    /// Pick radius around `at`, in map units
    fn tolerance(&self, at: MapCoordinate) -> f64 {
        self.session.config().hit_tolerance * self.session.projection().map_units_per_meter(at)
    }

    /// Drop local state that no longer matches the session
    fn reconcile(&mut self) {
        if let Some(sketch) = &self.sketch {
            if self.session.sketch() != Some(sketch.id) {
                log::debug!("sketch {} no longer in session", sketch.id);
                self.sketch = None;
            }
        }
        if let Some(drag) = self.drag {
            if self.session.get(drag.geometry_id).is_none() {
                self.drag = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Inbound API
    // ------------------------------------------------------------------

    /// Start measuring lines or polygons
    pub fn start_measurement(&mut self, kind: GeometryKind) {
        self.menu = None;
        self.release_drag();
        self.session.start_measurement(kind);
        self.reconcile();
    }

    /// Complete the sketch. Returns the ID of the kept geometry.
    pub fn finish_drawing(&mut self) -> Option<GeometryId> {
        self.reconcile();
        let sketch = self.sketch.take()?;
        self.session
            .on_geometry_change(sketch.id, sketch.committed_geometry());
        if self.session.on_draw_end(sketch.id) {
            Some(sketch.id)
        } else {
            None
        }
    }

    /// Abandon the draw (escape)
    pub fn cancel_drawing(&mut self) {
        self.menu = None;
        self.sketch = None;
        self.session.cancel_drawing();
    }

    pub fn clear_lines(&mut self) -> usize {
        self.apply(ContextMenuItem::ClearLines)
    }

    pub fn clear_areas(&mut self) -> usize {
        self.apply(ContextMenuItem::ClearAreas)
    }

    pub fn clear_all(&mut self) -> usize {
        self.apply(ContextMenuItem::ClearAll)
    }

    pub fn exit(&mut self) {
        self.apply(ContextMenuItem::Exit);
    }

    /// Delete everything and leave measurement mode
    pub fn clear_measurements(&mut self) {
        self.menu = None;
        self.release_drag();
        self.session.clear_measurements();
        self.reconcile();
    }

    pub fn set_display_unit(&mut self, unit: DisplayUnit) -> bool {
        self.session.set_display_unit(unit)
    }

    /// Floating readout text
    pub fn readout_text(&self) -> String {
        self.session.readout_text()
    }

    /// Where the floating readout is drawn: the pointer end of the sketch,
    /// or the label anchor of the tracked geometry
    pub fn readout_anchor(&self) -> Option<MapCoordinate> {
        if let Some(sketch) = &self.sketch {
            return Some(sketch.cursor);
        }
        let id = self.session.current_measurement().geometry_id?;
        self.session.get(id).map(|m| m.style().label.anchor)
    }

    // ------------------------------------------------------------------
    // Context menu
    // ------------------------------------------------------------------

    /// Right-click: open the context menu if there is anything to act on
    pub fn open_context_menu(&mut self, position: MapCoordinate) -> bool {
        if self.session.is_drawing() || self.session.has_geometries() {
            self.menu = Some(ContextMenu { position });
            true
        } else {
            self.menu = None;
            false
        }
    }

    pub fn dismiss_context_menu(&mut self) {
        self.menu = None;
    }

    /// Run a context menu entry and close the menu
    pub fn choose(&mut self, item: ContextMenuItem) -> usize {
        self.apply(item)
    }

    fn apply(&mut self, item: ContextMenuItem) -> usize {
        self.menu = None;
        log::debug!("context action: {}", item.label());
        let removed = match item {
            ContextMenuItem::ClearLines => self.session.clear_lines(),
            ContextMenuItem::ClearAreas => self.session.clear_areas(),
            ContextMenuItem::ClearAll => self.session.clear_all(),
            ContextMenuItem::Exit => {
                self.release_drag();
                self.session.exit_measurement_mode();
                0
            }
        };
        self.reconcile();
        removed
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Dispatch a pointer event
    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => self.pointer_down(position, button),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position, button } => self.pointer_up(position, button),
            PointerEvent::Click { position, button } => self.click(position, button),
            PointerEvent::DoubleClick { position } => self.double_click(position),
            PointerEvent::ContextMenu { position } => {
                self.open_context_menu(position);
            }
        }
    }

    /// Button press. A left press on a vertex arms a drag.
    pub fn pointer_down(&mut self, position: MapCoordinate, button: PointerButton) {
        self.reconcile();
        self.suppress_click = false;
        if button != PointerButton::Left || self.menu.is_some() {
            return;
        }
        if !self.session.capabilities().editing {
            return;
        }
        let skip = self.session.sketch();
        let tolerance = self.tolerance(position);
        let hit = self
            .session
            .measurements()
            .vertex_hit_test(&position, tolerance, skip);
        if let Some((geometry_id, vertex)) = hit {
            self.drag = Some(VertexDrag {
                geometry_id,
                vertex,
                started: false,
            });
        }
    }

    /// Pointer motion: drags a vertex or moves the rubber band
    pub fn pointer_move(&mut self, position: MapCoordinate) {
        self.reconcile();
        if let Some(mut drag) = self.drag {
            if !drag.started {
                if !self.session.on_modify_start(drag.geometry_id) {
                    self.drag = None;
                    return;
                }
                drag.started = true;
            }
            self.session
                .move_vertex(drag.geometry_id, drag.vertex, position);
            self.drag = Some(drag);
            return;
        }

        if let Some(sketch) = self.sketch.as_mut() {
            sketch.cursor = position;
            let geometry = sketch.live_geometry();
            let id = sketch.id;
            self.session.on_geometry_change(id, geometry);
        }
    }

    /// Button release: ends a drag
    pub fn pointer_up(&mut self, position: MapCoordinate, button: PointerButton) {
        if button != PointerButton::Left {
            return;
        }
        if let Some(drag) = self.drag {
            if drag.started {
                self.session
                    .move_vertex(drag.geometry_id, drag.vertex, position);
                self.suppress_click = true;
            }
        }
        self.release_drag();
    }

    fn release_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            if drag.started {
                self.session.on_modify_end(drag.geometry_id);
            }
        }
    }

    /// Click: adds a vertex while drawing, selects otherwise
    ///
    /// A click while the context menu is open only dismisses it.
    pub fn click(&mut self, position: MapCoordinate, button: PointerButton) {
        self.reconcile();
        if self.menu.take().is_some() {
            return;
        }
        if std::mem::take(&mut self.suppress_click) {
            return;
        }
        if button != PointerButton::Left {
            return;
        }

        match self.session.mode() {
            SessionMode::DrawingLine | SessionMode::DrawingPolygon => {
                self.add_vertex(position);
            }
            SessionMode::Idle => self.select_at(position),
        }
    }

    /// Double-click: completes the sketch
    ///
    /// Hosts deliver two clicks before the double-click, so the position is
    /// usually committed already.
    pub fn double_click(&mut self, position: MapCoordinate) {
        self.reconcile();
        if self.menu.take().is_some() || !self.session.is_drawing() {
            return;
        }
        self.add_vertex(position);
        self.finish_drawing();
    }

    fn add_vertex(&mut self, position: MapCoordinate) {
        let Some(kind) = self.session.mode().draw_kind() else {
            return;
        };
        let tolerance = self.tolerance(position);

        let Some(sketch) = self.sketch.as_mut() else {
            let geometry = MeasureGeometry::from_vertices(kind, vec![position, position]);
            if let Some(id) = self.session.on_draw_start(geometry) {
                self.sketch = Some(Sketch {
                    id,
                    kind,
                    committed: vec![position],
                    cursor: position,
                });
            }
            return;
        };

        let closes_ring = kind == GeometryKind::Polygon
            && sketch.committed.len() >= kind.min_vertices()
            && sketch.committed[0].distance_to(&position) <= tolerance;
        if closes_ring {
            self.finish_drawing();
            return;
        }
        if sketch
            .committed
            .last()
            .is_some_and(|last| last.distance_to(&position) <= tolerance)
        {
            log::trace!("ignoring repeated vertex at {:?}", position);
            return;
        }

        sketch.committed.push(position);
        sketch.cursor = position;
        let geometry = sketch.live_geometry();
        let id = sketch.id;
        self.session.on_geometry_change(id, geometry);
    }

    fn select_at(&mut self, position: MapCoordinate) {
        if !self.session.capabilities().selecting {
            return;
        }
        let tolerance = self.tolerance(position);
        let hit = self
            .session
            .measurements()
            .hit_test(&position, tolerance, None);
        self.session.on_select(hit);
    }
}
