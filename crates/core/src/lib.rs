//! GIS Measurement Core Library
//!
//! Interactive length and area measurement over a map: geometry model,
//! metrics, display units, styles, and the session state machine driven by
//! draw/modify/select interactions.

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod listeners;
pub mod measurement;
pub mod metrics;
pub mod projection;
pub mod session;
pub mod style;
pub mod units;

pub use config::EngineConfig;
pub use controller::{
    ContextMenu, ContextMenuItem, InteractionController, PointerButton, PointerEvent, Sketch,
};
pub use error::{ConfigError, MeasureError};
pub use geometry::{GeoCoordinate, GeometryId, GeometryKind, MapCoordinate, MeasureGeometry};
pub use listeners::{ListenerHandle, ListenerId, ListenerRegistry, ListenerScope};
pub use measurement::{Measurement, MeasurementCollection, MeasurementRecord, MetricContext};
pub use metrics::{GeometryMetrics, MetricMode};
pub use projection::{Geographic, Projection, ProjectionCode, WebMercator};
pub use session::{
    Capabilities, GeometrySnapshot, Interactions, MeasurementSession, SessionEvent, SessionMode,
    SessionSnapshot, SubscriptionId,
};
pub use style::{Color, Fill, MeasurementStyle, Stroke, StyleOptions, TextLabel, VertexMarker};
pub use units::{format_value, AreaUnit, DisplayUnit, DisplayUnits, LengthUnit};
