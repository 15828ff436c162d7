//! Engine configuration
//!
//! One parameterized engine covers every flavour of the measuring tool:
//! which units are shown first, whether finished geometries stay editable,
//! whether they can be selected, and how metrics are computed. A
//! configuration can be built in code, taken from a preset, or loaded from a
//! JSON file; missing fields fall back to the defaults.

use crate::error::ConfigError;
use crate::metrics::MetricMode;
use crate::style::StyleOptions;
use crate::units::{AreaUnit, DisplayUnits, LengthUnit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration of a measurement session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Unit lines are shown in when the session starts
    pub default_length_unit: LengthUnit,
    /// Unit polygons are shown in when the session starts
    pub default_area_unit: AreaUnit,
    /// Keep vertex editing enabled after a draw finishes
    pub enable_modify_after_draw: bool,
    /// Allow click-to-select of finished geometries
    pub enable_select: bool,
    /// Length/area computation
    pub metric_mode: MetricMode,
    /// Label every line segment in addition to the total
    pub segment_labels: bool,
    /// Pick radius for vertices and edges, in ground meters
    pub hit_tolerance: f64,
    /// Vertex marker radius in screen pixels
    pub marker_radius: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_length_unit: LengthUnit::Kilometers,
            default_area_unit: AreaUnit::SquareKilometers,
            enable_modify_after_draw: true,
            enable_select: true,
            metric_mode: MetricMode::Planar,
            segment_labels: false,
            hit_tolerance: 5.0,
            marker_radius: 5.0,
        }
    }
}

impl EngineConfig {
    /// Draw, edit and select; kilometers and square kilometers
    pub fn full() -> Self {
        Self::default()
    }

    /// Meters and square meters, editing but no selection
    pub fn meters_only() -> Self {
        Self::default()
            .with_length_unit(LengthUnit::Meters)
            .with_area_unit(AreaUnit::SquareMeters)
            .with_select(false)
    }

    /// Drawing only: finished geometries are neither editable nor selectable
    pub fn draw_only() -> Self {
        Self::default().with_modify(false).with_select(false)
    }

    /// Sets the initial length unit.
    pub fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.default_length_unit = unit;
        self
    }

    /// Sets the initial area unit.
    pub fn with_area_unit(mut self, unit: AreaUnit) -> Self {
        self.default_area_unit = unit;
        self
    }

    /// Enables or disables vertex editing after a draw.
    pub fn with_modify(mut self, enabled: bool) -> Self {
        self.enable_modify_after_draw = enabled;
        self
    }

    /// Enables or disables click-to-select.
    pub fn with_select(mut self, enabled: bool) -> Self {
        self.enable_select = enabled;
        self
    }

    /// Sets the metric computation mode.
    pub fn with_metric_mode(mut self, mode: MetricMode) -> Self {
        self.metric_mode = mode;
        self
    }

    /// Enables or disables per-segment labels on lines.
    pub fn with_segment_labels(mut self, enabled: bool) -> Self {
        self.segment_labels = enabled;
        self
    }

    /// Sets the pick radius in ground meters.
    pub fn with_hit_tolerance(mut self, tolerance: f64) -> Self {
        self.hit_tolerance = tolerance;
        self
    }

    /// Unit selection a new session starts with
    pub fn initial_units(&self) -> DisplayUnits {
        DisplayUnits::new(self.default_length_unit, self.default_area_unit)
    }

    pub fn style_options(&self) -> StyleOptions {
        StyleOptions {
            segment_labels: self.segment_labels,
            marker_radius: self.marker_radius,
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded measurement config from {}", path.display());
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
