//! Display units
//!
//! Measurements are always stored in canonical units (meters, square
//! meters). A unit only scales the value at the display boundary:
//! `display = canonical * scale`. Rounding to two decimals happens in
//! [`format_value`] and nowhere else.

use crate::error::MeasureError;
use crate::geometry::GeometryKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display unit for line lengths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "meters")]
    Meters,
    #[default]
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "miles")]
    Miles,
    #[serde(rename = "feet")]
    Feet,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 4] = [
        LengthUnit::Meters,
        LengthUnit::Kilometers,
        LengthUnit::Miles,
        LengthUnit::Feet,
    ];

    /// Display units per meter
    pub fn scale(&self) -> f64 {
        match self {
            LengthUnit::Meters => 1.0,
            LengthUnit::Kilometers => 0.001,
            LengthUnit::Miles => 0.000_621_371,
            LengthUnit::Feet => 3.280_84,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LengthUnit::Meters => "meters",
            LengthUnit::Kilometers => "km",
            LengthUnit::Miles => "miles",
            LengthUnit::Feet => "feet",
        }
    }

    pub fn from_meters(&self, meters: f64) -> f64 {
        meters * self.scale()
    }

    pub fn to_meters(&self, value: f64) -> f64 {
        value / self.scale()
    }
}

impl FromStr for LengthUnit {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meters" | "m" | "meter" | "metres" => Ok(LengthUnit::Meters),
            "km" | "kilometers" | "kilometres" => Ok(LengthUnit::Kilometers),
            "miles" | "mi" | "mile" => Ok(LengthUnit::Miles),
            "feet" | "ft" | "foot" => Ok(LengthUnit::Feet),
            _ => Err(MeasureError::UnknownLengthUnit(s.to_string())),
        }
    }
}

impl std::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Display unit for polygon areas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaUnit {
    #[serde(rename = "sqmeters")]
    SquareMeters,
    #[default]
    #[serde(rename = "km²")]
    SquareKilometers,
    #[serde(rename = "acres")]
    Acres,
    #[serde(rename = "sqfeet")]
    SquareFeet,
}

impl AreaUnit {
    pub const ALL: [AreaUnit; 4] = [
        AreaUnit::SquareMeters,
        AreaUnit::SquareKilometers,
        AreaUnit::Acres,
        AreaUnit::SquareFeet,
    ];

    /// Display units per square meter
    pub fn scale(&self) -> f64 {
        match self {
            AreaUnit::SquareMeters => 1.0,
            AreaUnit::SquareKilometers => 1e-6,
            AreaUnit::Acres => 0.000_247_105,
            AreaUnit::SquareFeet => 10.7639,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AreaUnit::SquareMeters => "sqmeters",
            AreaUnit::SquareKilometers => "km²",
            AreaUnit::Acres => "acres",
            AreaUnit::SquareFeet => "sqfeet",
        }
    }

    pub fn from_square_meters(&self, square_meters: f64) -> f64 {
        square_meters * self.scale()
    }

    pub fn to_square_meters(&self, value: f64) -> f64 {
        value / self.scale()
    }
}

impl FromStr for AreaUnit {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqmeters" | "m²" | "m2" | "sqm" => Ok(AreaUnit::SquareMeters),
            "km²" | "km2" | "sqkm" => Ok(AreaUnit::SquareKilometers),
            "acres" | "acre" | "ac" => Ok(AreaUnit::Acres),
            "sqfeet" | "ft²" | "ft2" | "sqft" => Ok(AreaUnit::SquareFeet),
            _ => Err(MeasureError::UnknownAreaUnit(s.to_string())),
        }
    }
}

impl std::fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit selection for one geometry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "unit", rename_all = "lowercase")]
pub enum DisplayUnit {
    Line(LengthUnit),
    Polygon(AreaUnit),
}

impl DisplayUnit {
    pub fn kind(&self) -> GeometryKind {
        match self {
            DisplayUnit::Line(_) => GeometryKind::Line,
            DisplayUnit::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Parse a unit name for the given geometry kind
    pub fn parse(kind: GeometryKind, name: &str) -> Result<Self, MeasureError> {
        match kind {
            GeometryKind::Line => Ok(DisplayUnit::Line(name.parse()?)),
            GeometryKind::Polygon => Ok(DisplayUnit::Polygon(name.parse()?)),
        }
    }
}

/// The two independent unit selections of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUnits {
    pub length: LengthUnit,
    pub area: AreaUnit,
}

impl DisplayUnits {
    pub fn new(length: LengthUnit, area: AreaUnit) -> Self {
        Self { length, area }
    }

    /// Scale factor applied to canonical values of the given kind
    pub fn scale(&self, kind: GeometryKind) -> f64 {
        match kind {
            GeometryKind::Line => self.length.scale(),
            GeometryKind::Polygon => self.area.scale(),
        }
    }

    pub fn label(&self, kind: GeometryKind) -> &'static str {
        match kind {
            GeometryKind::Line => self.length.label(),
            GeometryKind::Polygon => self.area.label(),
        }
    }

    /// Convert a canonical value to the selected display unit
    pub fn to_display(&self, kind: GeometryKind, canonical: f64) -> f64 {
        canonical * self.scale(kind)
    }

    /// Format a canonical value as `"{value:.2} {unit}"`
    pub fn format(&self, kind: GeometryKind, canonical: f64) -> String {
        format_value(self.to_display(kind, canonical), self.label(kind))
    }

    /// Apply a selection. Returns `true` if it changed anything.
    pub fn apply(&mut self, unit: DisplayUnit) -> bool {
        match unit {
            DisplayUnit::Line(length) => {
                let changed = self.length != length;
                self.length = length;
                changed
            }
            DisplayUnit::Polygon(area) => {
                let changed = self.area != area;
                self.area = area;
                changed
            }
        }
    }
}

/// Presentation rounding: two decimals, then the unit label
pub fn format_value(display_value: f64, unit_label: &str) -> String {
    format!("{:.2} {}", display_value, unit_label)
}
