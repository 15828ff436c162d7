//! Error types
//!
//! Errors only arise at parsing and configuration boundaries. Session and
//! interaction operations never fail: degenerate input measures as zero and
//! stale identifiers are ignored.

use std::io;

/// Errors raised while parsing user-facing values
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("unknown length unit: {0}")]
    UnknownLengthUnit(String),
    #[error("unknown area unit: {0}")]
    UnknownAreaUnit(String),
    #[error("unknown projection: {0}")]
    UnknownProjection(String),
    #[error("invalid coordinate {0:?} (expected X,Y)")]
    InvalidCoordinate(String),
    #[error("unknown metric mode: {0}")]
    UnknownMetricMode(String),
}

/// Errors raised while loading or saving an engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
