//! Error types for tracking, analysis and session configuration.

use thiserror::Error;

/// The innovation covariance (or its position block) could not be factored.
///
/// Recovered by the tracker: the affected track is treated as unmatched for
/// the frame.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("numerical error in {stage}: {reason}")]
pub struct NumericalError {
    pub stage: &'static str,
    pub reason: String,
}

impl NumericalError {
    pub(crate) fn new(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// A detection the tracker refuses to consume.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidDetectionError {
    #[error("bounding box has non-finite coordinates")]
    NonFinite,
    #[error("bounding box is inverted or empty: x1={x1}, y1={y1}, x2={x2}, y2={y2}")]
    Malformed { x1: f64, y1: f64, x2: f64, y2: f64 },
    #[error("confidence {0} outside [0, 1]")]
    Confidence(f32),
}

/// A restricted zone polygon rejected at configuration time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidZoneError {
    #[error("zone needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("zone contains non-finite coordinates")]
    NonFinite,
    #[error("zone is degenerate (zero area or repeated vertex)")]
    Degenerate,
    #[error("zone edges {first} and {second} intersect")]
    SelfIntersecting { first: usize, second: usize },
}

/// Session configuration failures. A session never starts with one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("restricted zone {index} is invalid: {source}")]
    InvalidZone {
        index: usize,
        #[source]
        source: InvalidZoneError,
    },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure writing an event to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode event: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write event: {0}")]
    Io(#[from] std::io::Error),
}
