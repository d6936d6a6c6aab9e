//! Multi-person tracking and crowd anomaly detection.
//!
//! Per frame, detections go through the [`Tracker`] (Kalman prediction,
//! appearance/IoU association, lifecycle), and the confirmed tracks feed four
//! analyzers: overcrowding, loitering, restricted-zone entry and fight-like
//! activity. A [`Session`] wires the two together for one stream.

pub mod analysis;
pub mod config;
pub mod error;
pub mod integration;
pub mod session;
pub mod tracker;

pub use analysis::{
    AlertEvent, AlertKind, AnalysisSummary, Analyzer, FrameMeta, Keypoint, Pose, PoseMap, Severity, Zone,
};
pub use config::SessionConfig;
pub use error::{ConfigError, InvalidDetectionError, InvalidZoneError, NumericalError, SinkError};
pub use integration::{
    AlertSink, DetectionBuilder, DetectionSource, JsonLinesSink, NoPoses, Pipeline, PoseSource,
    StopHandle, run_live,
};
pub use session::{AnalysisResult, FrameInput, FrameReport, Session, TrackOverlay, TrackedFrame};
pub use tracker::{Detection, Point, Rect, TrackId, TrackSnapshot, TrackState, Tracker, TrackerConfig};
