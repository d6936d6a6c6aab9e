//! Anomaly analyzers that consume confirmed tracks frame by frame.
//!
//! Every analyzer owns only per-track state keyed by `TrackId` and releases it
//! when the tracker reports the track as removed.

mod event;
mod loitering;
mod overcrowding;
mod pose;
mod suspicious_activity;
mod zone;
mod zone_violation;

pub use event::{AlertEvent, AlertKind, AnalysisSummary};
pub use loitering::LoiteringAnalyzer;
pub use overcrowding::{OvercrowdingAnalyzer, Severity};
pub use pose::{
    Keypoint, LEFT_HIP, LEFT_SHOULDER, LEFT_WRIST, Pose, PoseMap, RIGHT_HIP, RIGHT_SHOULDER,
    RIGHT_WRIST,
};
pub use suspicious_activity::{SuspiciousActivityAnalyzer, SuspiciousActivityConfig};
pub use zone::Zone;
pub use zone_violation::ZoneViolationAnalyzer;

use crate::tracker::{TrackId, TrackSnapshot};

static NO_POSES: PoseMap = PoseMap::new();

/// Per-frame context shared by all analyzers.
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta<'a> {
    pub frame_number: u64,
    /// Stream time in seconds
    pub timestamp: f64,
    /// Ids the tracker deleted during this frame.
    pub removed_tracks: &'a [TrackId],
    pub poses: &'a PoseMap,
}

impl<'a> FrameMeta<'a> {
    pub fn new(frame_number: u64, timestamp: f64) -> Self {
        Self {
            frame_number,
            timestamp,
            removed_tracks: &[],
            poses: &NO_POSES,
        }
    }

    pub fn with_poses(mut self, poses: &'a PoseMap) -> Self {
        self.poses = poses;
        self
    }

    pub fn with_removed(mut self, removed_tracks: &'a [TrackId]) -> Self {
        self.removed_tracks = removed_tracks;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Analyzer {
    Overcrowding(OvercrowdingAnalyzer),
    Loitering(LoiteringAnalyzer),
    ZoneViolation(ZoneViolationAnalyzer),
    SuspiciousActivity(SuspiciousActivityAnalyzer),
}

impl Analyzer {
    pub fn kind(&self) -> AlertKind {
        match self {
            Analyzer::Overcrowding(_) => AlertKind::Overcrowding,
            Analyzer::Loitering(_) => AlertKind::Loitering,
            Analyzer::ZoneViolation(_) => AlertKind::ZoneViolation,
            Analyzer::SuspiciousActivity(_) => AlertKind::SuspiciousActivity,
        }
    }

    pub fn step(&mut self, tracks: &[TrackSnapshot], frame: &FrameMeta<'_>) -> Vec<AlertEvent> {
        match self {
            Analyzer::Overcrowding(a) => a.step(tracks, frame),
            Analyzer::Loitering(a) => a.step(tracks, frame),
            Analyzer::ZoneViolation(a) => a.step(tracks, frame),
            Analyzer::SuspiciousActivity(a) => a.step(tracks, frame),
        }
    }

    /// Drop any state held for `ids`.
    pub fn forget(&mut self, ids: &[TrackId]) {
        match self {
            // Count-based; holds no per-track state.
            Analyzer::Overcrowding(_) => {}
            Analyzer::Loitering(a) => a.forget(ids),
            Analyzer::ZoneViolation(a) => a.forget(ids),
            Analyzer::SuspiciousActivity(a) => a.forget(ids),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Analyzer::Overcrowding(a) => a.reset(),
            Analyzer::Loitering(a) => a.reset(),
            Analyzer::ZoneViolation(a) => a.reset(),
            Analyzer::SuspiciousActivity(a) => a.reset(),
        }
    }
}

impl From<OvercrowdingAnalyzer> for Analyzer {
    fn from(a: OvercrowdingAnalyzer) -> Self {
        Analyzer::Overcrowding(a)
    }
}

impl From<LoiteringAnalyzer> for Analyzer {
    fn from(a: LoiteringAnalyzer) -> Self {
        Analyzer::Loitering(a)
    }
}

impl From<ZoneViolationAnalyzer> for Analyzer {
    fn from(a: ZoneViolationAnalyzer) -> Self {
        Analyzer::ZoneViolation(a)
    }
}

impl From<SuspiciousActivityAnalyzer> for Analyzer {
    fn from(a: SuspiciousActivityAnalyzer) -> Self {
        Analyzer::SuspiciousActivity(a)
    }
}
