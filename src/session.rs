//! One isolated tracking-and-analysis pipeline.
//!
//! A session owns its tracker, its analyzers and its zones. Nothing is shared
//! between sessions, so independent streams can each run on their own thread.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{
    AlertEvent, AnalysisSummary, Analyzer, FrameMeta, LoiteringAnalyzer, OvercrowdingAnalyzer, PoseMap,
    SuspiciousActivityAnalyzer, ZoneViolationAnalyzer,
};
use crate::config::SessionConfig;
use crate::error::ConfigError;
use crate::tracker::{Detection, TrackId, TrackSnapshot, Tracker};

/// Tracker output for one frame, committed and ready for analysis.
///
/// Only [`Session::track`] creates one, so analyzers can never see a frame
/// the tracker has not finished.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    frame_number: u64,
    timestamp: f64,
    tracks: Vec<TrackSnapshot>,
    removed: Vec<TrackId>,
}

impl TrackedFrame {
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Confirmed tracks, sorted by id.
    pub fn tracks(&self) -> &[TrackSnapshot] {
        &self.tracks
    }

    pub fn removed_tracks(&self) -> &[TrackId] {
        &self.removed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame_number: u64,
    pub timestamp: f64,
    pub events: Vec<AlertEvent>,
    pub tracks: Vec<TrackSnapshot>,
}

/// Visualization row for one confirmed track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackOverlay {
    pub id: TrackId,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f64; 4],
    pub confidence: f32,
}

/// One frame of input for the batch and live drivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInput {
    pub timestamp: f64,
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub poses: PoseMap,
}

impl FrameInput {
    pub fn new(timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp,
            detections,
            poses: PoseMap::new(),
        }
    }

    pub fn with_poses(mut self, poses: PoseMap) -> Self {
        self.poses = poses;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub events: Vec<AlertEvent>,
    pub summary: AnalysisSummary,
}

pub struct Session {
    config: SessionConfig,
    tracker: Tracker,
    analyzers: Vec<Analyzer>,
    frame_number: u64,
    current: Vec<TrackSnapshot>,
    /// Ids deleted by the tracker that analyzers have not been told about yet.
    pending_removed: Vec<TrackId>,
    summary: AnalysisSummary,
}

impl Session {
    /// Validate `config` and build the pipeline. An invalid zone or value
    /// means the session does not start.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let zones = config.zones()?;
        info!(
            "starting session: {} restricted zone(s), overcrowding threshold {}",
            zones.len(),
            config.overcrowding_threshold
        );

        let analyzers = vec![
            OvercrowdingAnalyzer::new(config.overcrowding_threshold).into(),
            LoiteringAnalyzer::new(config.loitering_time, config.loitering_distance).into(),
            ZoneViolationAnalyzer::new(zones).into(),
            SuspiciousActivityAnalyzer::new(config.suspicious_config()).into(),
        ];
        Ok(Self {
            tracker: Tracker::new(config.tracker_config()),
            config,
            analyzers,
            frame_number: 0,
            current: Vec::new(),
            pending_removed: Vec::new(),
            summary: AnalysisSummary::default(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    /// Totals over every frame analyzed since the session started.
    pub fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    /// Confirmed tracks from the latest tracked frame.
    pub fn tracks(&self) -> &[TrackSnapshot] {
        &self.current
    }

    /// Run the tracker for one frame. Frame numbers start at 1.
    pub fn track(&mut self, detections: Vec<Detection>, timestamp: f64) -> TrackedFrame {
        self.frame_number += 1;
        let tracks = self.tracker.step(detections, timestamp);
        self.current = tracks.clone();
        self.pending_removed
            .extend_from_slice(self.tracker.removed_tracks());
        TrackedFrame {
            frame_number: self.frame_number,
            timestamp,
            tracks,
            removed: self.tracker.removed_tracks().to_vec(),
        }
    }

    /// Run every analyzer over a committed frame, in a fixed order.
    ///
    /// Analyzers are told about every track deleted since the previous call,
    /// even when several frames were tracked in between.
    pub fn analyze(&mut self, frame: TrackedFrame, poses: &PoseMap) -> FrameReport {
        let stale = frame.frame_number != self.frame_number;
        if stale {
            warn!(
                "analyzing frame {} after frame {} was tracked",
                frame.frame_number, self.frame_number
            );
        }
        let removed = std::mem::take(&mut self.pending_removed);
        let meta = FrameMeta::new(frame.frame_number, frame.timestamp)
            .with_removed(&removed)
            .with_poses(poses);

        let mut events = Vec::new();
        for analyzer in &mut self.analyzers {
            events.extend(analyzer.step(&frame.tracks, &meta));
            if stale {
                // An old frame may still list tracks deleted since
                analyzer.forget(&removed);
            }
        }
        self.summary.record_frame(&events);
        debug!(
            "frame {}: {} confirmed track(s), {} event(s)",
            frame.frame_number,
            frame.tracks.len(),
            events.len()
        );

        FrameReport {
            frame_number: frame.frame_number,
            timestamp: frame.timestamp,
            events,
            tracks: frame.tracks,
        }
    }

    pub fn process_frame(&mut self, detections: Vec<Detection>, poses: &PoseMap, timestamp: f64) -> FrameReport {
        let frame = self.track(detections, timestamp);
        self.analyze(frame, poses)
    }

    pub fn overlay(&self) -> Vec<TrackOverlay> {
        self.current
            .iter()
            .map(|t| TrackOverlay {
                id: t.id,
                bbox: t.bbox.to_tlbr(),
                confidence: t.confidence,
            })
            .collect()
    }

    /// Process every frame to completion and collect the events.
    pub fn analyze_batch<I>(&mut self, frames: I) -> AnalysisResult
    where
        I: IntoIterator<Item = FrameInput>,
    {
        let mut events = Vec::new();
        let mut summary = AnalysisSummary::default();
        for input in frames {
            let report = self.process_frame(input.detections, &input.poses, input.timestamp);
            summary.record_frame(&report.events);
            events.extend(report.events);
        }
        info!(
            "batch finished: {} frame(s), {} event(s)",
            summary.total_frames, summary.total_events
        );
        AnalysisResult { events, summary }
    }

    /// Drop all tracks and per-track analyzer state. Track ids are not reused.
    pub fn reset_histories(&mut self) {
        self.tracker.reset();
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
        self.current.clear();
        self.pending_removed.clear();
        debug!("session histories released after frame {}", self.frame_number);
    }
}
