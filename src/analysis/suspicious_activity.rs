//! Fight-like interaction detection from wrist motion and proximity.

use std::collections::{HashMap, VecDeque};

use serde_json::json;
use tracing::{debug, info};

use crate::analysis::FrameMeta;
use crate::analysis::event::{AlertEvent, AlertKind};
use crate::analysis::pose::{LEFT_WRIST, Pose, RIGHT_WRIST};
use crate::tracker::{Point, TrackId, TrackSnapshot};

const TIME_EPS: f64 = 1e-6;
const WRISTS: [&str; 2] = [LEFT_WRIST, RIGHT_WRIST];

#[derive(Debug, Clone, PartialEq)]
pub struct SuspiciousActivityConfig {
    /// Confidence-weighted wrist displacement per frame, in pixels.
    pub velocity_threshold: f64,
    /// Torso-to-torso distance below which two people interact, in pixels.
    pub proximity_threshold: f64,
    /// How long a burst of rapid motion keeps a track "rapid", in seconds.
    pub motion_window: f64,
    /// Minimum seconds between two alerts for the same pair.
    pub cooldown: f64,
    /// Pose samples further apart than this many frames are not differenced.
    pub max_pose_gap: u64,
    pub pose_history_len: usize,
    pub min_keypoint_confidence: f64,
}

impl Default for SuspiciousActivityConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: 15.0,
            proximity_threshold: 100.0,
            motion_window: 1.0,
            cooldown: 5.0,
            max_pose_gap: 5,
            pose_history_len: 30,
            min_keypoint_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WristSample {
    frame_number: u64,
    /// Indexed like `WRISTS`; (position, confidence).
    wrists: [Option<(Point, f64)>; 2],
}

#[derive(Debug, Clone, Default)]
struct MotionState {
    samples: VecDeque<WristSample>,
    /// Timestamp and velocity of the latest rapid movement.
    last_rapid: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PairState {
    active: bool,
    last_alert: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SuspiciousActivityAnalyzer {
    config: SuspiciousActivityConfig,
    motion: HashMap<TrackId, MotionState>,
    /// Keyed by (lower id, higher id).
    pairs: HashMap<(TrackId, TrackId), PairState>,
}

impl SuspiciousActivityAnalyzer {
    pub fn new(config: SuspiciousActivityConfig) -> Self {
        Self {
            config,
            motion: HashMap::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SuspiciousActivityConfig {
        &self.config
    }

    pub fn step(&mut self, tracks: &[TrackSnapshot], frame: &FrameMeta<'_>) -> Vec<AlertEvent> {
        self.forget(frame.removed_tracks);

        for track in tracks {
            if let Some(pose) = frame.poses.get(&track.id) {
                self.record_pose(track.id, pose, frame);
            }
        }

        let torsos: Vec<Point> = tracks
            .iter()
            .map(|t| {
                frame
                    .poses
                    .get(&t.id)
                    .and_then(|p| p.torso_centroid(self.config.min_keypoint_confidence))
                    .unwrap_or_else(|| t.centroid())
            })
            .collect();

        let mut events = Vec::new();
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                let (a, b) = (tracks[i].id, tracks[j].id);
                let key = (a.min(b), a.max(b));
                let distance = torsos[i].distance(&torsos[j]);
                let arm_velocity = match (self.rapid_velocity(a, frame), self.rapid_velocity(b, frame)) {
                    (None, None) => None,
                    (va, vb) => Some(va.unwrap_or(0.0).max(vb.unwrap_or(0.0))),
                };
                let condition = distance < self.config.proximity_threshold && arm_velocity.is_some();

                let state = self.pairs.entry(key).or_default();
                if !condition {
                    state.active = false;
                    continue;
                }
                if state.active {
                    continue;
                }
                state.active = true;
                let cooled = state
                    .last_alert
                    .is_none_or(|t| frame.timestamp - t + TIME_EPS >= self.config.cooldown);
                if !cooled {
                    debug!("pair {:?} suspicious again within cooldown, suppressed", key);
                    continue;
                }
                state.last_alert = Some(frame.timestamp);
                let arm_velocity = arm_velocity.unwrap_or(0.0);
                info!(
                    "frame {}: fight-like activity between tracks {} and {} (distance {:.1}px, arm velocity {:.1})",
                    frame.frame_number, key.0, key.1, distance, arm_velocity
                );
                events.push(AlertEvent::new(
                    AlertKind::SuspiciousActivity,
                    frame,
                    json!({
                        "subtype": "fight_like",
                        "nearest_distance": distance,
                        "arm_velocity": arm_velocity,
                        "track_ids": [key.0, key.1],
                    }),
                ));
            }
        }
        events
    }

    fn record_pose(&mut self, id: TrackId, pose: &Pose, frame: &FrameMeta<'_>) {
        let min_conf = self.config.min_keypoint_confidence;
        let sample = WristSample {
            frame_number: frame.frame_number,
            wrists: WRISTS.map(|name| pose.keypoint(name, min_conf).map(|k| (k.point(), k.confidence))),
        };
        if sample.wrists.iter().all(Option::is_none) {
            return;
        }

        let state = self.motion.entry(id).or_default();
        if let Some(prev) = state.samples.back() {
            let gap = sample.frame_number.saturating_sub(prev.frame_number);
            if gap >= 1 && gap <= self.config.max_pose_gap {
                let velocity = wrist_velocity(prev, &sample, gap);
                if velocity > self.config.velocity_threshold {
                    debug!("track {} rapid arm motion {:.1}px/frame", id, velocity);
                    state.last_rapid = Some((frame.timestamp, velocity));
                }
            }
        }
        state.samples.push_back(sample);
        while state.samples.len() > self.config.pose_history_len.max(1) {
            state.samples.pop_front();
        }
    }

    fn rapid_velocity(&self, id: TrackId, frame: &FrameMeta<'_>) -> Option<f64> {
        let (at, velocity) = self.motion.get(&id)?.last_rapid?;
        (frame.timestamp - at <= self.config.motion_window + TIME_EPS).then_some(velocity)
    }

    pub fn forget(&mut self, ids: &[TrackId]) {
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.motion.remove(id);
        }
        self.pairs
            .retain(|(a, b), _| !ids.contains(a) && !ids.contains(b));
    }

    pub fn reset(&mut self) {
        self.motion.clear();
        self.pairs.clear();
    }
}

/// Largest confidence-weighted wrist displacement, normalized by the frame gap.
fn wrist_velocity(prev: &WristSample, curr: &WristSample, gap: u64) -> f64 {
    prev.wrists
        .iter()
        .zip(curr.wrists.iter())
        .filter_map(|(p, c)| {
            let ((p0, c0), (p1, c1)) = (p.as_ref()?, c.as_ref()?);
            Some(p0.distance(p1) * (c0 + c1) / 2.0 / gap as f64)
        })
        .fold(0.0, f64::max)
}
