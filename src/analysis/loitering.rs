//! Flags tracks whose centroid stays inside a small radius for too long.

use std::collections::{HashMap, VecDeque};

use serde_json::json;
use tracing::info;

use crate::analysis::FrameMeta;
use crate::analysis::event::{AlertEvent, AlertKind};
use crate::tracker::{Point, TrackId, TrackSnapshot};

/// Slack for timestamps accumulated from frame counts.
const TIME_EPS: f64 = 1e-6;

#[derive(Debug, Clone)]
struct StationaryWindow {
    samples: VecDeque<(f64, Point)>,
    stationary_since: f64,
    displacement: f64,
    alerted: bool,
}

impl StationaryWindow {
    fn start(timestamp: f64, centroid: Point) -> Self {
        Self {
            samples: VecDeque::from([(timestamp, centroid)]),
            stationary_since: timestamp,
            displacement: 0.0,
            alerted: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoiteringAnalyzer {
    loitering_time: f64,
    loitering_distance: f64,
    windows: HashMap<TrackId, StationaryWindow>,
}

impl LoiteringAnalyzer {
    /// `loitering_time` in seconds, `loitering_distance` in pixels.
    pub fn new(loitering_time: f64, loitering_distance: f64) -> Self {
        Self {
            loitering_time,
            loitering_distance,
            windows: HashMap::new(),
        }
    }

    pub fn step(&mut self, tracks: &[TrackSnapshot], frame: &FrameMeta<'_>) -> Vec<AlertEvent> {
        self.forget(frame.removed_tracks);

        let now = frame.timestamp;
        let mut events = Vec::new();
        for track in tracks {
            let centroid = track.centroid();
            let Some(window) = self.windows.get_mut(&track.id) else {
                self.windows
                    .insert(track.id, StationaryWindow::start(now, centroid));
                continue;
            };

            let spread = window
                .samples
                .iter()
                .map(|(_, p)| p.distance(&centroid))
                .fold(0.0, f64::max);
            if spread >= self.loitering_distance {
                *window = StationaryWindow::start(now, centroid);
                continue;
            }

            window.displacement = window.displacement.max(spread);
            window.samples.push_back((now, centroid));
            let horizon = now - self.loitering_time - TIME_EPS;
            while window.samples.front().is_some_and(|&(t, _)| t < horizon) {
                window.samples.pop_front();
            }

            let duration = now - window.stationary_since;
            if !window.alerted && duration + TIME_EPS >= self.loitering_time {
                window.alerted = true;
                info!(
                    "frame {}: track {} loitering for {:.1}s (moved {:.1}px)",
                    frame.frame_number, track.id, duration, window.displacement
                );
                events.push(AlertEvent::new(
                    AlertKind::Loitering,
                    frame,
                    json!({
                        "track_id": track.id,
                        "duration": duration,
                        "displacement": window.displacement,
                        "position": [centroid.x, centroid.y],
                    }),
                ));
            }
        }
        events
    }

    pub fn forget(&mut self, ids: &[TrackId]) {
        for id in ids {
            self.windows.remove(id);
        }
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn reset(&mut self) {
        self.windows.clear();
    }
}
