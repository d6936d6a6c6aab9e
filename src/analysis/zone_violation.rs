//! Restricted-zone entry alerts.

use std::collections::HashSet;

use serde_json::json;
use tracing::info;

use crate::analysis::FrameMeta;
use crate::analysis::event::{AlertEvent, AlertKind};
use crate::analysis::zone::Zone;
use crate::tracker::{TrackId, TrackSnapshot};

#[derive(Debug, Clone)]
pub struct ZoneViolationAnalyzer {
    zones: Vec<Zone>,
    /// (track, zone index) pairs whose foot point was inside last frame.
    inside: HashSet<(TrackId, usize)>,
}

impl ZoneViolationAnalyzer {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            inside: HashSet::new(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn step(&mut self, tracks: &[TrackSnapshot], frame: &FrameMeta<'_>) -> Vec<AlertEvent> {
        self.forget(frame.removed_tracks);
        if self.zones.is_empty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        for track in tracks {
            let foot = track.foot_point();
            for (zone_index, zone) in self.zones.iter().enumerate() {
                let key = (track.id, zone_index);
                if !zone.contains(&foot) {
                    self.inside.remove(&key);
                    continue;
                }
                if self.inside.insert(key) {
                    info!(
                        "frame {}: track {} entered restricted zone {}",
                        frame.frame_number, track.id, zone_index
                    );
                    events.push(AlertEvent::new(
                        AlertKind::ZoneViolation,
                        frame,
                        json!({
                            "track_id": track.id,
                            "zone_index": zone_index,
                            "position": [foot.x, foot.y],
                        }),
                    ));
                }
            }
        }
        events
    }

    pub fn forget(&mut self, ids: &[TrackId]) {
        if ids.is_empty() {
            return;
        }
        self.inside.retain(|(id, _)| !ids.contains(id));
    }

    pub fn reset(&mut self) {
        self.inside.clear();
    }
}
