//! Per-frame driver: predict, cascade association, update, spawn, retire.

use tracing::{debug, warn};

use crate::tracker::arena::TrackArena;
use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::track::{HistorySample, Track, TrackId, TrackSnapshot};
use crate::tracker::track_state::TrackState;

/// Configuration for the [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Consecutive matches needed to confirm a track
    pub min_hits: u32,
    /// Frames a confirmed track may coast without a match
    pub max_age: u32,
    /// Matched pairs costing more than this are rejected
    pub assignment_max_cost: f64,
    /// Squared Mahalanobis gate on the box center (chi-square, 2 dof)
    pub gating_mahalanobis_threshold: f64,
    /// Unmatched detections below this confidence do not spawn tracks
    pub min_confidence: f32,
    /// Weight of the newest embedding in the appearance moving average
    pub embedding_alpha: f32,
    /// Maximum number of (timestamp, centroid) samples kept per track
    pub history_len: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_hits: 3,
            max_age: 30,
            assignment_max_cost: 0.7,
            gating_mahalanobis_threshold: 5.9915,
            min_confidence: 0.5,
            embedding_alpha: 0.1,
            history_len: 900,
        }
    }
}

pub struct Tracker {
    tracks: TrackArena,
    next_id: TrackId,
    frame_id: u64,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
    removed: Vec<TrackId>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: TrackArena::new(),
            next_id: 1,
            frame_id: 0,
            config,
            kalman_filter: KalmanFilter::default(),
            removed: Vec::new(),
        }
    }

    /// Advance all tracks by one frame and return the confirmed ones, sorted by id.
    pub fn step(&mut self, detections: Vec<Detection>, timestamp: f64) -> Vec<TrackSnapshot> {
        self.frame_id += 1;

        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|det| match det.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!("frame {}: dropping detection: {}", self.frame_id, err);
                    false
                }
            })
            .collect();

        // Step 1: split by recency before predicting, since predict advances time_since_update
        let (recent, stale): (Vec<usize>, Vec<usize>) =
            self.tracks.slots_by_id().into_iter().partition(|&slot| {
                self.tracks
                    .get(slot)
                    .is_some_and(|t| t.time_since_update == 0)
            });

        for track in self.tracks.iter_mut() {
            track.predict(&self.kalman_filter);
        }

        // Step 2: cascade association, recently seen tracks first
        let mut remaining: Vec<usize> = (0..detections.len()).collect();
        let mut matches = Vec::new();
        let mut unmatched_slots = Vec::new();
        for group in [recent, stale] {
            let (group_matches, group_unmatched, left) =
                self.associate(&group, &detections, &remaining);
            matches.extend(group_matches);
            unmatched_slots.extend(group_unmatched);
            remaining = left;
        }

        // Step 3: update matched tracks
        let mut failed_slots = Vec::new();
        for (slot, det_idx) in matches {
            let Some(track) = self.tracks.get_mut(slot) else {
                continue;
            };
            let was_confirmed = track.is_confirmed();
            match track.update(
                &detections[det_idx],
                &self.kalman_filter,
                timestamp,
                self.config.embedding_alpha,
                self.config.min_hits,
            ) {
                Ok(()) => {
                    if !was_confirmed && track.is_confirmed() {
                        debug!("frame {}: track {} confirmed", self.frame_id, track.track_id);
                    }
                }
                Err(err) => {
                    warn!(
                        "frame {}: track {} left unmatched: {}",
                        self.frame_id, track.track_id, err
                    );
                    failed_slots.push(slot);
                }
            }
        }

        // Step 4: retire tracks that missed
        for slot in unmatched_slots {
            if let Some(track) = self.tracks.get_mut(slot) {
                track.mark_missed(self.config.max_age);
            }
        }
        for slot in failed_slots {
            if let Some(track) = self.tracks.get_mut(slot) {
                track.mark_update_failed(self.config.max_age);
            }
        }

        // Step 5: spawn tracks from leftover detections
        for det_idx in remaining {
            let det = &detections[det_idx];
            if det.score < self.config.min_confidence {
                continue;
            }
            let mut track = Track::new(
                self.next_id,
                det,
                &self.kalman_filter,
                timestamp,
                self.config.history_len,
            );
            if track.hits >= self.config.min_hits {
                track.state = TrackState::Confirmed;
            }
            debug!("frame {}: new track {}", self.frame_id, self.next_id);
            self.next_id += 1;
            self.tracks.insert(track);
        }

        self.removed = self.tracks.sweep();
        if !self.removed.is_empty() {
            debug!("frame {}: removed tracks {:?}", self.frame_id, self.removed);
        }

        self.confirmed()
    }

    fn associate(
        &self,
        slots: &[usize],
        detections: &[Detection],
        candidates: &[usize],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        let (slots, tracks): (Vec<usize>, Vec<&Track>) = slots
            .iter()
            .filter_map(|&slot| self.tracks.get(slot).map(|t| (slot, t)))
            .unzip();
        let dets: Vec<&Detection> = candidates.iter().map(|&j| &detections[j]).collect();

        let cost = matching::association_cost(
            &self.kalman_filter,
            &tracks,
            &dets,
            self.config.gating_mahalanobis_threshold,
        );
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::linear_assignment(&cost, self.config.assignment_max_cost);

        (
            matches
                .into_iter()
                .map(|(i, j)| (slots[i], candidates[j]))
                .collect(),
            unmatched_tracks.into_iter().map(|i| slots[i]).collect(),
            unmatched_detections
                .into_iter()
                .map(|j| candidates[j])
                .collect(),
        )
    }

    /// Snapshots of all confirmed tracks, sorted by id.
    pub fn confirmed(&self) -> Vec<TrackSnapshot> {
        let mut tracks: Vec<TrackSnapshot> = self
            .tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(Track::snapshot)
            .collect();
        tracks.sort_unstable_by_key(|t| t.id);
        tracks
    }

    /// Ids deleted during the last `step`.
    pub fn removed_tracks(&self) -> &[TrackId] {
        &self.removed
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.by_id(id)
    }

    pub fn track_history(&self, id: TrackId) -> Option<impl Iterator<Item = &HistorySample>> {
        self.tracks.by_id(id).map(|t| t.history().iter())
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of live tracks in any state.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop every track. Ids keep increasing so they are never reused.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.removed.clear();
        self.frame_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed_track(tracker: &mut Tracker, det: Detection, time_since_update: u32) -> TrackId {
        let id = tracker.next_id;
        tracker.next_id += 1;
        let mut track = Track::new(id, &det, &tracker.kalman_filter, 0.0, 16);
        track.state = TrackState::Confirmed;
        track.hits = 3;
        track.time_since_update = time_since_update;
        tracker.tracks.insert(track);
        id
    }

    #[test]
    fn test_recent_track_keeps_contested_detection() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let target = Detection::new(100.0, 100.0, 150.0, 250.0, 0.9);

        // Recent track sits 10px off; the stale one sits exactly on the detection
        let recent = confirmed_track(
            &mut tracker,
            Detection::new(110.0, 100.0, 160.0, 250.0, 0.9),
            0,
        );
        let stale = confirmed_track(&mut tracker, target.clone(), 3);

        let out = tracker.step(vec![target], 1.0);

        assert_eq!(out.len(), 2);
        assert_eq!(tracker.track(recent).unwrap().time_since_update, 0);
        assert_eq!(tracker.track(stale).unwrap().time_since_update, 4);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_stale_track_matches_when_uncontested() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let det = Detection::new(100.0, 100.0, 150.0, 250.0, 0.9);
        let stale = confirmed_track(&mut tracker, det.clone(), 5);

        tracker.step(vec![det], 1.0);

        assert_eq!(tracker.track(stale).unwrap().time_since_update, 0);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_failed_update_keeps_tentative_track() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        // Finite box whose squared height overflows the covariance
        let huge = || vec![Detection::new(0.0, 0.0, 1.0, 1e155, 0.9)];

        tracker.step(huge(), 0.0);
        assert_eq!(tracker.len(), 1);

        tracker.step(huge(), 0.1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.removed_tracks().is_empty());
        let track = tracker.track(1).unwrap();
        assert_eq!(track.state, TrackState::Tentative);
        assert_eq!(track.hits, 0);
        assert_eq!(track.time_since_update, 1);
    }

    #[test]
    fn test_failed_update_still_honors_max_age() {
        let config = TrackerConfig {
            max_age: 2,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(config);
        let id = confirmed_track(&mut tracker, Detection::new(0.0, 0.0, 50.0, 150.0, 0.9), 3);
        let slot = tracker.tracks.slots_by_id()[0];
        let track = tracker.tracks.get_mut(slot).unwrap();
        track.mark_update_failed(tracker.config.max_age);
        assert!(track.is_deleted());

        assert_eq!(tracker.tracks.sweep(), vec![id]);
    }

    #[test]
    fn test_low_confidence_detection_does_not_spawn() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.step(vec![Detection::new(0.0, 0.0, 10.0, 30.0, 0.2)], 0.0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_min_hits_of_one_confirms_on_creation() {
        let config = TrackerConfig {
            min_hits: 1,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(config);
        let out = tracker.step(vec![Detection::new(0.0, 0.0, 10.0, 30.0, 0.9)], 0.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }
}
