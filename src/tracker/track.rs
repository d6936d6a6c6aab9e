//! A single tracked identity and the read-only snapshot handed to analyzers.

use std::collections::VecDeque;

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::error::NumericalError;
use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::rect::{Point, Rect};
use crate::tracker::track_state::TrackState;

pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySample {
    pub timestamp: f64,
    pub centroid: Point,
}

#[derive(Debug, Clone)]
pub struct Track {
    /// Unique identifier, never reused within a tracker
    pub track_id: TrackId,
    pub state: TrackState,
    /// Confidence of the last matched detection
    pub score: f32,
    /// Consecutive successful updates; creation counts as the first
    pub hits: u32,
    /// Frames since creation
    pub age: u32,
    /// Frames since the last matched detection
    pub time_since_update: u32,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    embedding: Option<Array1<f32>>,
    history: VecDeque<HistorySample>,
    history_len: usize,
}

impl Track {
    pub fn new(
        track_id: TrackId,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        timestamp: f64,
        history_len: usize,
    ) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.to_xyah());
        let mut track = Self {
            track_id,
            state: TrackState::Tentative,
            score: detection.score,
            hits: 1,
            age: 0,
            time_since_update: 0,
            mean,
            covariance,
            embedding: detection.embedding.as_ref().and_then(normalized),
            history: VecDeque::with_capacity(history_len.min(64)),
            history_len,
        };
        track.push_history(timestamp);
        track
    }

    /// Current box estimate from the Kalman mean.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    pub fn embedding(&self) -> Option<&Array1<f32>> {
        self.embedding.as_ref()
    }

    pub fn history(&self) -> &VecDeque<HistorySample> {
        &self.history
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Correct the state with a matched detection.
    ///
    /// On error nothing about the track changes.
    pub fn update(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        timestamp: f64,
        embedding_alpha: f32,
        min_hits: u32,
    ) -> Result<(), NumericalError> {
        let (mean, covariance) =
            kalman_filter.update(&self.mean, &self.covariance, detection.to_xyah())?;
        self.mean = mean;
        self.covariance = covariance;

        if let Some(new) = detection.embedding.as_ref().and_then(normalized) {
            self.embedding = match self.embedding.take() {
                Some(old) if old.len() == new.len() => {
                    normalized(&(new * embedding_alpha + old * (1.0 - embedding_alpha)))
                }
                _ => Some(new),
            };
        }

        self.score = detection.score;
        self.hits += 1;
        self.time_since_update = 0;
        self.push_history(timestamp);

        if self.state == TrackState::Tentative && self.hits >= min_hits {
            self.state = TrackState::Confirmed;
        }
        Ok(())
    }

    /// Apply the deletion rule for a frame without a match.
    pub fn mark_missed(&mut self, max_age: u32) {
        self.hits = 0;
        match self.state {
            TrackState::Tentative => self.state = TrackState::Deleted,
            TrackState::Confirmed if self.time_since_update > max_age => {
                self.state = TrackState::Deleted
            }
            _ => {}
        }
    }

    /// A matched update that failed numerically. Counts as a miss, but only
    /// the `max_age` rule can delete the track.
    pub fn mark_update_failed(&mut self, max_age: u32) {
        self.hits = 0;
        if self.state == TrackState::Confirmed && self.time_since_update > max_age {
            self.state = TrackState::Deleted;
        }
    }

    pub fn mark_deleted(&mut self) {
        self.state = TrackState::Deleted;
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            id: self.track_id,
            bbox: self.rect(),
            confidence: self.score,
            state: self.state,
            hits: self.hits,
            age: self.age,
            time_since_update: self.time_since_update,
        }
    }

    fn push_history(&mut self, timestamp: f64) {
        if self.history_len == 0 {
            return;
        }
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(HistorySample {
            timestamp,
            centroid: self.rect().center(),
        });
    }
}

fn normalized(v: &Array1<f32>) -> Option<Array1<f32>> {
    let norm = v.dot(v).sqrt();
    if norm.is_finite() && norm > f32::EPSILON {
        Some(v / norm)
    } else {
        None
    }
}

/// Read-only copy of a track for analyzers and overlays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub bbox: Rect,
    pub confidence: f32,
    pub state: TrackState,
    pub hits: u32,
    pub age: u32,
    pub time_since_update: u32,
}

impl TrackSnapshot {
    /// A confirmed snapshot for a box produced outside this crate's tracker.
    pub fn new(id: TrackId, bbox: Rect) -> Self {
        Self {
            id,
            bbox,
            confidence: 1.0,
            state: TrackState::Confirmed,
            hits: 0,
            age: 0,
            time_since_update: 0,
        }
    }

    pub fn centroid(&self) -> Point {
        self.bbox.center()
    }

    pub fn foot_point(&self) -> Point {
        self.bbox.foot_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn detection(x: f64) -> Detection {
        Detection::new(x, 100.0, x + 50.0, 250.0, 0.9)
    }

    #[test]
    fn test_confirms_after_min_hits() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &detection(0.0), &kf, 0.0, 10);
        assert_eq!(track.state, TrackState::Tentative);

        for frame in 1..3 {
            track.predict(&kf);
            track.update(&detection(0.0), &kf, frame as f64, 0.1, 3).unwrap();
        }
        assert_eq!(track.hits, 3);
        assert!(track.is_confirmed());
        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.age, 2);
    }

    #[test]
    fn test_tentative_miss_deletes() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &detection(0.0), &kf, 0.0, 10);
        track.predict(&kf);
        track.mark_missed(30);
        assert!(track.is_deleted());
    }

    #[test]
    fn test_history_is_bounded() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &detection(0.0), &kf, 0.0, 3);
        for frame in 1..10 {
            track.predict(&kf);
            track.update(&detection(0.0), &kf, frame as f64, 0.1, 3).unwrap();
        }
        assert_eq!(track.history().len(), 3);
        assert_eq!(track.history().back().unwrap().timestamp, 9.0);
    }

    #[test]
    fn test_embedding_moving_average() {
        let kf = KalmanFilter::new();
        let first = detection(0.0).with_embedding(array![1.0f32, 0.0]);
        let mut track = Track::new(1, &first, &kf, 0.0, 10);
        track.predict(&kf);
        let second = detection(0.0).with_embedding(array![0.0f32, 1.0]);
        track.update(&second, &kf, 1.0, 0.1, 3).unwrap();

        let emb = track.embedding().unwrap();
        // 0.9 * e0 + 0.1 * e1, renormalized
        let norm = (0.81f32 + 0.01).sqrt();
        assert!((emb[0] - 0.9 / norm).abs() < 1e-5);
        assert!((emb[1] - 0.1 / norm).abs() < 1e-5);
    }
}
