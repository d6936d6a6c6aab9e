//! Skeletal keypoints supplied by the external pose estimator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tracker::{Point, TrackId};

pub const LEFT_SHOULDER: &str = "left_shoulder";
pub const RIGHT_SHOULDER: &str = "right_shoulder";
pub const LEFT_WRIST: &str = "left_wrist";
pub const RIGHT_WRIST: &str = "right_wrist";
pub const LEFT_HIP: &str = "left_hip";
pub const RIGHT_HIP: &str = "right_hip";

const TORSO: [&str; 4] = [LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_HIP, RIGHT_HIP];

/// Poses for the current frame, keyed by the track they were estimated for.
pub type PoseMap = BTreeMap<TrackId, Pose>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            confidence,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// The named keypoint, if present with at least `min_confidence` and finite coordinates.
    pub fn keypoint(&self, name: &str, min_confidence: f64) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| {
            k.name == name && k.confidence >= min_confidence && k.x.is_finite() && k.y.is_finite()
        })
    }

    /// Mean of the visible shoulders and hips.
    pub fn torso_centroid(&self, min_confidence: f64) -> Option<Point> {
        let visible: Vec<Point> = TORSO
            .iter()
            .filter_map(|name| self.keypoint(name, min_confidence))
            .map(Keypoint::point)
            .collect();
        if visible.is_empty() {
            return None;
        }
        let n = visible.len() as f64;
        Some(Point::new(
            visible.iter().map(|p| p.x).sum::<f64>() / n,
            visible.iter().map(|p| p.y).sum::<f64>() / n,
        ))
    }
}
