//! Session configuration, deserialized from JSON with every field defaulted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{SuspiciousActivityConfig, Zone};
use crate::error::ConfigError;
use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// People count above which an overcrowding alert fires.
    pub overcrowding_threshold: usize,
    /// Seconds a track must stay put before it is loitering.
    pub loitering_time: f64,
    /// Pixels of movement that restart the loitering clock.
    pub loitering_distance: f64,
    /// Wrist velocity, px/frame, counted as rapid motion.
    pub velocity_threshold: f64,
    /// Polygons as `[[x, y], ...]` in pixel coordinates.
    pub restricted_zones: Vec<Vec<[f64; 2]>>,

    pub min_hits: u32,
    /// Frames a confirmed track may go unmatched before deletion.
    pub max_age: u32,
    pub assignment_max_cost: f64,
    pub gating_mahalanobis_threshold: f64,
    pub min_confidence: f32,
    pub embedding_alpha: f32,
    pub history_len: usize,

    pub proximity_threshold: f64,
    pub motion_window: f64,
    pub suspicious_cooldown: f64,
    pub max_pose_gap: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let tracker = TrackerConfig::default();
        let suspicious = SuspiciousActivityConfig::default();
        Self {
            overcrowding_threshold: 10,
            loitering_time: 300.0,
            loitering_distance: 50.0,
            velocity_threshold: suspicious.velocity_threshold,
            restricted_zones: Vec::new(),
            min_hits: tracker.min_hits,
            max_age: tracker.max_age,
            assignment_max_cost: tracker.assignment_max_cost,
            gating_mahalanobis_threshold: tracker.gating_mahalanobis_threshold,
            min_confidence: tracker.min_confidence,
            embedding_alpha: tracker.embedding_alpha,
            history_len: tracker.history_len,
            proximity_threshold: suspicious.proximity_threshold,
            motion_window: suspicious.motion_window,
            suspicious_cooldown: suspicious.cooldown,
            max_pose_gap: suspicious.max_pose_gap,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Checks numeric ranges and every zone polygon.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("loitering_time", self.loitering_time)?;
        positive("loitering_distance", self.loitering_distance)?;
        non_negative("velocity_threshold", self.velocity_threshold)?;
        positive("assignment_max_cost", self.assignment_max_cost)?;
        positive("gating_mahalanobis_threshold", self.gating_mahalanobis_threshold)?;
        unit_interval("min_confidence", self.min_confidence)?;
        unit_interval("embedding_alpha", self.embedding_alpha)?;
        positive("proximity_threshold", self.proximity_threshold)?;
        non_negative("motion_window", self.motion_window)?;
        non_negative("suspicious_cooldown", self.suspicious_cooldown)?;
        if self.history_len == 0 {
            return Err(invalid("history_len", "must be at least 1"));
        }
        if self.max_pose_gap == 0 {
            return Err(invalid("max_pose_gap", "must be at least 1"));
        }
        self.zones().map(|_| ())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            min_hits: self.min_hits,
            max_age: self.max_age,
            assignment_max_cost: self.assignment_max_cost,
            gating_mahalanobis_threshold: self.gating_mahalanobis_threshold,
            min_confidence: self.min_confidence,
            embedding_alpha: self.embedding_alpha,
            history_len: self.history_len,
        }
    }

    pub fn suspicious_config(&self) -> SuspiciousActivityConfig {
        SuspiciousActivityConfig {
            velocity_threshold: self.velocity_threshold,
            proximity_threshold: self.proximity_threshold,
            motion_window: self.motion_window,
            cooldown: self.suspicious_cooldown,
            max_pose_gap: self.max_pose_gap,
            ..SuspiciousActivityConfig::default()
        }
    }

    pub fn zones(&self) -> Result<Vec<Zone>, ConfigError> {
        self.restricted_zones
            .iter()
            .enumerate()
            .map(|(index, coords)| {
                Zone::from_coords(coords).map_err(|source| ConfigError::InvalidZone { index, source })
            })
            .collect()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_owned(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected a positive number, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected a non-negative number, got {value}")))
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected a value in [0, 1], got {value}")))
    }
}
