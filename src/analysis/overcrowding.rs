//! Edge-triggered people-count alert.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::analysis::FrameMeta;
use crate::analysis::event::{AlertEvent, AlertKind};
use crate::tracker::TrackSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn classify(count: usize, threshold: usize) -> Self {
        if count <= threshold {
            return Severity::None;
        }
        if threshold == 0 {
            return Severity::High;
        }
        let ratio = count as f64 / threshold as f64;
        if ratio <= 1.2 {
            Severity::Low
        } else if ratio <= 1.5 {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

#[derive(Debug, Clone)]
pub struct OvercrowdingAnalyzer {
    threshold: usize,
    alert_active: bool,
}

impl OvercrowdingAnalyzer {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            alert_active: false,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Emits once when the count rises above the threshold; re-arms after a
    /// frame at or below it.
    pub fn step(&mut self, tracks: &[TrackSnapshot], frame: &FrameMeta<'_>) -> Vec<AlertEvent> {
        let count = tracks.len();
        let overcrowded = count > self.threshold;
        let fire = overcrowded && !self.alert_active;
        self.alert_active = overcrowded;

        if !fire {
            return Vec::new();
        }
        let severity = Severity::classify(count, self.threshold);
        info!(
            "frame {}: overcrowding, {} people (threshold {}, {:?})",
            frame.frame_number, count, self.threshold, severity
        );
        vec![AlertEvent::new(
            AlertKind::Overcrowding,
            frame,
            json!({
                "current_count": count,
                "threshold": self.threshold,
                "severity": severity,
            }),
        )]
    }

    pub fn reset(&mut self) {
        self.alert_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::classify(10, 10), Severity::None);
        assert_eq!(Severity::classify(12, 10), Severity::Low);
        assert_eq!(Severity::classify(15, 10), Severity::Medium);
        assert_eq!(Severity::classify(16, 10), Severity::High);
        assert_eq!(Severity::classify(1, 0), Severity::High);
    }
}
