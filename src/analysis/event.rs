//! Alert events emitted by analyzers and per-session event statistics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::FrameMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Overcrowding,
    Loitering,
    ZoneViolation,
    SuspiciousActivity,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Overcrowding,
        AlertKind::Loitering,
        AlertKind::ZoneViolation,
        AlertKind::SuspiciousActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Overcrowding => "overcrowding",
            AlertKind::Loitering => "loitering",
            AlertKind::ZoneViolation => "zone_violation",
            AlertKind::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert, handed to the sink exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_type: AlertKind,
    /// Stream time in seconds
    pub timestamp: f64,
    pub frame_number: u64,
    pub details: Map<String, Value>,
}

impl AlertEvent {
    pub(crate) fn new(event_type: AlertKind, frame: &FrameMeta<'_>, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_owned(), other);
                map
            }
        };
        Self {
            event_type,
            timestamp: frame.timestamp,
            frame_number: frame.frame_number,
            details,
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// The `track_id` detail, for per-track alert kinds.
    pub fn track_id(&self) -> Option<u64> {
        self.detail("track_id").and_then(Value::as_u64)
    }
}

/// Totals over a stream of frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_frames: u64,
    pub total_events: usize,
    pub event_breakdown: BTreeMap<AlertKind, usize>,
}

impl Default for AnalysisSummary {
    fn default() -> Self {
        Self {
            total_frames: 0,
            total_events: 0,
            event_breakdown: AlertKind::ALL.iter().map(|&k| (k, 0)).collect(),
        }
    }
}

impl AnalysisSummary {
    pub fn record_frame(&mut self, events: &[AlertEvent]) {
        self.total_frames += 1;
        self.total_events += events.len();
        for event in events {
            *self.event_breakdown.entry(event.event_type).or_insert(0) += 1;
        }
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.event_breakdown.get(&kind).copied().unwrap_or(0)
    }
}
