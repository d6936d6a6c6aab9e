use serde::Serialize;

/// Track lifecycle. Only `Confirmed` tracks are visible to analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Newly created track, not yet confirmed
    #[default]
    Tentative,
    /// Matched for at least `min_hits` consecutive frames
    Confirmed,
    /// Terminal; the slot is freed at the end of the frame
    Deleted,
}
