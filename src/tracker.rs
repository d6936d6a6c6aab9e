mod arena;
mod detection;
mod kalman_filter;
mod matching;
mod multi_tracker;
mod rect;
mod track;
mod track_state;

pub use arena::TrackArena;
pub use detection::Detection;
pub use kalman_filter::KalmanFilter;
pub use matching::{AssignmentResult, INFEASIBLE_COST, association_cost, cosine_distance, linear_assignment};
pub use multi_tracker::{Tracker, TrackerConfig};
pub use rect::{Point, Rect};
pub use track::{HistorySample, Track, TrackId, TrackSnapshot};
pub use track_state::TrackState;
