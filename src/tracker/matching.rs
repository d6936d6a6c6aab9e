//! Matching utilities for multi-object tracking.

use ndarray::{Array1, Array2};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::detection::Detection;
use crate::tracker::track::Track;

/// Cost assigned to pairs that must never be matched.
pub const INFEASIBLE_COST: f64 = f64::INFINITY;

const PADDING_COST: f64 = 1e6;
const REJECT_MARGIN: f64 = 1e-5;
/// Total perturbation spread over all rows to break exact ties toward the
/// lowest row.
const TIE_BREAK_SPAN: f64 = 1e-6;

/// `1 - cos(a, b)`, or `None` when either vector is empty, zero or of a
/// different length.
pub fn cosine_distance(a: &Array1<f32>, b: &Array1<f32>) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return None;
    }
    Some(1.0 - f64::from(a.dot(b) / (norm_a * norm_b)))
}

/// Association cost between predicted tracks and detections.
///
/// Appearance distance is used when both sides carry an embedding, gated by
/// the squared Mahalanobis distance of the box center. Otherwise the cost
/// falls back to `1 - IoU`.
pub fn association_cost(
    kalman_filter: &KalmanFilter,
    tracks: &[&Track],
    detections: &[&Detection],
    gating_threshold: f64,
) -> Array2<f64> {
    let mut cost = Array2::zeros((tracks.len(), detections.len()));
    for (i, track) in tracks.iter().enumerate() {
        let track_box = track.rect();
        for (j, det) in detections.iter().enumerate() {
            let appearance = match (track.embedding(), det.embedding.as_ref()) {
                (Some(a), Some(b)) => cosine_distance(a, b),
                _ => None,
            };
            cost[[i, j]] = match appearance {
                Some(distance) => {
                    let gated = kalman_filter
                        .gating_distance(track.mean(), track.covariance(), det.to_xyah())
                        .map(|d2| d2 > gating_threshold)
                        .unwrap_or(true);
                    if gated { INFEASIBLE_COST } else { distance }
                }
                None => 1.0 - track_box.iou(&det.bbox),
            };
        }
    }
    cost
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-cost assignment that never returns a pair costing more than `max_cost`.
///
/// Rows are expected in priority order (ascending track id); among equal-cost
/// alternatives the lower row wins.
pub fn linear_assignment(cost_matrix: &Array2<f64>, max_cost: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let tie_step = TIE_BREAK_SPAN / size as f64;
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);

    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        padded[[i, j]] = if cost.is_finite() && cost <= max_cost {
            cost + tie_step * i as f64
        } else {
            max_cost + REJECT_MARGIN
        };
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] <= max_cost {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(err) => {
            tracing::warn!("linear assignment failed, leaving frame unmatched: {:?}", err);
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
