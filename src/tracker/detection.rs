//! Per-frame detector output consumed by the tracker.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::InvalidDetectionError;
use crate::tracker::rect::Rect;

/// Detection input for the tracker.
///
/// On the wire a detection is `{"bbox": [x1, y1, x2, y2], "confidence": c,
/// "embedding": [..]}`, with `embedding` optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DetectionRecord", into = "DetectionRecord")]
pub struct Detection {
    /// Bounding box, stored TLWH, built from TLBR (x1, y1, x2, y2)
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
    /// Optional appearance embedding for re-identification
    pub embedding: Option<Array1<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionRecord {
    bbox: [f64; 4],
    #[serde(alias = "score")]
    confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

impl From<DetectionRecord> for Detection {
    fn from(record: DetectionRecord) -> Self {
        let [x1, y1, x2, y2] = record.bbox;
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score: record.confidence,
            embedding: record.embedding.map(Array1::from_vec),
        }
    }
}

impl From<Detection> for DetectionRecord {
    fn from(det: Detection) -> Self {
        Self {
            bbox: det.bbox.to_tlbr(),
            confidence: det.score,
            embedding: det.embedding.map(|e| e.to_vec()),
        }
    }
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            embedding: None,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Array1<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Kalman measurement `[cx, cy, aspect, height]`.
    pub fn to_xyah(&self) -> [f64; 4] {
        self.bbox.to_xyah()
    }

    pub fn validate(&self) -> Result<(), InvalidDetectionError> {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr();
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(InvalidDetectionError::NonFinite);
        }
        if x2 <= x1 || y2 <= y1 {
            return Err(InvalidDetectionError::Malformed { x1, y1, x2, y2 });
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(InvalidDetectionError::Confidence(self.score));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_box_is_rejected() {
        let det = Detection::new(50.0, 10.0, 20.0, 80.0, 0.9);
        assert!(matches!(
            det.validate(),
            Err(InvalidDetectionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_nan_and_confidence_are_rejected() {
        let det = Detection::new(f64::NAN, 10.0, 20.0, 80.0, 0.9);
        assert_eq!(det.validate(), Err(InvalidDetectionError::NonFinite));

        let det = Detection::new(0.0, 10.0, 20.0, 80.0, 1.5);
        assert_eq!(det.validate(), Err(InvalidDetectionError::Confidence(1.5)));
    }

    #[test]
    fn test_detection_deserializes_without_embedding() {
        let json = r#"{"bbox":[1.0,2.0,4.0,6.0],"confidence":0.8}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert!(det.embedding.is_none());
        assert_eq!(det.bbox, Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(det.score, 0.8);
        assert!(det.validate().is_ok());
    }

    #[test]
    fn test_detection_reads_detector_json() {
        let json = r#"{"bbox":[10,20,50,80],"confidence":0.9,"embedding":[0.1,0.2]}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.bbox.to_tlbr(), [10.0, 20.0, 50.0, 80.0]);
        assert_eq!(det.embedding.as_ref().map(|e| e.to_vec()), Some(vec![0.1, 0.2]));

        // `score` is accepted as an alias
        let det: Detection = serde_json::from_str(r#"{"bbox":[0,0,1,1],"score":0.5}"#).unwrap();
        assert_eq!(det.score, 0.5);
    }

    #[test]
    fn test_detection_serializes_tlbr() {
        let det = Detection::new(10.0, 20.0, 50.0, 80.0, 0.5);
        let value = serde_json::to_value(&det).unwrap();
        assert_eq!(value, serde_json::json!({"bbox": [10.0, 20.0, 50.0, 80.0], "confidence": 0.5}));
    }
}
