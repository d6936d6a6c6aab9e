//! Builder for creating Detection objects from various input formats.

use ndarray::Array1;

use crate::tracker::Detection;

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f32,
    embedding: Option<Array1<f32>>,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box by center and size.
    pub fn xywh(mut self, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box by top-left corner and size.
    pub fn tlwh(mut self, left: f64, top: f64, w: f64, h: f64) -> Self {
        self.x1 = left;
        self.y1 = top;
        self.x2 = left + w;
        self.y2 = top + h;
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Attach a re-identification embedding.
    pub fn embedding(mut self, embedding: impl Into<Array1<f32>>) -> Self {
        self.embedding = Some(embedding.into());
        self
    }

    pub fn build(self) -> Detection {
        let det = Detection::new(self.x1, self.y1, self.x2, self.y2, self.score);
        match self.embedding {
            Some(embedding) => det.with_embedding(embedding),
            None => det,
        }
    }
}
