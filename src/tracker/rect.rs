use serde::{Deserialize, Serialize};

/// A 2-D point in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Bounding box representation with format conversion utilities.
///
/// Supports three common bounding box formats:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYAH: Center X, Center Y, Aspect Ratio (w/h), Height
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f64,
    /// Top-left y coordinate
    pub y: f64,
    /// Width of the bounding box
    pub width: f64,
    /// Height of the bounding box
    pub height: f64,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYAH format (center x, center y, aspect ratio, height).
    #[inline]
    pub fn from_xyah(cx: f64, cy: f64, aspect_ratio: f64, height: f64) -> Self {
        let width = aspect_ratio * height;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to XYAH format: (center_x, center_y, aspect_ratio, height).
    #[inline]
    pub fn to_xyah(&self) -> [f64; 4] {
        let (cx, cy) = (self.x + self.width / 2.0, self.y + self.height / 2.0);
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, aspect_ratio, self.height]
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Bottom-center of the box, where a standing person touches the ground.
    #[inline]
    pub fn foot_point(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let xyah = rect.to_xyah();
        assert_eq!(xyah[0], 25.0);
        assert_eq!(xyah[1], 40.0);
        assert!((xyah[2] - 0.75).abs() < 1e-9);
        assert_eq!(xyah[3], 40.0);
    }

    #[test]
    fn test_from_xyah_inverts_to_xyah() {
        let rect = Rect::from_xyah(25.0, 40.0, 0.75, 40.0);
        assert!((rect.x - 10.0).abs() < 1e-9);
        assert!((rect.y - 20.0).abs() < 1e-9);
        assert!((rect.width - 30.0).abs() < 1e-9);
        assert!((rect.height - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_foot_point_is_bottom_center() {
        let rect = Rect::from_tlbr(10.0, 20.0, 50.0, 120.0);
        assert_eq!(rect.foot_point(), Point::new(30.0, 120.0));
        assert_eq!(rect.center(), Point::new(30.0, 70.0));
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection 25, union 175
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_same_box() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-9);
    }
}
