//! Restricted zone polygons.

use serde::Serialize;

use crate::error::InvalidZoneError;
use crate::tracker::Point;

const EPS: f64 = 1e-9;

/// A simple polygon in pixel space, validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    points: Vec<Point>,
}

impl Zone {
    pub fn new(points: Vec<Point>) -> Result<Self, InvalidZoneError> {
        let n = points.len();
        if n < 3 {
            return Err(InvalidZoneError::TooFewPoints { count: n });
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(InvalidZoneError::NonFinite);
        }
        let edges: Vec<(Point, Point)> = (0..n).map(|i| (points[i], points[(i + 1) % n])).collect();
        if edges.iter().any(|(a, b)| a.distance(b) <= EPS) {
            return Err(InvalidZoneError::Degenerate);
        }
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (p, q) = edges[i];
                let (r, s) = edges[j];
                if segments_intersect(p, q, r, s) {
                    return Err(InvalidZoneError::SelfIntersecting { first: i, second: j });
                }
            }
        }
        if signed_area(&points).abs() <= EPS {
            return Err(InvalidZoneError::Degenerate);
        }
        for i in 0..n {
            // Adjacent edges share a vertex; they only conflict when one folds back over the other.
            let (a, b) = edges[i];
            let (_, c) = edges[(i + 1) % n];
            if cross(a, b, c).abs() <= EPS && dot(b, a, c) > 0.0 {
                return Err(InvalidZoneError::SelfIntersecting {
                    first: i,
                    second: (i + 1) % n,
                });
            }
        }

        Ok(Self { points })
    }

    pub fn from_coords(coords: &[[f64; 2]]) -> Result<Self, InvalidZoneError> {
        Self::new(coords.iter().copied().map(Point::from).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point-in-polygon by crossing number. Points on an edge or vertex are inside.
    pub fn contains(&self, p: &Point) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[j], self.points[i]);
            if on_segment(a, b, *p) {
                return true;
            }
            if (b.y > p.y) != (a.y > p.y) {
                let x_cross = (a.x - b.x) * (p.y - b.y) / (a.y - b.y) + b.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// z-component of (b - a) x (c - a).
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// (a - o) . (c - o)
fn dot(o: Point, a: Point, c: Point) -> f64 {
    (a.x - o.x) * (c.x - o.x) + (a.y - o.y) * (c.y - o.y)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let len = a.distance(&b);
    cross(a, b, p).abs() <= EPS * len.max(1.0)
        && p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

fn segments_intersect(p: Point, q: Point, r: Point, s: Point) -> bool {
    let d1 = cross(r, s, p);
    let d2 = cross(r, s, q);
    let d3 = cross(p, q, r);
    let d4 = cross(p, q, s);
    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }
    on_segment(r, s, p) || on_segment(r, s, q) || on_segment(p, q, r) || on_segment(p, q, s)
}
