//! Region geometry: the portion of the wall one machine manages.
//!
//! A region is described by a [`Polygon`] in wall coordinates. The
//! orchestrator itself only needs two things from geometry: a stable
//! fingerprint of the polygon's extents (used to key an instance's network
//! sessions) and serde support so a region can ride along in a client
//! load message. Layout computation lives outside this crate.

use serde::{Deserialize, Serialize};

/// A point in wall coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned bounding box of a polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Stable textual form of the extents, used in instance keys.
    pub fn fingerprint(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

/// A wall region polygon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from its vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Degenerate single-point polygon used by the empty module.
    pub fn empty() -> Self {
        Self {
            points: vec![Point { x: 0.0, y: 0.0 }],
        }
    }

    /// Axis-aligned rectangle helper for plain rectangular regions.
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            points: vec![
                Point { x, y },
                Point { x: x + w, y },
                Point { x: x + w, y: y + h },
                Point { x, y: y + h },
            ],
        }
    }

    /// The polygon's vertices.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Bounding box of the polygon. A polygon with no points collapses to
    /// a zero rect at the origin.
    pub fn extents(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect {
                x: 0.0,
                y: 0.0,
                w: 0.0,
                h: 0.0,
            };
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect {
            x: min_x,
            y: min_y,
            w: max_x - min_x,
            h: max_y - min_y,
        }
    }
}
