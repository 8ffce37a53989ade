//! Splitting a merged glyph outline into independent ink strokes.
//!
//! Where two strokes overlap, a font outline traces around their union,
//! and the points where the strokes' edges meet show up as concave
//! corners. A bridge joins two such corners. Walking the outline and
//! crossing every bridge encountered recovers each stroke as its own
//! closed contour.

mod endpoint;
mod extract;
mod propose;

pub use endpoint::{Endpoint, EndpointIndex, SegmentGraph};
pub use extract::{split_on_bridges, Stroke};
pub use propose::{corner_features, propose_bridges, BridgeScorer, HandTunedScorer};

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An unordered pair of outline points to connect while splitting strokes.
///
/// The pair is stored in canonical order, so `Bridge::new(a, b)` and
/// `Bridge::new(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Point, Point)", into = "(Point, Point)")]
pub struct Bridge {
    a: Point,
    b: Point,
}

impl Bridge {
    pub fn new(a: Point, b: Point) -> Self {
        if compare_points(a, b) == Ordering::Greater {
            Self { a: b, b: a }
        } else {
            Self { a, b }
        }
    }

    pub fn points(&self) -> (Point, Point) {
        (self.a, self.b)
    }
}

impl From<(Point, Point)> for Bridge {
    fn from((a, b): (Point, Point)) -> Self {
        Self::new(a, b)
    }
}

impl From<Bridge> for (Point, Point) {
    fn from(bridge: Bridge) -> Self {
        (bridge.a, bridge.b)
    }
}

fn compare_points(a: Point, b: Point) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridges_are_symmetric() {
        let p = Point::new(50.0, 0.0);
        let q = Point::new(50.0, 100.0);
        assert_eq!(Bridge::new(p, q), Bridge::new(q, p));
        assert_eq!(Bridge::new(q, p).points(), (p, q));
    }

    #[test]
    fn bridge_json_is_a_point_pair() {
        let bridge = Bridge::new(Point::new(3.0, 4.0), Point::new(1.0, 2.0));
        let json = serde_json::to_string(&bridge).unwrap();
        let back: Bridge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bridge);
    }
}
