use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::geom::angle_subtract;
use crate::path::{Contour, Outline};

/// `(contour, segment)`: the endpoint at the start of a segment.
pub type EndpointIndex = (usize, usize);

/// The join between a segment and its predecessor on the same contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub index: EndpointIndex,
    pub point: Point,
    /// Incoming and outgoing tangents.
    pub tangents: [Vec2; 2],
    /// Directions of `tangents`, in [-pi, pi].
    pub angles: [f64; 2],
    /// True when the outline bends sharply clockwise here. On a normalized
    /// outline that is a concave bend.
    pub corner: bool,
}

impl Endpoint {
    fn new(contour: &Contour, index: EndpointIndex, config: &ExtractionConfig) -> Self {
        let segments = contour.segments();
        let n = segments.len();
        let ins = segments[(index.1 + n - 1) % n];
        let out = segments[index.1];
        let point = out.start;

        let threshold = config.min_tangent_distance * config.min_tangent_distance;
        let mut tangents = [ins.end - ins.start, out.end - out.start];
        if let Some(control) = ins.control {
            if (point - control).hypot2() > threshold {
                tangents[0] = point - control;
            }
        }
        if let Some(control) = out.control {
            if (control - point).hypot2() > threshold {
                tangents[1] = control - point;
            }
        }
        let angles = [tangents[0].atan2(), tangents[1].atan2()];
        let corner = angle_subtract(angles[1], angles[0]) < -config.corner_angle;

        Self {
            index,
            point,
            tangents,
            angles,
            corner,
        }
    }

    /// Signed turn from the incoming to the outgoing tangent.
    pub fn turn(&self) -> f64 {
        angle_subtract(self.angles[1], self.angles[0])
    }
}

/// Adjacency view of an outline: every endpoint is a node, and every
/// segment is an edge from its start endpoint to the next one.
#[derive(Debug, Clone)]
pub struct SegmentGraph {
    contours: Vec<Contour>,
    endpoints: Vec<Endpoint>,
    /// Index of each contour's first endpoint in `endpoints`.
    offsets: Vec<usize>,
}

impl SegmentGraph {
    /// Build the graph for an outline, normalizing its orientation first.
    pub fn new(outline: &Outline, config: &ExtractionConfig) -> Self {
        let contours = outline.normalized().into_contours();
        let mut endpoints = Vec::new();
        let mut offsets = Vec::with_capacity(contours.len());
        for (i, contour) in contours.iter().enumerate() {
            offsets.push(endpoints.len());
            for j in 0..contour.len() {
                endpoints.push(Endpoint::new(contour, (i, j), config));
            }
        }
        tracing::debug!(
            contours = contours.len(),
            endpoints = endpoints.len(),
            corners = endpoints.iter().filter(|e| e.corner).count(),
            "built segment graph"
        );
        Self {
            contours,
            endpoints,
            offsets,
        }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn corners(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.corner)
    }

    pub fn endpoint(&self, index: EndpointIndex) -> Option<&Endpoint> {
        let offset = *self.offsets.get(index.0)?;
        if index.1 >= self.contours[index.0].len() {
            return None;
        }
        self.endpoints.get(offset + index.1)
    }

    /// The endpoint following `index` along its contour.
    pub fn advance(&self, index: EndpointIndex) -> EndpointIndex {
        (index.0, (index.1 + 1) % self.contours[index.0].len())
    }

    /// First endpoint within `tolerance` of `point`. A zero tolerance
    /// requires exact equality.
    pub fn find_endpoint(&self, point: Point, tolerance: f64) -> Option<&Endpoint> {
        if tolerance <= 0.0 {
            return self.endpoints.iter().find(|e| e.point == point);
        }
        self.endpoints
            .iter()
            .find(|e| e.point.distance(point) <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn graph(d: &str) -> SegmentGraph {
        SegmentGraph::new(&Outline::parse(d).unwrap(), &ExtractionConfig::default())
    }

    #[test]
    fn l_shape_has_one_concave_corner() {
        let g = graph("M 0 0 L 100 0 L 100 40 L 40 40 L 40 100 L 0 100 L 0 0 Z");
        let corners: Vec<Point> = g.corners().map(|e| e.point).collect();
        assert_eq!(corners, vec![Point::new(40.0, 40.0)]);
        let corner = g.endpoint((0, 3)).unwrap();
        assert_abs_diff_eq!(corner.turn(), -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn far_control_point_sets_tangent() {
        let g = graph("M 0 0 L 100 0 Q 100 100 0 100 L 0 0 Z");
        let end = g.endpoint((0, 1)).unwrap();
        assert_abs_diff_eq!(end.angles[0], 0.0);
        assert_abs_diff_eq!(end.angles[1], PI / 2.0);
    }

    #[test]
    fn near_control_point_is_ignored() {
        let g = graph("M 0 0 L 100 0 Q 102 1 0 100 L 0 0 Z");
        let end = g.endpoint((0, 1)).unwrap();
        assert_abs_diff_eq!(end.angles[1], (Point::new(0.0, 100.0) - end.point).atan2());
    }

    #[test]
    fn endpoint_lookup() {
        let g = graph("M 0 0 L 100 0 L 100 100 L 0 0 Z");
        assert!(g.endpoint((0, 3)).is_none());
        assert!(g.endpoint((1, 0)).is_none());
        assert_eq!(g.advance((0, 2)), (0, 0));
        assert!(g.find_endpoint(Point::new(100.5, 0.0), 0.0).is_none());
        let found = g.find_endpoint(Point::new(100.5, 0.0), 1.0).unwrap();
        assert_eq!(found.index, (0, 1));
    }
}
