use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::endpoint::{Endpoint, EndpointIndex, SegmentGraph};
use super::Bridge;
use crate::error::SegmentError;
use crate::geom::{angle_subtract, direction, segment_intersection};
use crate::path::{Contour, Segment};

/// Walks are retried this many times. Later attempts resolve junctions
/// that the greedy first attempt gets wrong.
const MAX_ATTEMPTS: usize = 3;

/// One ink stroke: a closed path cut out of the glyph outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    contours: Vec<Contour>,
}

impl Stroke {
    pub fn new(contour: Contour) -> Self {
        Self {
            contours: vec![contour],
        }
    }

    pub fn from_contours(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Normal-form path string for the stroke.
    pub fn to_svg(&self) -> String {
        crate::path::Outline::new(self.contours.clone()).to_svg()
    }
}

type BridgeAdjacency = BTreeMap<EndpointIndex, Vec<EndpointIndex>>;

/// Partition the outline into one closed stroke per component.
///
/// Every segment of the outline ends up on exactly one stroke. Bridges
/// are matched to endpoints by position, within `tolerance`.
pub fn split_on_bridges(
    graph: &SegmentGraph,
    bridges: &[Bridge],
    tolerance: f64,
) -> Result<Vec<Stroke>, SegmentError> {
    let adjacency = bridge_adjacency(graph, bridges, tolerance)?;
    let mut extracted = BTreeSet::new();
    let mut strokes = Vec::new();

    for attempt in 0..MAX_ATTEMPTS {
        for (i, contour) in graph.contours().iter().enumerate() {
            for j in 0..contour.len() {
                if extracted.contains(&(i, j)) {
                    continue;
                }
                let mut walk = Walk::new(graph, &adjacency, &mut extracted, attempt == 0);
                if let Some(segments) = walk.run((i, j)) {
                    strokes.push(((i, j), segments));
                }
            }
        }
        if count_missing(graph, &extracted) == 0 {
            break;
        }
        tracing::debug!(attempt, "stroke walk left segments behind, retrying");
    }

    let missing: Vec<EndpointIndex> = graph
        .contours()
        .iter()
        .enumerate()
        .flat_map(|(i, c)| (0..c.len()).map(move |j| (i, j)))
        .filter(|index| !extracted.contains(index))
        .collect();
    if !missing.is_empty() {
        return Err(SegmentError::OpenComponent { segments: missing });
    }

    let strokes = strokes
        .into_iter()
        .map(|(start, segments)| {
            Contour::new(segments)
                .map(Stroke::new)
                .map_err(|_| SegmentError::OpenComponent {
                    segments: vec![start],
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(strokes = strokes.len(), bridges = bridges.len(), "split outline");
    Ok(strokes)
}

fn count_missing(graph: &SegmentGraph, extracted: &BTreeSet<EndpointIndex>) -> usize {
    graph.endpoints().len() - extracted.len()
}

fn bridge_adjacency(
    graph: &SegmentGraph,
    bridges: &[Bridge],
    tolerance: f64,
) -> Result<BridgeAdjacency, SegmentError> {
    let mut adjacency = BridgeAdjacency::new();
    for bridge in bridges {
        let (a, b) = bridge.points();
        if a == b {
            return Err(SegmentError::DegenerateBridge { x: a.x, y: a.y });
        }
        let lookup = |p: Point| {
            graph
                .find_endpoint(p, tolerance)
                .map(|e| e.index)
                .ok_or(SegmentError::UnknownBridgeEndpoint { x: p.x, y: p.y })
        };
        let (ia, ib) = (lookup(a)?, lookup(b)?);
        for (from, to) in [(ia, ib), (ib, ia)] {
            let targets = adjacency.entry(from).or_default();
            if !targets.contains(&to) {
                targets.push(to);
            }
        }
    }
    Ok(adjacency)
}

/// State of a single stroke walk.
struct Walk<'a> {
    graph: &'a SegmentGraph,
    adjacency: &'a BridgeAdjacency,
    extracted: &'a mut BTreeSet<EndpointIndex>,
    greedy: bool,
    result: Vec<Segment>,
    visited: BTreeSet<EndpointIndex>,
    /// Bridge lines added to the stroke, checked for crossings.
    lines: Vec<(Point, Point)>,
    self_intersecting: bool,
}

impl<'a> Walk<'a> {
    fn new(
        graph: &'a SegmentGraph,
        adjacency: &'a BridgeAdjacency,
        extracted: &'a mut BTreeSet<EndpointIndex>,
        greedy: bool,
    ) -> Self {
        Self {
            graph,
            adjacency,
            extracted,
            greedy,
            result: Vec::new(),
            visited: BTreeSet::new(),
            lines: Vec::new(),
            self_intersecting: false,
        }
    }

    /// Follow the outline from `start`, crossing bridges, until the walk
    /// closes. Returns `None` if it runs into a segment that is already
    /// taken, or if the closed stroke is a lone segment.
    fn run(&mut self, start: EndpointIndex) -> Option<Vec<Segment>> {
        let mut current = start;
        loop {
            self.result
                .push(self.graph.contours()[current.0].segments()[current.1]);
            self.visited.insert(current);
            current = self.graph.advance(current);

            if let Some(targets) = self.adjacency.get(&current) {
                let endpoint = self.graph.endpoint(current)?;
                let mut options = targets.clone();
                options.sort_by(|&a, &b| {
                    let (a, b) = (self.angle(endpoint, a), self.angle(endpoint, b));
                    a.total_cmp(&b)
                });
                let before = self.result.len();
                let next = if self.greedy {
                    options[0]
                } else {
                    self.select_bridge(endpoint, &options)
                };
                if self.result.len() == before {
                    let to = self.point(next);
                    self.push_lines(&[endpoint.point, to]);
                }
                current = next;
            }

            if current == start {
                if self.self_intersecting {
                    tracing::warn!(?start, "extracted a self-intersecting stroke");
                }
                let count = self.visited.len();
                self.extracted.extend(self.visited.iter().copied());
                if count == 1 {
                    tracing::warn!(?start, "dropping single-segment stroke");
                    return None;
                }
                return Some(std::mem::take(&mut self.result));
            }
            if self.extracted.contains(&current) || self.visited.contains(&current) {
                return None;
            }
        }
    }

    fn point(&self, index: EndpointIndex) -> Point {
        self.graph
            .endpoint(index)
            .map(|e| e.point)
            .unwrap_or_default()
    }

    /// Direction from `from` to `to`, relative to the walk's heading at `at`.
    fn angle_between(&self, at: &Endpoint, from: EndpointIndex, to: EndpointIndex) -> f64 {
        angle_subtract(direction(self.point(from), self.point(to)), at.angles[0])
    }

    fn angle(&self, at: &Endpoint, to: EndpointIndex) -> f64 {
        self.angle_between(at, at.index, to)
    }

    fn push_lines(&mut self, points: &[Point]) {
        let old = self.lines.len();
        for pair in points.windows(2) {
            self.lines.push((pair[0], pair[1]));
            self.result.push(Segment::line(pair[0], pair[1]));
        }
        if self.self_intersecting {
            return;
        }
        self.self_intersecting = (0..old).any(|i| {
            (old..self.lines.len())
                .any(|j| segment_intersection(self.lines[i], self.lines[j]).is_some())
        });
    }

    /// Choose which bridge to cross at `endpoint` on a retry.
    ///
    /// With a single bridge leading into an already-extracted segment, the
    /// stroke ends at a junction shared with other strokes' bridges (a
    /// star). The walk then turns onto a bridge that meets or crosses this
    /// one, adding the bridge fragments itself. Otherwise it prefers the
    /// first bridge into a segment that has not been extracted yet.
    fn select_bridge(&mut self, endpoint: &Endpoint, options: &[EndpointIndex]) -> EndpointIndex {
        let first = options[0];
        if options.len() == 1 && self.extracted.contains(&first) {
            let here = endpoint.index;
            let segment1 = (endpoint.point, self.point(first));
            for (&key, targets) in self.adjacency {
                if key == here {
                    continue;
                }
                for &target in targets {
                    if target == here {
                        continue;
                    }
                    let mut indices2 = (key, target);
                    let mut segment2 = (self.point(key), self.point(target));
                    if key == first && !self.extracted.contains(&target) {
                        self.push_lines(&[segment1.0, segment1.1, segment2.1]);
                        return target;
                    } else if target == first && !self.extracted.contains(&key) {
                        self.push_lines(&[segment1.0, segment1.1, segment2.0]);
                        return key;
                    }
                    if let Some(crossing) = segment_intersection(segment1, segment2) {
                        let angle1 = self.angle(endpoint, first);
                        let angle2 = self.angle_between(endpoint, indices2.0, indices2.1);
                        if angle_subtract(angle2, angle1) < 0.0 {
                            indices2 = (indices2.1, indices2.0);
                            segment2 = (segment2.1, segment2.0);
                        }
                        self.push_lines(&[segment1.0, crossing, segment2.1]);
                        return indices2.1;
                    }
                }
            }
        } else if let Some(&open) = options.iter().find(|&&o| !self.extracted.contains(&o)) {
            return open;
        }
        first
    }
}
