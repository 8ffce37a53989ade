//! Stroke medians from an approximate medial axis.
//!
//! The stroke boundary is sampled into a polygon and triangulated. Each
//! Delaunay triangle's circumcenter is a Voronoi vertex, and triangles
//! sharing an edge give a Voronoi edge. Vertices inside the polygon form
//! the skeleton, whose longest shortest path is the spine.

use kurbo::Point;
use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{DelaunayTriangulation, Point2, Triangulation};
use std::collections::HashMap;

use crate::bridges::Stroke;
use crate::config::ExtractionConfig;
use crate::error::MedianError;
use crate::geom::{point_in_polygon, rdp_simplify};
use crate::path::Contour;

/// Ordered points along a stroke's centerline, from its start to its end.
pub type Median = Vec<Point>;

type Skeleton = UnGraph<Point, f64>;

/// Median of a stroke made of exactly one closed contour.
pub fn extract_median(stroke: &Stroke, config: &ExtractionConfig) -> Result<Median, MedianError> {
    match stroke.contours() {
        [contour] => contour_median(contour, config),
        contours => Err(MedianError::MultipleLoops(contours.len())),
    }
}

/// Median of a single closed contour.
///
/// Builds the skeleton at the coarse resolution and retries once at the
/// fine resolution if that fails.
pub fn contour_median(contour: &Contour, config: &ExtractionConfig) -> Result<Median, MedianError> {
    for resolution in [config.coarse_resolution, config.fine_resolution] {
        let polygon = contour.polygon(resolution);
        let distinct = count_distinct(&polygon);
        if distinct < 3 {
            return Err(MedianError::TooFewPoints(distinct));
        }
        match skeleton(&polygon, config.voronoi_bound) {
            Some(graph) => {
                let spine = spine(&graph);
                let median = rdp_simplify(&spine, config.simplify_tolerance);
                tracing::debug!(
                    resolution,
                    skeleton = graph.node_count(),
                    spine = spine.len(),
                    median = median.len(),
                    "extracted median"
                );
                return Ok(median);
            }
            None => tracing::debug!(resolution, "degenerate voronoi skeleton"),
        }
    }
    Err(MedianError::DegenerateSkeleton {
        resolution: config.fine_resolution,
    })
}

fn count_distinct(points: &[Point]) -> usize {
    let mut sorted: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();
    sorted.len()
}

/// Interior Voronoi graph of the polygon's vertices, or `None` if the
/// triangulation fails or leaves no interior edge.
fn skeleton(polygon: &[Point], bound: f64) -> Option<Skeleton> {
    let sites: Vec<Point2<f64>> = polygon.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let triangulation: DelaunayTriangulation<Point2<f64>> =
        DelaunayTriangulation::bulk_load(sites).ok()?;

    let mut graph = Skeleton::new_undirected();
    let mut nodes: HashMap<FixedFaceHandle<InnerTag>, NodeIndex> = HashMap::new();
    for face in triangulation.inner_faces() {
        let center = face.circumcenter();
        let center = Point::new(center.x, center.y);
        let finite = center.x.is_finite() && center.y.is_finite();
        if finite
            && center.x.abs() <= bound
            && center.y.abs() <= bound
            && point_in_polygon(center, polygon)
        {
            nodes.insert(face.fix(), graph.add_node(center));
        }
    }

    for face in triangulation.inner_faces() {
        let Some(&a) = nodes.get(&face.fix()) else {
            continue;
        };
        for edge in face.adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            if neighbor.fix().index() <= face.fix().index() {
                continue;
            }
            if let Some(&b) = nodes.get(&neighbor.fix()) {
                graph.add_edge(a, b, graph[a].distance(graph[b]));
            }
        }
    }

    (graph.edge_count() > 0).then_some(graph)
}

/// Longest shortest path through the skeleton, by double sweep.
///
/// The sweep runs in the largest connected component, since stray
/// interior vertices can form small islands of their own.
fn spine(graph: &Skeleton) -> Vec<Point> {
    let Some(root) = largest_component_root(graph) else {
        return vec![];
    };
    let first = farthest(graph, root);
    let second = farthest(graph, first);
    astar(graph, first, |n| n == second, |e| *e.weight(), |_| 0.0)
        .map(|(_, path)| path.into_iter().map(|n| graph[n]).collect())
        .unwrap_or_default()
}

fn largest_component_root(graph: &Skeleton) -> Option<NodeIndex> {
    let mut components = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.edge_indices() {
        if let Some((a, b)) = graph.edge_endpoints(edge) {
            components.union(a.index(), b.index());
        }
    }
    let mut sizes = vec![0usize; graph.node_count()];
    for node in graph.node_indices() {
        sizes[components.find(node.index())] += 1;
    }
    // First node of the largest component; ties go to the earliest.
    let mut best: Option<(usize, NodeIndex)> = None;
    for node in graph.node_indices() {
        let size = sizes[components.find(node.index())];
        if best.map_or(true, |(s, _)| size > s) {
            best = Some((size, node));
        }
    }
    best.map(|(_, node)| node)
}

/// Node farthest from `start` by path length. Ties go to the lowest index.
fn farthest(graph: &Skeleton, start: NodeIndex) -> NodeIndex {
    let distances = dijkstra(graph, start, None, |e| *e.weight());
    let mut result = start;
    let mut best = 0.0;
    for node in graph.node_indices() {
        if let Some(&d) = distances.get(&node) {
            if d > best {
                best = d;
                result = node;
            }
        }
    }
    result
}
