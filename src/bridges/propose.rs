use std::f64::consts::PI;

use super::endpoint::{Endpoint, SegmentGraph};
use super::Bridge;
use crate::assignment::{solve_max, SquareMatrix};
use crate::config::ExtractionConfig;
use crate::error::AssignmentError;
use crate::geom::{angle_subtract, direction};

/// Scores a directed corner pair as a bridge candidate. Higher is better.
///
/// Implementations receive the vector built by [`corner_features`].
pub trait BridgeScorer {
    fn score(&self, features: &[f64; 8]) -> f64;
}

impl<F> BridgeScorer for F
where
    F: Fn(&[f64; 8]) -> f64,
{
    fn score(&self, features: &[f64; 8]) -> f64 {
        self(features)
    }
}

/// Angle and distance penalties only; ignores most of the features.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandTunedScorer;

impl BridgeScorer for HandTunedScorer {
    fn score(&self, f: &[f64; 8]) -> f64 {
        if f[6] > 0.0 {
            return -f[4] * f[4];
        }
        let mut angle_penalty = f[0] * f[0] + f[1] * f[1];
        // Both corners point at each other and their other tangents agree:
        // the usual shape of two strokes crossing.
        if f[0] > 0.0 && f[1] > 0.0 && f[2] + f[3] < -0.5 * PI {
            angle_penalty /= 16.0;
        }
        -(angle_penalty + f[7])
    }
}

/// Features of a bridge from corner `ins` to corner `out`:
///
/// 0. bridge direction relative to the incoming tangent at `ins`
/// 1. outgoing tangent at `out` relative to the bridge
/// 2. outgoing tangent at `ins` relative to the bridge
/// 3. bridge relative to the incoming tangent at `out`
/// 4. turn at `ins`
/// 5. turn at `out`
/// 6. 1 if the corners coincide, else 0
/// 7. distance over `max_distance`
pub fn corner_features(ins: &Endpoint, out: &Endpoint, max_distance: f64) -> [f64; 8] {
    let trivial = ins.point == out.point;
    let angle = direction(ins.point, out.point);
    [
        angle_subtract(angle, ins.angles[0]),
        angle_subtract(out.angles[1], angle),
        angle_subtract(ins.angles[1], angle),
        angle_subtract(angle, out.angles[0]),
        ins.turn(),
        out.turn(),
        if trivial { 1.0 } else { 0.0 },
        ins.point.distance(out.point) / max_distance,
    ]
}

/// Propose bridges by pairing corners with a maximum-score matching.
///
/// The matching is over directed scores, where a pair may also take its
/// reversed score less `reversal_penalty`. A corner matched with itself
/// gets no bridge, and a mutual pair yields a single bridge.
pub fn propose_bridges(
    graph: &SegmentGraph,
    scorer: &dyn BridgeScorer,
    config: &ExtractionConfig,
) -> Result<Vec<Bridge>, AssignmentError> {
    let corners: Vec<&Endpoint> = graph.corners().collect();
    if corners.is_empty() {
        return Ok(vec![]);
    }
    let n = corners.len();
    let directed = SquareMatrix::from_fn(n, |i, j| {
        scorer.score(&corner_features(
            corners[i],
            corners[j],
            config.max_bridge_distance,
        ))
    });
    let scores = SquareMatrix::from_fn(n, |i, j| {
        directed[(i, j)].max(directed[(j, i)] - config.reversal_penalty)
    });
    let matching = solve_max(&scores)?.row_to_col;

    let mut bridges = Vec::new();
    for (i, &j) in matching.iter().enumerate() {
        if j <= i && matching[j] == i {
            continue;
        }
        if corners[i].point == corners[j].point {
            tracing::debug!(index = ?corners[i].index, "skipping bridge between coincident corners");
            continue;
        }
        bridges.push(Bridge::new(corners[i].point, corners[j].point));
    }
    tracing::debug!(corners = n, bridges = bridges.len(), "proposed bridges");
    Ok(bridges)
}
