use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

use super::hungarian::{solve, SquareMatrix};
use crate::config::OrderConfig;
use crate::decomposition::{map_rect, Component, DecompositionNode, Operator};
use crate::error::AssignmentError;
use crate::geom::resample;
use crate::median::Median;

/// Enclosing components of a lower-left surround that are written last.
const WRITTEN_LAST: &str = "辶廴乙";

/// Direction the ink of a stroke was matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Forward,
    Reversed,
}

/// One stroke the decomposition predicts, in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedStroke {
    /// Address of the leaf this stroke comes from.
    pub path: Vec<usize>,
    pub component: Component,
    /// Index of the stroke within its component.
    pub index: usize,
    pub median: Median,
}

/// What an extracted stroke was matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeLabel {
    pub path: Vec<usize>,
    pub component: Component,
    pub index: usize,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeOrder {
    /// Extracted stroke indices in writing order.
    pub order: Vec<usize>,
    /// Per extracted stroke, its matched expected stroke. `None` for
    /// strokes left over once every expected stroke is taken.
    pub labels: Vec<Option<StrokeLabel>>,
    pub total_cost: f64,
    /// Problems that did not prevent an order from being produced.
    pub diagnostics: Vec<String>,
}

/// Sum of squared distances between two medians resampled to `points`
/// points, in whichever orientation of `b` fits better.
pub fn stroke_cost(a: &[Point], b: &[Point], points: usize) -> (f64, Orientation) {
    let a = resample(a, points);
    let b = resample(b, points);
    let forward: f64 = a.iter().zip(&b).map(|(p, q)| (*p - *q).hypot2()).sum();
    let reversed: f64 = a.iter().zip(b.iter().rev()).map(|(p, q)| (*p - *q).hypot2()).sum();
    if reversed < forward {
        (reversed, Orientation::Reversed)
    } else {
        (forward, Orientation::Forward)
    }
}

/// Strokes of the tree's resolved leaves, in conventional writing order.
///
/// Components are ordered by their operator: side by side and stacked
/// operands in sequence, and enclosures by the conventions below. Leaves
/// without medians and overlaid compounds are reported as diagnostics.
pub fn expected_order(tree: &DecompositionNode, config: &OrderConfig) -> (Vec<ExpectedStroke>, Vec<String>) {
    let size = config.canvas_size;
    let mut diagnostics = Vec::new();
    let strokes = collect(
        tree,
        Rect::new(0.0, 0.0, size, size),
        &mut Vec::new(),
        size,
        &mut diagnostics,
    );
    (strokes, diagnostics)
}

fn collect(
    node: &DecompositionNode,
    rect: Rect,
    path: &mut Vec<usize>,
    size: f64,
    diagnostics: &mut Vec<String>,
) -> Vec<ExpectedStroke> {
    match node {
        DecompositionNode::Leaf {
            component,
            medians: Some(medians),
        } => {
            let scale = Vec2::new(rect.width() / size, rect.height() / size);
            if let Some(index) = medians.iter().position(|m| m.is_empty()) {
                diagnostics.push(format!(
                    "component {} at {:?} has an empty median {}",
                    char::from(*component),
                    path,
                    index
                ));
            }
            medians
                .iter()
                .enumerate()
                .filter(|(_, median)| !median.is_empty())
                .map(|(index, median)| ExpectedStroke {
                    path: path.clone(),
                    component: *component,
                    index,
                    median: median
                        .iter()
                        .map(|p| Point::new(rect.x0 + p.x * scale.x, rect.y0 + p.y * scale.y))
                        .collect(),
                })
                .collect()
        }
        DecompositionNode::Leaf { component, .. } => {
            diagnostics.push(format!(
                "no medians for component {} at {:?}",
                char::from(*component),
                path
            ));
            vec![]
        }
        DecompositionNode::Compound { operator, children } => {
            let mut parts = Vec::with_capacity(children.len());
            for (i, (child, unit)) in children.iter().zip(operator.layout()).enumerate() {
                path.push(i);
                parts.push(collect(child, map_rect(rect, unit), path, size, diagnostics));
                path.pop();
            }
            combine(*operator, children, parts, path, diagnostics)
        }
    }
}

fn is_leaf(node: Option<&DecompositionNode>, chars: &str) -> bool {
    match node {
        Some(DecompositionNode::Leaf {
            component: Component::Char(c),
            ..
        }) => chars.contains(*c),
        _ => false,
    }
}

/// Merge per-operand orders. Surround operands are (enclosure, inside).
fn combine(
    operator: Operator,
    children: &[DecompositionNode],
    mut parts: Vec<Vec<ExpectedStroke>>,
    path: &[usize],
    diagnostics: &mut Vec<String>,
) -> Vec<ExpectedStroke> {
    // Enclosure strokes before the inside, then the rest of the enclosure.
    let enclosure = children.first();
    let enclosure_strokes = parts.first().map_or(0, Vec::len);
    let split = match operator {
        Operator::Surround if is_leaf(enclosure, "囗") && enclosure_strokes == 3 => Some(2),
        Operator::SurroundFromLeft if is_leaf(enclosure, "匚") && enclosure_strokes == 2 => Some(1),
        _ => None,
    };
    if let Some(split) = split {
        let inner = parts.pop().unwrap_or_default();
        let mut outer = parts.pop().unwrap_or_default();
        let tail = outer.split_off(split);
        outer.extend(inner);
        outer.extend(tail);
        return outer;
    }

    let inside_first = match operator {
        Operator::SurroundFromBelow => true,
        Operator::SurroundFromLowerLeft => is_leaf(enclosure, WRITTEN_LAST),
        _ => false,
    };
    if inside_first {
        parts.reverse();
    }
    if operator == Operator::Overlaid {
        tracing::warn!(?path, "stroke order of an overlaid compound is ambiguous");
        diagnostics.push(format!(
            "overlaid compound at {:?} has no well-defined stroke order",
            path
        ));
    }
    parts.into_iter().flatten().collect()
}

/// Furthest extent of a median toward the top-left corner.
fn top_left_reach(median: &[Point]) -> f64 {
    let toward = Vec2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2);
    median
        .iter()
        .map(|p| p.to_vec2().dot(toward))
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Match extracted medians to the strokes the decomposition predicts and
/// order them accordingly.
///
/// Strokes matched to nothing are ordered after the matched ones, those
/// reaching furthest toward the top left first.
pub fn order_strokes(
    medians: &[Median],
    tree: &DecompositionNode,
    config: &OrderConfig,
) -> Result<StrokeOrder, AssignmentError> {
    if let Some(stroke) = medians.iter().position(|m| m.is_empty()) {
        return Err(AssignmentError::EmptyMedian { stroke });
    }
    let (expected, diagnostics) = expected_order(tree, config);
    let strokes = medians.len();
    let targets = expected.len();
    let n = strokes.max(targets);

    let reach: Vec<f64> = medians.iter().map(|m| top_left_reach(m)).collect();
    let mut orientations = vec![vec![Orientation::Forward; targets]; strokes];
    let cost = SquareMatrix::from_fn(n, |i, j| match (i < strokes, j < targets) {
        (true, true) => {
            let (cost, orientation) = stroke_cost(&medians[i], &expected[j].median, config.points);
            orientations[i][j] = orientation;
            cost
        }
        (true, false) => {
            let slot = (j - targets) as f64;
            config.missing_penalty + slot * reach[i] * config.top_left_weight
        }
        _ => config.missing_penalty,
    });
    let assignment = solve(&cost)?;

    let labels: Vec<Option<StrokeLabel>> = (0..strokes)
        .map(|i| {
            let j = assignment.row_to_col[i];
            expected.get(j).map(|target| StrokeLabel {
                path: target.path.clone(),
                component: target.component,
                index: target.index,
                orientation: orientations[i][j],
            })
        })
        .collect();
    let mut order: Vec<usize> = (0..strokes).collect();
    order.sort_by_key(|&i| assignment.row_to_col[i]);

    tracing::debug!(
        strokes,
        expected = targets,
        cost = assignment.total_cost,
        "ordered strokes"
    );
    Ok(StrokeOrder {
        order,
        labels,
        total_cost: assignment.total_cost,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn vertical(x: f64) -> Median {
        vec![Point::new(x, 0.0), Point::new(x, 1024.0)]
    }

    fn horizontal(y: f64) -> Median {
        vec![Point::new(0.0, y), Point::new(1024.0, y)]
    }

    fn resolved(decomposition: &str, table: &[(char, Vec<Median>)]) -> DecompositionNode {
        let mut tree = DecompositionNode::parse(decomposition).unwrap();
        tree.resolve_medians(&mut |c| {
            table.iter().find(|(k, _)| *k == c).map(|(_, m)| m.clone())
        });
        tree
    }

    #[test]
    fn reversed_medians_cost_nothing() {
        let a = vertical(10.0);
        let b: Median = a.iter().rev().copied().collect();
        let (cost, orientation) = stroke_cost(&a, &b, 8);
        assert_abs_diff_eq!(cost, 0.0);
        assert_eq!(orientation, Orientation::Reversed);
    }

    #[test]
    fn enclosure_rules() {
        let config = OrderConfig::default();
        let box3 = vec![vertical(0.0), horizontal(0.0), horizontal(1024.0)];
        let table = [('囗', box3), ('一', vec![horizontal(512.0)])];

        let (order, diagnostics) = expected_order(&resolved("⿴囗一", &table), &config);
        assert!(diagnostics.is_empty());
        let keys: Vec<(Vec<usize>, usize)> = order.iter().map(|s| (s.path.clone(), s.index)).collect();
        assert_eq!(
            keys,
            vec![(vec![0], 0), (vec![0], 1), (vec![1], 0), (vec![0], 2)]
        );
        // The inside is placed in the middle half.
        assert_abs_diff_eq!(order[2].median[0].x, 256.0);
        assert_abs_diff_eq!(order[2].median[0].y, 512.0);

        let table = [('凵', vec![vertical(0.0)]), ('一', vec![horizontal(512.0)])];
        let (order, _) = expected_order(&resolved("⿶凵一", &table), &config);
        assert_eq!(order[0].path, vec![1]);

        let table = [('辶', vec![vertical(0.0)]), ('一', vec![horizontal(512.0)])];
        let (order, _) = expected_order(&resolved("⿺辶一", &table), &config);
        assert_eq!(order[0].path, vec![1]);
        let (order, _) = expected_order(&resolved("⿺走一", &[('走', vec![vertical(0.0)])]), &config);
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn overlaid_and_unresolved_leaves_are_diagnosed() {
        let config = OrderConfig::default();
        let table = [('十', vec![horizontal(512.0)])];
        let (order, diagnostics) = expected_order(&resolved("⿻十口", &table), &config);
        assert_eq!(order.len(), 1);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn left_right_strokes_take_their_sides() {
        let config = OrderConfig::default();
        let table = [('丨', vec![vertical(512.0)]), ('〡', vec![vertical(512.0)])];
        let tree = resolved("⿰丨〡", &table);
        let strokes = vec![vertical(768.0), vertical(256.0)];
        let result = order_strokes(&strokes, &tree, &config).unwrap();
        assert_abs_diff_eq!(result.total_cost, 0.0);
        assert_eq!(result.order, vec![1, 0]);
        assert_eq!(result.labels[0].as_ref().unwrap().path, vec![1]);
        assert_eq!(result.labels[1].as_ref().unwrap().path, vec![0]);
    }

    #[test]
    fn excess_strokes_sort_top_left_first() {
        let config = OrderConfig::default();
        let tree = DecompositionNode::unknown();
        let strokes = vec![
            vec![Point::new(900.0, 900.0), Point::new(1000.0, 1000.0)],
            vec![Point::new(10.0, 10.0), Point::new(100.0, 10.0)],
        ];
        let result = order_strokes(&strokes, &tree, &config).unwrap();
        assert_eq!(result.order, vec![1, 0]);
        assert!(result.labels.iter().all(Option::is_none));
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn empty_medians_are_rejected() {
        let config = OrderConfig::default();
        let table = [('二', vec![horizontal(300.0), horizontal(700.0)])];
        let tree = resolved("二", &table);
        assert_eq!(
            order_strokes(&[horizontal(300.0), vec![]], &tree, &config),
            Err(AssignmentError::EmptyMedian { stroke: 1 })
        );

        // An empty component median is never a free match.
        let table = [('二', vec![vec![], horizontal(700.0)])];
        let (expected, diagnostics) = expected_order(&resolved("二", &table), &config);
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].index, 1);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn missing_strokes_leave_targets_unmatched() {
        let config = OrderConfig::default();
        let table = [('二', vec![horizontal(300.0), horizontal(700.0)])];
        let tree = resolved("二", &table);
        let result = order_strokes(&[horizontal(700.0)], &tree, &config).unwrap();
        assert_eq!(result.order, vec![0]);
        assert_eq!(result.labels[0].as_ref().unwrap().index, 1);
        assert_abs_diff_eq!(result.total_cost, config.missing_penalty);
    }
}
