//! Contour winding direction correction.
//!
//! Exterior contours wind CCW and holes wind CW. The stroke walk relies on
//! this: with ink always on the left, concave corners are the ones with a
//! negative signed turn.

use kurbo::{Point, Vec2};

use super::Contour;

/// Parameter step used to measure the tangent at a segment's midpoint.
const TANGENT_STEP: f64 = 1e-3;
/// Nudge distance as a fraction of the segment's length.
const NUDGE_FRACTION: f64 = 1e-3;

/// Reverse every contour whose winding disagrees with its nesting depth.
///
/// Depth is the number of other contours containing a point just inside
/// the contour. Even depth = exterior (CCW), odd depth = hole (CW).
pub(super) fn fix_directions(contours: &[Contour]) -> Vec<Contour> {
    contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            let Some(test_point) = interior_sample(contour) else {
                return contour.clone();
            };
            let depth = contours
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && other.contains(test_point))
                .count();

            let should_be_ccw = depth % 2 == 0;
            if should_be_ccw != contour.is_ccw() {
                contour.reversed()
            } else {
                contour.clone()
            }
        })
        .collect()
}

/// Midpoint of the first segment, nudged a little toward the contour's
/// inside.
///
/// Vertices can sit on another contour's boundary where outlines touch,
/// which makes containment of the vertex itself ambiguous.
fn interior_sample(contour: &Contour) -> Option<Point> {
    let segment = contour.segments().first()?;
    let mid = segment.eval(0.5);
    let tangent = segment.eval(0.5 + TANGENT_STEP) - segment.eval(0.5 - TANGENT_STEP);
    let length = tangent.hypot();
    if length == 0.0 {
        return Some(mid);
    }
    // The enclosed region lies to the left of travel on a CCW contour.
    let side = if contour.is_ccw() { 1.0 } else { -1.0 };
    let normal = Vec2::new(-tangent.y, tangent.x) / length;
    let nudge = NUDGE_FRACTION * segment.arclen();
    Some(mid + normal * (side * nudge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Outline;

    #[test]
    fn two_disjoint_exteriors_both_ccw() {
        let outline = Outline::parse(
            "M 0 0 L 0 10 L 10 10 L 10 0 L 0 0 M 20 0 L 30 0 L 30 10 L 20 10 L 20 0 Z",
        )
        .unwrap();
        assert!(!outline.contours()[0].is_ccw());
        let fixed = fix_directions(outline.contours());
        assert!(fixed.iter().all(Contour::is_ccw));
        assert_eq!(fixed[1], outline.contours()[1]);
    }

    #[test]
    fn hole_touching_the_exterior_is_still_a_hole() {
        // The hole's first vertex lies on the exterior's left edge.
        let outline = Outline::parse(concat!(
            "M 0 0 L 100 0 L 100 100 L 0 100 L 0 0 ",
            "M 0 50 L 30 30 L 30 70 L 0 50 Z"
        ))
        .unwrap();
        assert!(outline.contours()[1].is_ccw());
        let fixed = fix_directions(outline.contours());
        assert!(fixed[0].is_ccw());
        assert!(!fixed[1].is_ccw());
    }

    #[test]
    fn interior_sample_is_inside_either_winding() {
        let outline = Outline::parse("M 0 0 L 100 0 L 100 100 L 0 100 L 0 0 Z").unwrap();
        let square = &outline.contours()[0];
        for contour in [square.clone(), square.reversed()] {
            let p = interior_sample(&contour).unwrap();
            assert!(contour.contains(p), "{p:?} is outside");
        }
    }

    #[test]
    fn nested_island_inside_hole_is_exterior() {
        let outline = Outline::parse(concat!(
            "M 0 0 L 100 0 L 100 100 L 0 100 L 0 0 ",
            "M 20 20 L 80 20 L 80 80 L 20 80 L 20 20 ",
            "M 40 40 L 60 40 L 60 60 L 40 60 L 40 40 Z"
        ))
        .unwrap();
        let fixed = fix_directions(outline.contours());
        assert!(fixed[0].is_ccw());
        assert!(!fixed[1].is_ccw());
        assert!(fixed[2].is_ccw());
    }
}
