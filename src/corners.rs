//! ShortStraw corner finding for polylines.
//!
//! The polyline is resampled at a fixed fraction of its bounding box
//! diagonal. At each sample the "straw" is the chord between the samples
//! `STRAW_WINDOW` steps behind and ahead; straws shorten where the line
//! bends, so runs of short straws mark corners.

use kurbo::Point;
use std::f64::consts::PI;

use crate::geom::{bounds, direction};

/// Resample spacing is the bounding box diagonal over this.
const DIAGONAL_INTERVAL: f64 = 100.0;
const STRAW_WINDOW: usize = 3;
/// Straws below this fraction of the median straw are corner candidates.
const MEDIAN_THRESHOLD: f64 = 0.95;
/// Straightness thresholds of the successive refinement passes.
const LINE_THRESHOLDS: [f64; 3] = [0.95, 0.90, 0.80];

/// Corner points of a polyline, in input order.
///
/// The first and last points are always corners. A closed input yields
/// its start once rather than at both ends.
pub fn find_corners(points: &[Point]) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let Some(bbox) = bounds(points) else {
        return vec![];
    };
    let spacing = bbox.size().to_vec2().hypot() / DIAGONAL_INTERVAL;
    if spacing <= 0.0 {
        return vec![points[0]];
    }

    let resampled = resample_spaced(points, spacing);
    let mut corners: Vec<Point> = corner_indices(&resampled)
        .into_iter()
        .map(|i| resampled[i])
        .collect();
    if corners.len() > 2 && corners.first() == corners.last() {
        corners.pop();
    }
    corners
}

fn resample_spaced(points: &[Point], spacing: f64) -> Vec<Point> {
    let mut result = vec![points[0]];
    let mut distance = 0.0;
    let mut prev = points[0];
    let mut i = 1;
    while i < points.len() {
        let next = points[i];
        let d = prev.distance(next);
        if d > 0.0 && distance + d >= spacing {
            let q = prev.lerp(next, (spacing - distance) / d);
            result.push(q);
            prev = q;
            distance = 0.0;
        } else {
            distance += d;
            prev = next;
            i += 1;
        }
    }
    result.push(points[points.len() - 1]);
    result
}

fn corner_indices(points: &[Point]) -> Vec<usize> {
    let n = points.len();
    let w = STRAW_WINDOW;
    let mut straws = vec![f64::INFINITY; n];
    for i in w..n.saturating_sub(w) {
        straws[i] = points[i - w].distance(points[i + w]);
    }

    let mut corners = vec![0];
    if n > 2 * w {
        let threshold = median(&straws[w..n - w]) * MEDIAN_THRESHOLD;
        let mut i = w;
        while i < n - w {
            if straws[i] < threshold {
                let mut best = i;
                while i < n - w && straws[i] < threshold {
                    if straws[i] < straws[best] {
                        best = i;
                    }
                    i += 1;
                }
                corners.push(best);
            }
            i += 1;
        }
    }
    corners.push(n - 1);

    for threshold in LINE_THRESHOLDS {
        refine(points, &mut corners, &straws, threshold);
    }
    add_acute_angles(points, &corners)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Split corner pairs that are not straight enough, then drop corners
/// whose neighbors are straight without them.
fn refine(points: &[Point], corners: &mut Vec<usize>, straws: &[f64], threshold: f64) {
    loop {
        let mut changed = false;
        let mut i = 1;
        while i < corners.len() {
            let (a, b) = (corners[i - 1], corners[i]);
            if !is_line(points, a, b, threshold) {
                if let Some(c) = halfway_corner(straws, a, b) {
                    if a < c && c < b {
                        corners.insert(i, c);
                        changed = true;
                    }
                }
            }
            i += 1;
        }
        if !changed {
            break;
        }
    }

    let mut i = 1;
    while i + 1 < corners.len() {
        if is_line(points, corners[i - 1], corners[i + 1], threshold) {
            corners.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Shortest straw between the quartiles of `a..b`.
fn halfway_corner(straws: &[f64], a: usize, b: usize) -> Option<usize> {
    let quarter = (b - a) as f64 / 4.0;
    let lo = (a as f64 + quarter).ceil() as usize;
    let hi = b as f64 - quarter;
    let mut best: Option<usize> = None;
    let mut i = lo;
    while (i as f64) < hi {
        if straws[i] < best.map_or(f64::INFINITY, |j| straws[j]) {
            best = Some(i);
        }
        i += 1;
    }
    best
}

fn is_line(points: &[Point], a: usize, b: usize, threshold: f64) -> bool {
    let chord = points[a].distance(points[b]);
    let path: f64 = points[a..=b].windows(2).map(|w| w[0].distance(w[1])).sum();
    path == 0.0 || chord / path > threshold
}

/// Between each pair of corners, add the sharpest interior point if it
/// turns by more than a right angle. Catches small hooks.
fn add_acute_angles(points: &[Point], corners: &[usize]) -> Vec<usize> {
    let mut result = vec![corners[0]];
    for pair in corners.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let cutoff = ((0.1 * (b - a) as f64).round() as usize).max(1);
        let mut best = None;
        let mut best_angle = PI / 2.0;
        let mut j = a + cutoff;
        while j + cutoff <= b {
            let angle = turn_angle(points, a, j, b);
            if angle > best_angle {
                best_angle = angle;
                best = Some(j);
            }
            j += 1;
        }
        result.extend(best.map(|j| snap_to_vertex(points, a, j, b, cutoff)));
        result.push(b);
    }
    result
}

/// Move an acute corner found at `j` onto the sharpest local bend within
/// `radius` samples, staying strictly between `a` and `b`.
///
/// The search above measures turns against the far corners, and the
/// cutoff keeps it from reaching a bend close to either end.
fn snap_to_vertex(points: &[Point], a: usize, j: usize, b: usize, radius: usize) -> usize {
    let lo = (a + 1).max(j.saturating_sub(radius));
    let hi = (b - 1).min(j + radius);
    let local = |k: usize| {
        let before = k.saturating_sub(STRAW_WINDOW).max(a);
        let after = (k + STRAW_WINDOW).min(b);
        turn_angle(points, before, k, after)
    };
    let mut best = j;
    let mut best_angle = local(j);
    for k in lo..=hi {
        let angle = local(k);
        if angle > best_angle {
            best_angle = angle;
            best = k;
        }
    }
    best
}

/// Unsigned turn at `j` on the path `i -> j -> k`, in [0, pi].
fn turn_angle(points: &[Point], i: usize, j: usize, k: usize) -> f64 {
    let a1 = direction(points[i], points[j]);
    let a2 = direction(points[j], points[k]);
    let a = (a2 - a1).abs();
    if a >= PI {
        2.0 * PI - a
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(a: Point, b: Point, tolerance: f64) -> bool {
        a.distance(b) <= tolerance
    }

    #[test]
    fn straight_line_has_only_endpoints() {
        let line = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        assert_eq!(find_corners(&line), line.to_vec());
    }

    #[test]
    fn l_shape_has_one_bend() {
        let l = [Point::new(0.0, 0.0), Point::new(0.0, 100.0), Point::new(60.0, 100.0)];
        let corners = find_corners(&l);
        assert_eq!(corners.len(), 3);
        assert!(near(corners[1], l[1], 1.5), "bend at {:?}", corners[1]);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(find_corners(&[]).is_empty());
        let p = Point::new(3.0, 4.0);
        assert_eq!(find_corners(&[p]), vec![p]);
        assert_eq!(find_corners(&[p, p, p]), vec![p]);
    }

    #[test]
    fn small_hook_is_kept() {
        // A long stroke with a sharp flick back at the end.
        let hook = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 200.0),
            Point::new(-12.0, 188.0),
        ];
        let corners = find_corners(&hook);
        assert_eq!(corners.len(), 3);
        // Within one resample step of the vertex.
        let step = 12.0f64.hypot(200.0) / DIAGONAL_INTERVAL;
        assert!(near(corners[1], hook[1], step), "hook at {:?}", corners[1]);
    }

    #[test]
    fn hook_corner_snaps_to_the_sharpest_sample() {
        // The search cutoff stops short of the bend; snapping moves it on.
        let points: Vec<Point> = (0..=20)
            .map(|i| Point::new(0.0, f64::from(i) * 10.0))
            .chain((1..=4).map(|i| Point::new(-f64::from(i) * 3.0, 200.0 - f64::from(i) * 3.0)))
            .collect();
        assert_eq!(snap_to_vertex(&points, 0, 17, 24, 3), 20);
    }
}
