//! Shared geometry utilities.

use geo::{LineString, Simplify};
use kurbo::{Point, Rect};
use std::f64::consts::PI;

/// Signed area of a closed polygon via the shoelace formula.
///
/// Positive = counter-clockwise, negative = clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Difference of two angles, wrapped into [-pi, pi).
pub fn angle_subtract(a: f64, b: f64) -> f64 {
    let mut result = a - b;
    if result < -PI {
        result += 2.0 * PI;
    }
    if result >= PI {
        result -= 2.0 * PI;
    }
    result
}

/// Unsigned angle between two directions, in [0, pi].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % (2.0 * PI);
    diff.min(2.0 * PI - diff)
}

/// Direction of the chord from `from` to `to`.
pub fn direction(from: Point, to: Point) -> f64 {
    (to - from).atan2()
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Tight bounding box of a point set, or `None` when it is empty.
pub fn bounds<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    let rect = iter.fold(Rect::from_points(first, first), |rect, &p| {
        rect.union_pt(p)
    });
    Some(rect)
}

/// Total length of an open polyline.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Resample an open polyline to `n` points evenly spaced by arc length.
///
/// The first and last input points are always kept exactly.
pub fn resample(points: &[Point], n: usize) -> Vec<Point> {
    if points.is_empty() || n == 0 {
        return vec![];
    }
    if n == 1 {
        return vec![points[0]];
    }
    let total = path_length(points);
    let last = points[points.len() - 1];
    let mut result = Vec::with_capacity(n);
    let mut index = 0;
    let mut position = points[0];
    let mut so_far = 0.0;
    for i in 0..n - 1 {
        let target = i as f64 * total / (n - 1) as f64;
        while so_far < target && index + 1 < points.len() {
            let next = points[index + 1];
            let step = position.distance(next);
            if so_far + step < target {
                index += 1;
                position = next;
                so_far += step;
            } else {
                let t = (target - so_far) / step;
                position = position.lerp(next, t);
                so_far = target;
            }
        }
        result.push(position);
    }
    result.push(last);
    result
}

/// Proper intersection of two segments, excluding their endpoints.
pub fn segment_intersection(a: (Point, Point), b: (Point, Point)) -> Option<Point> {
    let d1 = a.1 - a.0;
    let d2 = b.1 - b.0;
    let cross = d1.cross(d2);
    if cross == 0.0 {
        return None;
    }
    let v = a.0 - b.0;
    let s = d1.cross(v) / cross;
    let t = d2.cross(v) / cross;
    if 0.0 < s && s < 1.0 && 0.0 < t && t < 1.0 {
        Some(a.0 + t * d1)
    } else {
        None
    }
}

/// RDP polyline simplification.
pub fn rdp_simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    LineString::from(coords)
        .simplify(&epsilon)
        .into_inner()
        .into_iter()
        .map(|c| Point::new(c.x, c.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_square_area_sign() {
        let ccw = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_abs_diff_eq!(signed_area(&ccw), 1.0);
        let cw: Vec<Point> = ccw.iter().rev().copied().collect();
        assert_abs_diff_eq!(signed_area(&cw), -1.0);
    }

    #[test]
    fn angle_subtract_wraps() {
        assert_abs_diff_eq!(angle_subtract(PI - 0.1, -PI + 0.1), -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_subtract(-PI + 0.1, PI - 0.1), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_diff(0.1, 2.0 * PI - 0.1), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn resample_keeps_endpoints_and_spacing() {
        let line = [Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 30.0)];
        let out = resample(&line, 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], line[0]);
        assert_eq!(out[4], line[2]);
        assert_abs_diff_eq!(out[1].x, 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[2].x, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[3].y, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = (Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = (Point::new(0.0, 10.0), Point::new(10.0, 0.0));
        let p = segment_intersection(a, b).unwrap();
        assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-9);
        let touching = (Point::new(10.0, 10.0), Point::new(20.0, 0.0));
        assert!(segment_intersection(a, touching).is_none());
    }

    #[test]
    fn point_in_triangle() {
        let tri = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)];
        assert!(point_in_polygon(Point::new(2.0, 2.0), &tri));
        assert!(!point_in_polygon(Point::new(8.0, 8.0), &tri));
    }
}
