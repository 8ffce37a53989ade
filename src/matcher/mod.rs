//! Matching handwritten strokes against reference medians.
//!
//! Two modes share the preprocessing in this module:
//!
//! - [`CharacterMatcher`] ranks whole characters of a [`Corpus`] against
//!   a complete set of query strokes.
//! - [`StrokeMatcher`] finds which stroke of one known character a single
//!   freshly drawn stroke is meant to be.

mod character;
mod corpus;
mod stroke;

pub use character::{Candidate, CharacterMatcher};
pub use corpus::{
    decode_corpus, encode_corpus, quantize_median, Corpus, CorpusEntry, SharedCorpus,
};
pub use stroke::{StrokeMatch, StrokeMatcher, StrokeWarning};

use kurbo::{Point, Rect};
use serde::Serialize;
use std::f64::consts::PI;

use crate::config::MatchParams;
use crate::error::MatchError;
use crate::geom::{bounds, resample};
use crate::median::Median;

/// Resample a median to `n` points evenly spaced by arc length.
///
/// For two or more points the final point is the median's exact last point.
pub fn resample_median(median: &[Point], n: usize) -> Median {
    resample(median, n)
}

/// Comparable features of one stroke, in the normalized square.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeFeatures {
    /// Resampled points, rounded to integer coordinates.
    pub points: Vec<Point>,
    /// Direction from first to last point, bucketed into `side_length` steps.
    pub direction: f64,
    /// Length of the first-to-last chord over sqrt(2).
    pub length: f64,
}

impl StrokeFeatures {
    /// The same stroke traced from its other end.
    pub fn reversed(&self, side_length: f64) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            direction: (self.direction + (side_length / 2.0).round()) % side_length,
            length: self.length,
        }
    }
}

/// Fit a set of medians into the `side_length` square and extract their
/// features.
pub fn normalize(medians: &[Median], params: &MatchParams) -> Result<Vec<StrokeFeatures>, MatchError> {
    if medians.is_empty() {
        return Err(MatchError::NoMedians);
    }
    if let Some(i) = medians.iter().position(|m| m.is_empty()) {
        return Err(MatchError::EmptyMedian(i));
    }
    let Some(raw) = bounds(medians.iter().flatten()) else {
        return Err(MatchError::NoMedians);
    };
    let source = normalize_bounds(raw, params.max_ratio, params.min_width);
    let side = params.side_length;
    let scale = |extent: f64| if extent > 0.0 { (side - 1.0) / extent } else { 0.0 };
    let (sx, sy) = (scale(source.width()), scale(source.height()));
    let transform = |p: &Point| {
        Point::new(
            (sx * (p.x - source.x0)).round(),
            (sy * (p.y - source.y0)).round(),
        )
    };

    Ok(medians
        .iter()
        .map(|median| {
            let mapped: Vec<Point> = median.iter().map(transform).collect();
            let points: Vec<Point> = resample(&mapped, params.points.max(2))
                .into_iter()
                .map(|p| p.round())
                .collect();
            let diff = points[points.len() - 1] - points[0];
            let direction = ((diff.atan2() + PI) * side / (2.0 * PI)).round() % side;
            let length = (diff.hypot2() / 2.0).sqrt().round();
            StrokeFeatures {
                points,
                direction,
                length,
            }
        })
        .collect())
}

/// Round the box, pad each side to at least `min_width`, then widen the
/// shorter side until the aspect ratio is at most `max_ratio`.
/// A `max_ratio` of zero leaves the ratio unclamped.
pub fn normalize_bounds(bounds: Rect, max_ratio: f64, min_width: f64) -> Rect {
    let mut b = Rect::new(
        bounds.x0.round(),
        bounds.y0.round(),
        bounds.x1.round(),
        bounds.y1.round(),
    );
    if b.width() < min_width {
        let extra = ((min_width - b.width()) / 2.0).ceil();
        b.x0 -= extra;
        b.x1 += extra;
    }
    if b.height() < min_width {
        let extra = ((min_width - b.height()) / 2.0).ceil();
        b.y0 -= extra;
        b.y1 += extra;
    }
    if max_ratio > 0.0 {
        let (w, h) = (b.width(), b.height());
        if w < h / max_ratio {
            let extra = ((h / max_ratio - w) / 2.0).ceil();
            b.x0 -= extra;
            b.x1 += extra;
        } else if h < w / max_ratio {
            let extra = ((w / max_ratio - h) / 2.0).ceil();
            b.y0 -= extra;
            b.y1 += extra;
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn resampled_medians_are_evenly_spaced() {
        let bend = [Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 40.0)];
        let points = resample_median(&bend, 8);
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], bend[0]);
        assert_eq!(points[7], bend[2]);
        for pair in points.windows(2) {
            assert_abs_diff_eq!(pair[0].distance(pair[1]), 10.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(points[4].x, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(points[4].y, 10.0, epsilon = 1e-9);

        // The end is copied, not interpolated.
        let uneven = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.3)];
        assert_eq!(resample_median(&uneven, 3).last(), Some(&uneven[2]));
    }

    #[test]
    fn bounds_are_padded_then_squared() {
        let raw = Rect::new(10.2, 50.0, 110.0, 52.0);
        let b = normalize_bounds(raw, 1.0, 8.0);
        assert_eq!(b, Rect::new(10.0, 1.0, 110.0, 101.0));

        let unclamped = normalize_bounds(raw, 0.0, 8.0);
        assert_eq!(unclamped, Rect::new(10.0, 47.0, 110.0, 55.0));
    }

    #[test]
    fn horizontal_stroke_features() {
        let medians = vec![vec![Point::new(0.0, 500.0), Point::new(1000.0, 500.0)]];
        let features = normalize(&medians, &MatchParams::default()).unwrap();
        let f = &features[0];
        assert_eq!(f.points.len(), 4);
        assert_eq!(f.points[0].x, 0.0);
        assert_eq!(f.points[3].x, 255.0);
        assert_eq!(f.points[1].x, 85.0);
        assert!(f.points.iter().all(|p| p.y == f.points[0].y));
        // Pointing right is half a turn from the -pi origin of the buckets.
        assert_eq!(f.direction, 128.0);
        assert_relative_eq!(f.length, (255.0f64 * 255.0 / 2.0).sqrt().round());
    }

    #[test]
    fn reversal_flips_direction_bucket() {
        let medians = vec![vec![Point::new(1000.0, 500.0), Point::new(0.0, 500.0)]];
        let params = MatchParams::default();
        let backward = normalize(&medians, &params).unwrap().remove(0);
        assert_eq!(backward.direction, 0.0);
        let flipped = backward.reversed(params.side_length);
        assert_eq!(flipped.direction, 128.0);
        assert_eq!(flipped.points[0].x, 0.0);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let params = MatchParams::default();
        assert_eq!(normalize(&[], &params), Err(MatchError::NoMedians));
        let medians = vec![vec![Point::ZERO, Point::new(1.0, 1.0)], vec![]];
        assert_eq!(normalize(&medians, &params), Err(MatchError::EmptyMedian(1)));
    }
}
