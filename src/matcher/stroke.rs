//! Single-stroke matching for handwriting practice.
//!
//! Both the drawn stroke and the reference medians are reduced to their
//! corners in the unit square. An alignment then pairs consecutive
//! corners of the drawn stroke with consecutive corners of a median,
//! allowing a few drawn corners to be skipped and a trailing hook on the
//! median to go undrawn.

use kurbo::{Point, Vec2};
use serde::Serialize;
use std::fmt;

use crate::config::StrokeMatcherConfig;
use crate::corners::find_corners;
use crate::error::MatchError;
use crate::geom::{angle_diff, direction, path_length, resample};
use crate::median::Median;

/// Canvas units trimmed from both ends of a reference median, since
/// skeleton ends tend to curl into the stroke's end caps.
const MEDIAN_TRUNCATION: f64 = 16.0;
const TRUNCATION_SAMPLES: usize = 64;
/// Unit-square lengths below which a first or last median segment is a
/// dangling artifact.
const MIN_FIRST_SEGMENT: f64 = 0.1;
const MIN_LAST_SEGMENT: f64 = 0.05;

/// Turn directions of median tails that count as hooks.
const HOOK_SHAPES: [&[Vec2]; 2] = [
    &[Vec2::new(1.0, 3.0), Vec2::new(-3.0, -1.0)],
    &[Vec2::new(3.0, 3.0), Vec2::new(0.0, -1.0)],
];

/// Vertical-bend-hook medians whose extra corner should be merged away.
const SHU_WAN_GOU_SHAPES: [&[Vec2]; 2] = [
    &[
        Vec2::new(4.0, 0.0),
        Vec2::new(0.0, 4.0),
        Vec2::new(4.0, 0.0),
        Vec2::new(0.0, -1.0),
    ],
    &[Vec2::new(0.0, 4.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, -1.0)],
];

/// Why an accepted match is imperfect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeWarning {
    /// The stroke stopped before the median's hook.
    ShouldHook,
    /// The stroke was drawn from its end to its start.
    Backward,
}

impl fmt::Display for StrokeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrokeWarning::ShouldHook => "should hook",
            StrokeWarning::Backward => "stroke drawn backward",
        })
    }
}

/// Outcome of matching one drawn stroke.
///
/// `index` is `None` when no median survived the rejection tests; the
/// other fields then hold their empty values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeMatch {
    pub index: Option<usize>,
    pub score: f64,
    /// Corners of the matched median, in unit-square coordinates.
    pub simplified_median: Vec<Point>,
    /// First and last corner of the drawn stroke.
    pub source_segment: Option<(Point, Point)>,
    /// The part of the median the drawn stroke covered.
    pub target_segment: Option<(Point, Point)>,
    pub warning: Option<StrokeWarning>,
    /// Suggested score penalty for the match's defects.
    pub penalties: u32,
}

impl StrokeMatch {
    fn none() -> Self {
        Self {
            index: None,
            score: f64::NEG_INFINITY,
            simplified_median: vec![],
            source_segment: None,
            target_segment: None,
            warning: None,
            penalties: 0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.index.is_some()
    }
}

struct Alignment {
    score: f64,
    source: (Point, Point),
    target: (Point, Point),
    should_hook: bool,
    backward: bool,
}

/// Matches drawn strokes against the strokes of one character.
#[derive(Debug, Clone)]
pub struct StrokeMatcher {
    config: StrokeMatcherConfig,
    medians: Vec<Vec<Point>>,
}

impl StrokeMatcher {
    /// Prepare the character's medians, given on the canvas.
    pub fn new(medians: &[Median], config: StrokeMatcherConfig) -> Self {
        let medians = medians
            .iter()
            .map(|median| simplify_median(median, &config))
            .collect();
        Self { config, medians }
    }

    /// Corners of each reference median, in unit-square coordinates.
    pub fn medians(&self) -> &[Vec<Point>] {
        &self.medians
    }

    /// Match a stroke drawn on the canvas.
    ///
    /// `missing` lists the strokes not yet drawn, in ascending order.
    /// Matching any stroke other than the first missing one costs an
    /// out-of-order penalty per index of distance.
    pub fn match_stroke(&self, stroke: &[Point], missing: &[usize]) -> Result<StrokeMatch, MatchError> {
        let Some(&next) = missing.first() else {
            return Err(MatchError::NothingMissing);
        };
        if let Some(&index) = missing.iter().find(|&&i| i >= self.medians.len()) {
            return Err(MatchError::MissingOutOfRange {
                index,
                count: self.medians.len(),
            });
        }

        let scale = 1.0 / self.config.canvas_size;
        let scaled: Vec<Point> = stroke.iter().map(|p| (p.to_vec2() * scale).to_point()).collect();
        let source = find_corners(&scaled);

        let mut best = StrokeMatch::none();
        for (i, median) in self.medians.iter().enumerate() {
            let offset = i.abs_diff(next) as f64;
            let Some(result) = self.recognize(&source, median) else {
                continue;
            };
            let score = result.score - offset * self.config.out_of_order_penalty;
            if score > best.score {
                best = StrokeMatch {
                    index: Some(i),
                    score,
                    simplified_median: median.clone(),
                    source_segment: Some(result.source),
                    target_segment: Some(result.target),
                    warning: result.warning(),
                    penalties: u32::from(result.backward),
                };
            }
        }
        tracing::debug!(index = ?best.index, score = best.score, "matched stroke");
        Ok(best)
    }

    /// Align forward, falling back to the reversed stroke when the
    /// forward alignment fails outright.
    fn recognize(&self, source: &[Point], target: &[Point]) -> Option<Alignment> {
        if let Some(forward) = self.align(source, target) {
            return Some(forward);
        }
        let reversed: Vec<Point> = source.iter().rev().copied().collect();
        let mut alternative = self.align(&reversed, target)?;
        if alternative.should_hook {
            return None;
        }
        alternative.backward = true;
        alternative.score -= self.config.reverse_penalty;
        Some(alternative)
    }

    /// Best monotone pairing of source corners with a prefix of the
    /// target's segments.
    fn align(&self, source: &[Point], target: &[Point]) -> Option<Alignment> {
        let (m, n) = (source.len(), target.len());
        if m < 2 || n < 2 {
            return None;
        }
        let missed = self.config.missed_segment_penalty;

        // memo[i][j]: best score with target[..=i] aligned to source[..=j].
        let mut memo = vec![vec![f64::NEG_INFINITY; m]; n];
        memo[0][0] = 0.0;
        for i in 1..n {
            for j in 1..m {
                let start = j.saturating_sub(self.config.max_missed_segments + 1);
                let mut best = f64::NEG_INFINITY;
                for k in start..j {
                    let prev = memo[i - 1][k];
                    if prev == f64::NEG_INFINITY {
                        continue;
                    }
                    let score = self.score_pairing(
                        (source[k], source[j]),
                        (target[i - 1], target[i]),
                        i == 1,
                    );
                    let penalty = (j - k - 1) as f64 * missed;
                    best = best.max(score + prev - penalty);
                }
                memo[i][j] = best;
            }
        }

        let min_matched = n - usize::from(has_hook(target, self.config.angle_threshold));
        let mut result: Option<Alignment> = None;
        for i in min_matched - 1..n {
            let score = memo[i][m - 1] - (n - i - 1) as f64 * missed;
            if score > result.as_ref().map_or(f64::NEG_INFINITY, |r| r.score) {
                result = Some(Alignment {
                    score,
                    source: (source[0], source[m - 1]),
                    target: (target[0], target[i]),
                    should_hook: i < n - 1,
                    backward: false,
                });
            }
        }
        result
    }

    fn score_pairing(&self, source: (Point, Point), target: (Point, Point), initial: bool) -> f64 {
        let c = &self.config;
        let angle = angle_diff(direction(source.0, source.1), direction(target.0, target.1));
        let distance = midpoint(source).distance(midpoint(target));
        let length = ((source.0.distance(source.1) + c.min_distance)
            / (target.0.distance(target.1) + c.min_distance))
            .ln()
            .abs();
        let max_angle = if initial { 1.0 } else { 2.0 } * c.angle_threshold;
        if angle > max_angle || distance > c.distance_threshold || length > c.length_threshold {
            return f64::NEG_INFINITY;
        }
        -(angle + distance + length)
    }
}

impl Alignment {
    fn warning(&self) -> Option<StrokeWarning> {
        if self.backward {
            Some(StrokeWarning::Backward)
        } else if self.should_hook {
            Some(StrokeWarning::ShouldHook)
        } else {
            None
        }
    }
}

fn midpoint(segment: (Point, Point)) -> Point {
    segment.0.midpoint(segment.1)
}

/// Whether the median ends in a hook a drawn stroke may leave off.
fn has_hook(median: &[Point], threshold: f64) -> bool {
    match median.len() {
        0..=2 => false,
        3 => HOOK_SHAPES.iter().any(|shape| matches_shape(median, shape, threshold)),
        _ => true,
    }
}

/// Whether each segment of the median points along the matching shape
/// direction, within `threshold`.
fn matches_shape(median: &[Point], shape: &[Vec2], threshold: f64) -> bool {
    median.len() == shape.len() + 1
        && median
            .windows(2)
            .zip(shape)
            .all(|(w, s)| angle_diff(direction(w[0], w[1]), s.atan2()) < threshold)
}

/// Trim the ends, move to the unit square, reduce to corners, and drop
/// corners that are artifacts of the skeleton.
fn simplify_median(median: &[Point], config: &StrokeMatcherConfig) -> Vec<Point> {
    let scale = 1.0 / config.canvas_size;
    let truncated: Vec<Point> = truncate(median, MEDIAN_TRUNCATION)
        .into_iter()
        .map(|p| (p.to_vec2() * scale).to_point())
        .collect();
    let corners = find_corners(&truncated);
    let corners = drop_dangling_hooks(corners);
    fix_shu_wan_gou(corners, config.angle_threshold)
}

fn truncate(median: &[Point], truncation: f64) -> Vec<Point> {
    if median.len() < 2 {
        return median.to_vec();
    }
    let n = TRUNCATION_SAMPLES;
    let length = path_length(median);
    let fraction = if length > 0.0 { (truncation / length).min(0.25) } else { 0.25 };
    let skip = (n as f64 * fraction).round() as usize;
    let samples = resample(median, n);
    samples[skip..n - skip].to_vec()
}

fn drop_dangling_hooks(median: Vec<Point>) -> Vec<Point> {
    let n = median.len();
    if n < 3 {
        return median;
    }
    let drop_first = median[0].distance(median[1]) < MIN_FIRST_SEGMENT;
    let drop_last = median[n - 2].distance(median[n - 1]) < MIN_LAST_SEGMENT;
    median
        .into_iter()
        .enumerate()
        .filter(|&(i, _)| !(drop_first && i == 1) && !(drop_last && i == n - 2))
        .map(|(_, p)| p)
        .collect()
}

fn fix_shu_wan_gou(median: Vec<Point>, threshold: f64) -> Vec<Point> {
    if median.len() == 2 {
        return median;
    }
    let drop: Vec<usize> = SHU_WAN_GOU_SHAPES
        .iter()
        .filter(|shape| matches_shape(&median, shape, threshold))
        .map(|shape| shape.len() - 2)
        .collect();
    median
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains(i))
        .map(|(_, p)| p)
        .collect()
}
