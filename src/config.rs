use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters for turning an outline into strokes and medians.
/// Serializable so presets can be saved next to curated glyph data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    // -- Endpoint classification --
    /// Signed turn (radians) below which an endpoint is a corner.
    /// Corners are the concave bends that bridges attach to.
    pub corner_angle: f64,
    /// Control points closer than this to the shared endpoint are ignored
    /// when measuring tangents, since near-degenerate curve tangents are noisy.
    pub min_tangent_distance: f64,

    // -- Bridge proposal --
    /// Distance that normalizes the bridge length feature.
    pub max_bridge_distance: f64,
    /// Score subtracted when a corner pair is scored in the reverse direction.
    pub reversal_penalty: f64,
    /// Tolerance for matching bridge endpoints to outline endpoints.
    /// Zero means exact coordinate equality.
    pub bridge_tolerance: f64,

    // -- Median extraction --
    /// Samples per segment for the first Voronoi attempt.
    pub coarse_resolution: usize,
    /// Samples per segment for the single retry.
    pub fine_resolution: usize,
    /// Half-extent of the square that bounds the Voronoi diagram.
    /// Voronoi vertices outside it are discarded.
    pub voronoi_bound: f64,
    /// RDP tolerance for simplifying the skeleton spine.
    pub simplify_tolerance: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            corner_angle: 0.1 * PI,
            min_tangent_distance: 4.0,
            max_bridge_distance: 64.0,
            reversal_penalty: 0.5,
            bridge_tolerance: 0.0,
            coarse_resolution: 16,
            fine_resolution: 64,
            voronoi_bound: 1024.0,
            simplify_tolerance: 4.0,
        }
    }
}

/// Parameters for whole-character matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Points each median is resampled to.
    pub points: usize,
    /// Maximum aspect ratio of the normalized bounding box. 0 = unclamped.
    pub max_ratio: f64,
    /// Minimum width (and height) of the bounding box, in input units.
    pub min_width: f64,
    /// Side of the square the bounding box is mapped onto.
    pub side_length: f64,
    /// Score each stroke in its better orientation instead of as drawn.
    pub allow_reversal: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            points: 4,
            max_ratio: 1.0,
            min_width: 8.0,
            side_length: 256.0,
            allow_reversal: false,
        }
    }
}

/// Parameters for ordering extracted strokes against a decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Points each median is resampled to before comparison.
    pub points: usize,
    /// Cost of leaving a stroke or a target unmatched.
    pub missing_penalty: f64,
    /// Weight of the top-left bias that sorts unmatched strokes.
    pub top_left_weight: f64,
    /// Side of the square canvas component medians are drawn on.
    pub canvas_size: f64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            points: 8,
            missing_penalty: 1.0e8,
            top_left_weight: 1.0e-3,
            canvas_size: 1024.0,
        }
    }
}

/// Parameters for matching one handwritten stroke against a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeMatcherConfig {
    /// Largest angle (radians) between paired segments. Doubled for
    /// every segment but the first.
    pub angle_threshold: f64,
    /// Largest midpoint distance between paired segments, in unit-square coordinates.
    pub distance_threshold: f64,
    /// Largest absolute log ratio of paired segment lengths.
    pub length_threshold: f64,
    /// Source corners that may be skipped between two matched corners.
    pub max_missed_segments: usize,
    /// Added to every segment length so that tiny segments still compare.
    pub min_distance: f64,
    pub missed_segment_penalty: f64,
    pub out_of_order_penalty: f64,
    pub reverse_penalty: f64,
    /// Side of the canvas medians and strokes are given on.
    pub canvas_size: f64,
}

impl Default for StrokeMatcherConfig {
    fn default() -> Self {
        Self {
            angle_threshold: PI / 5.0,
            distance_threshold: 0.2,
            length_threshold: 1.0,
            max_missed_segments: 1,
            min_distance: 1.0 / 16.0,
            missed_segment_penalty: 1.0,
            out_of_order_penalty: 2.0,
            reverse_penalty: 2.0,
            canvas_size: 1024.0,
        }
    }
}
