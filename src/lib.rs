//! glyph2strokes: glyph outline → ordered, labeled strokes.
//!
//! Splits a merged ideograph outline into its ink strokes, extracts a
//! centerline ("median") for each, and orders the strokes against a
//! component decomposition. The same medians drive handwriting
//! recognition, for whole characters or for one stroke at a time.
//!
//! # Example
//!
//! ```no_run
//! use glyph2strokes::{analyze_glyph, order_strokes, DecompositionNode};
//! use glyph2strokes::{ExtractionConfig, OrderConfig};
//!
//! let glyph = analyze_glyph("M 0 0 L 100 0 L 100 20 L 0 20 L 0 0 Z", None, &ExtractionConfig::default())?;
//! let tree: DecompositionNode = "⿰亻木".parse()?;
//! let order = order_strokes(&glyph.medians, &tree, &OrderConfig::default())?;
//! # Ok::<(), glyph2strokes::StrokeError>(())
//! ```

#![forbid(unsafe_code)]

pub mod assignment;
pub mod bridges;
pub mod config;
pub mod corners;
pub mod decomposition;
pub mod error;
pub mod geom;
pub mod matcher;
pub mod median;
pub mod path;

// Re-export kurbo so callers use the same Point and BezPath types.
pub use kurbo;

pub use assignment::{order_strokes, solve, Assignment, SquareMatrix, StrokeOrder};
pub use bridges::{propose_bridges, split_on_bridges, Bridge, HandTunedScorer, SegmentGraph, Stroke};
pub use config::{ExtractionConfig, MatchParams, OrderConfig, StrokeMatcherConfig};
pub use corners::find_corners;
pub use decomposition::{DecompositionNode, Operator};
pub use error::StrokeError;
pub use matcher::{CharacterMatcher, Corpus, SharedCorpus, StrokeMatch, StrokeMatcher};
pub use median::{extract_median, Median};
pub use path::Outline;

use rayon::prelude::*;
use serde::Serialize;

use bridges::Endpoint;

/// Everything derived from one glyph outline.
#[derive(Debug, Clone, Serialize)]
pub struct GlyphAnalysis {
    /// The outline with exteriors counter-clockwise and holes clockwise.
    pub outline: Outline,
    pub endpoints: Vec<Endpoint>,
    /// Bridges the strokes were split on.
    pub bridges: Vec<Bridge>,
    /// Whether `bridges` were proposed rather than given.
    pub proposed: bool,
    pub strokes: Vec<Stroke>,
    /// One median per stroke.
    pub medians: Vec<Median>,
}

/// Full pipeline: normal-form path → strokes and medians.
///
/// Uses `manual_bridges` when given, and proposes bridges with the
/// hand-tuned scorer otherwise.
pub fn analyze_glyph(
    d: &str,
    manual_bridges: Option<&[Bridge]>,
    config: &ExtractionConfig,
) -> Result<GlyphAnalysis, StrokeError> {
    let outline = Outline::parse(d)?;
    analyze_outline(&outline, manual_bridges, config)
}

/// [`analyze_glyph`] for an outline that is already parsed.
pub fn analyze_outline(
    outline: &Outline,
    manual_bridges: Option<&[Bridge]>,
    config: &ExtractionConfig,
) -> Result<GlyphAnalysis, StrokeError> {
    let graph = SegmentGraph::new(outline, config);
    let (bridges, proposed) = match manual_bridges {
        Some(bridges) => (bridges.to_vec(), false),
        None => (propose_bridges(&graph, &HandTunedScorer, config)?, true),
    };

    let strokes = split_on_bridges(&graph, &bridges, config.bridge_tolerance)?;
    let medians = strokes
        .par_iter()
        .enumerate()
        .map(|(stroke, s)| {
            extract_median(s, config).map_err(|source| StrokeError::Median { stroke, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        contours = graph.contours().len(),
        corners = graph.corners().count(),
        bridges = bridges.len(),
        proposed,
        strokes = strokes.len(),
        "analyzed glyph"
    );

    Ok(GlyphAnalysis {
        outline: Outline::new(graph.contours().to_vec()),
        endpoints: graph.endpoints().to_vec(),
        bridges,
        proposed,
        strokes,
        medians,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn bar_is_one_stroke_with_a_median() {
        let glyph = analyze_glyph(
            "M 0 0 L 200 0 L 200 20 L 0 20 L 0 0 Z",
            None,
            &ExtractionConfig::default(),
        )
        .unwrap();
        assert!(glyph.proposed);
        assert!(glyph.bridges.is_empty());
        assert_eq!(glyph.strokes.len(), 1);
        assert_eq!(glyph.medians.len(), 1);
        assert!(glyph.medians[0].len() >= 2);
    }

    #[test]
    fn manual_bridges_split_the_outline() {
        let bridges = [Bridge::new(Point::new(50.0, 0.0), Point::new(50.0, 100.0))];
        let glyph = analyze_glyph(
            "M 0 50 L 50 0 L 100 50 L 50 100 L 0 50 Z",
            Some(&bridges),
            &ExtractionConfig::default(),
        )
        .unwrap();
        assert!(!glyph.proposed);
        assert_eq!(glyph.strokes.len(), 2);
        assert_eq!(glyph.medians.len(), 2);
    }

    #[test]
    fn parse_errors_surface() {
        let err = analyze_glyph("L 0 0", None, &ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, StrokeError::Path(_)));
    }
}
