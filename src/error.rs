use thiserror::Error;

/// Errors raised while parsing or normalizing a glyph outline.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path must start with M, found {0:?}")]
    MissingMoveTo(String),

    #[error("path must end with Z")]
    MissingClose,

    #[error("path ended early at token {index}")]
    EndedEarly { index: usize },

    #[error("unsupported command {command:?} at token {index}")]
    UnsupportedCommand { command: String, index: usize },

    #[error("invalid number {token:?} at token {index}")]
    InvalidNumber { token: String, index: usize },

    #[error("missing coordinate after token {index}")]
    MissingCoordinate { index: usize },

    #[error("contour {contour} is open: ends at ({x}, {y})")]
    OpenContour { contour: usize, x: f64, y: f64 },

    #[error("contour {contour} has no segments")]
    EmptyContour { contour: usize },

    #[error("cubic segments are not allowed in a normal-form path (contour {contour})")]
    CubicSegment { contour: usize },
}

/// Errors raised while partitioning an outline into strokes.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SegmentError {
    #[error("bridge endpoints coincide at ({x}, {y})")]
    DegenerateBridge { x: f64, y: f64 },

    #[error("bridge endpoint ({x}, {y}) is not an endpoint of the outline")]
    UnknownBridgeEndpoint { x: f64, y: f64 },

    #[error("segments {segments:?} are not part of any closed stroke")]
    OpenComponent { segments: Vec<(usize, usize)> },
}

/// Errors raised while computing a stroke median.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MedianError {
    #[error("stroke has {0} contours; a median needs exactly one")]
    MultipleLoops(usize),

    #[error("stroke polygon has only {0} distinct points")]
    TooFewPoints(usize),

    #[error("voronoi skeleton is degenerate at every resolution (last tried {resolution} samples per segment)")]
    DegenerateSkeleton { resolution: usize },
}

/// Errors raised by the assignment solver.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("cost matrix row {row} has {len} entries, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },

    #[error("cost matrix entry ({row}, {col}) is not finite")]
    NonFiniteCost { row: usize, col: usize },

    #[error("median of stroke {stroke} has no points")]
    EmptyMedian { stroke: usize },
}

/// Errors raised while parsing or editing a decomposition tree.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DecompositionError {
    #[error("not enough characters in {0:?}")]
    UnexpectedEnd(String),

    #[error("too many characters in {decomposition:?}: {rest:?} left over")]
    TrailingCharacters { decomposition: String, rest: String },

    #[error("malformed variant annotation after {component:?} in {decomposition:?}")]
    MalformedAnnotation { component: char, decomposition: String },

    #[error("{operator:?} is not an ideographic description character")]
    UnknownOperator { operator: char },

    #[error("{operator} takes {expected} operands, found {found}")]
    WrongArity {
        operator: char,
        expected: usize,
        found: usize,
    },

    #[error("no node at path {path:?}")]
    InvalidPath { path: Vec<usize> },

    #[error("node at path {path:?} is a {found}, expected a {expected}")]
    WrongNodeKind {
        path: Vec<usize>,
        found: &'static str,
        expected: &'static str,
    },
}

/// Errors raised while decoding or encoding the binary median corpus.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CorpusError {
    #[error("corpus truncated at byte {offset} while reading {field}")]
    Truncated { offset: usize, field: &'static str },

    #[error("invalid codepoint U+{codepoint:04X} at byte {offset}")]
    InvalidCodepoint { codepoint: u32, offset: usize },

    #[error("{character:?} does not fit in two bytes")]
    CodepointOutOfRange { character: char },

    #[error("{character:?} has {count} strokes; at most 255 can be encoded")]
    TooManyStrokes { character: char, count: usize },

    #[error("{character:?} stroke {stroke} has {count} points; at most 255 can be encoded")]
    TooManyPoints {
        character: char,
        stroke: usize,
        count: usize,
    },

    #[error("{character:?} stroke {stroke} has coordinate ({x}, {y}) outside 0..=255")]
    CoordinateOutOfRange {
        character: char,
        stroke: usize,
        x: f64,
        y: f64,
    },
}

/// Errors raised by the matchers.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MatchError {
    #[error("medians list is empty")]
    NoMedians,

    #[error("median {0} has no points")]
    EmptyMedian(usize),

    #[error("at least one stroke must still be missing")]
    NothingMissing,

    #[error("missing stroke index {index} is out of range for {count} strokes")]
    MissingOutOfRange { index: usize, count: usize },
}

/// Any error produced by the glyph pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum StrokeError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("stroke extraction failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("median extraction failed for stroke {stroke}: {source}")]
    Median {
        stroke: usize,
        #[source]
        source: MedianError,
    },

    #[error("assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("invalid decomposition: {0}")]
    Decomposition(#[from] DecompositionError),

    #[error("invalid corpus: {0}")]
    Corpus(#[from] CorpusError),

    #[error("match failed: {0}")]
    Match(#[from] MatchError),
}
