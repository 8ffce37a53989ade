//! Glyph outlines as typed segment lists.
//!
//! A normal-form path is a sequence of `M`, `L`, `Q` and `Z` commands with
//! space-separated operands. Every contour returns to its starting point
//! explicitly and the path ends with a single `Z`:
//!
//! ```text
//! M 0 0 L 100 0 Q 150 50 100 100 L 0 0 Z
//! ```

mod direction;

use kurbo::{BezPath, Line, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, QuadBez, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use crate::geom::signed_area;

/// Accuracy used for quadratic arc lengths.
const ARCLEN_ACCURACY: f64 = 1e-3;

/// A line or quadratic segment of a contour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    /// Present only when distinct from both endpoints.
    pub control: Option<Point>,
}

impl Segment {
    pub fn line(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            control: None,
        }
    }

    /// A quadratic segment. A control point that coincides with either
    /// endpoint degrades the segment to a line.
    pub fn quad(start: Point, control: Point, end: Point) -> Self {
        let control = (control != start && control != end).then_some(control);
        Self {
            start,
            end,
            control,
        }
    }

    pub fn is_curve(&self) -> bool {
        self.control.is_some()
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            control: self.control,
        }
    }

    /// Point at parameter `t` in [0, 1].
    pub fn eval(&self, t: f64) -> Point {
        self.to_path_seg().eval(t)
    }

    pub fn arclen(&self) -> f64 {
        self.to_path_seg().arclen(ARCLEN_ACCURACY)
    }

    pub fn to_path_seg(&self) -> PathSeg {
        match self.control {
            Some(control) => PathSeg::Quad(QuadBez::new(self.start, control, self.end)),
            None => PathSeg::Line(Line::new(self.start, self.end)),
        }
    }
}

/// A closed, non-empty cycle of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContour")]
pub struct Contour {
    segments: Vec<Segment>,
}

/// Deserialized form of a [`Contour`], checked before use.
#[derive(Deserialize)]
struct RawContour {
    segments: Vec<Segment>,
}

impl TryFrom<RawContour> for Contour {
    type Error = PathError;

    fn try_from(raw: RawContour) -> Result<Self, Self::Error> {
        Self::checked(raw.segments, 0)
    }
}

impl Contour {
    /// Build a contour, checking that it is non-empty, connected and closed.
    pub fn new(segments: Vec<Segment>) -> Result<Self, PathError> {
        Self::checked(segments, 0)
    }

    fn checked(segments: Vec<Segment>, index: usize) -> Result<Self, PathError> {
        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(PathError::EmptyContour { contour: index }),
        };
        if last.end != first.start {
            return Err(PathError::OpenContour {
                contour: index,
                x: last.end.x,
                y: last.end.y,
            });
        }
        for pair in segments.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(PathError::OpenContour {
                    contour: index,
                    x: pair[0].end.x,
                    y: pair[0].end.y,
                });
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment starting points, i.e. the on-curve polygon.
    pub fn vertices(&self) -> Vec<Point> {
        self.segments.iter().map(|s| s.start).collect()
    }

    /// Twice the signed area enclosed by the on-curve polygon.
    pub fn twice_area(&self) -> f64 {
        2.0 * signed_area(&self.vertices())
    }

    pub fn is_ccw(&self) -> bool {
        self.twice_area() > 0.0
    }

    /// The same contour traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            segments: self.segments.iter().rev().map(Segment::reversed).collect(),
        }
    }

    /// Polygon approximation with `samples` points per segment.
    pub fn polygon(&self, samples: usize) -> Vec<Point> {
        let samples = samples.max(1);
        let mut result = Vec::with_capacity(self.segments.len() * samples);
        for segment in &self.segments {
            for i in 0..samples {
                result.push(segment.eval(i as f64 / samples as f64));
            }
        }
        result
    }

    /// Nonzero-winding containment test against the true curves.
    pub fn contains(&self, point: Point) -> bool {
        self.to_bezpath().winding(point) != 0
    }

    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.segments[0].start);
        for segment in &self.segments {
            match segment.control {
                Some(control) => path.quad_to(control, segment.end),
                None => path.line_to(segment.end),
            }
        }
        path.close_path();
        path
    }

    /// Normal-form path string for this contour alone.
    pub fn to_svg(&self) -> String {
        let mut terms = Vec::new();
        self.push_terms(&mut terms);
        terms.push("Z".to_string());
        terms.join(" ")
    }

    fn push_terms(&self, terms: &mut Vec<String>) {
        let start = self.segments[0].start;
        terms.extend(["M".to_string(), num(start.x), num(start.y)]);
        for segment in &self.segments {
            match segment.control {
                Some(c) => terms.extend(["Q".to_string(), num(c.x), num(c.y)]),
                None => terms.push("L".to_string()),
            }
            terms.extend([num(segment.end.x), num(segment.end.y)]);
        }
    }
}

fn num(value: f64) -> String {
    format!("{}", value)
}

/// An ordered list of contours making up one glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOutline")]
pub struct Outline {
    contours: Vec<Contour>,
}

#[derive(Deserialize)]
struct RawOutline {
    contours: Vec<RawContour>,
}

impl TryFrom<RawOutline> for Outline {
    type Error = PathError;

    fn try_from(raw: RawOutline) -> Result<Self, Self::Error> {
        let contours = raw
            .contours
            .into_iter()
            .enumerate()
            .map(|(index, contour)| Contour::checked(contour.segments, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { contours })
    }
}

impl Outline {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    /// Parse a normal-form path string.
    ///
    /// Degenerate segments are dropped, and a quadratic control point that
    /// coincides with an endpoint turns the segment into a line. A `Z`
    /// directly followed by `M` is accepted as a contour separator.
    pub fn parse(d: &str) -> Result<Self, PathError> {
        let tokens: Vec<&str> = d
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        let first = tokens.first().ok_or(PathError::Empty)?;
        if *first != "M" {
            return Err(PathError::MissingMoveTo(first.to_string()));
        }
        if tokens.last() != Some(&"Z") {
            return Err(PathError::MissingClose);
        }

        let mut contours = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        let mut start = Point::ZERO;
        let mut current: Option<Point> = None;
        let mut i = 0;
        while i < tokens.len() {
            let command = tokens[i];
            match command {
                "M" | "Z" => {
                    if let Some(cur) = current.take() {
                        let index = contours.len();
                        if cur != start {
                            return Err(PathError::OpenContour {
                                contour: index,
                                x: cur.x,
                                y: cur.y,
                            });
                        }
                        contours.push(Contour::checked(std::mem::take(&mut segments), index)?);
                    }
                    if command == "Z" {
                        if i + 1 < tokens.len() && tokens[i + 1] != "M" {
                            return Err(PathError::EndedEarly { index: i });
                        }
                        i += 1;
                        continue;
                    }
                    start = read_point(&tokens, i)?;
                    current = Some(start);
                    i += 3;
                }
                "L" | "Q" => {
                    let from = current.ok_or(PathError::EndedEarly { index: i })?;
                    let (control, end) = if command == "Q" {
                        (Some(read_point(&tokens, i)?), read_point(&tokens, i + 2)?)
                    } else {
                        (None, read_point(&tokens, i)?)
                    };
                    i += if command == "Q" { 5 } else { 3 };
                    current = Some(end);
                    if from == end {
                        continue;
                    }
                    segments.push(match control {
                        Some(control) => Segment::quad(from, control, end),
                        None => Segment::line(from, end),
                    });
                }
                other => {
                    return Err(PathError::UnsupportedCommand {
                        command: other.to_string(),
                        index: i,
                    })
                }
            }
        }
        Ok(Self { contours })
    }

    /// Convert an arbitrary kurbo path. Contours are closed implicitly
    /// with a straight segment, as SVG `Z` does.
    pub fn from_bezpath(path: &BezPath) -> Result<Self, PathError> {
        let mut contours = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;
        let mut open = false;
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    if open {
                        return Err(PathError::OpenContour {
                            contour: contours.len(),
                            x: current.x,
                            y: current.y,
                        });
                    }
                    start = p;
                    current = p;
                    open = true;
                }
                PathEl::LineTo(p) => {
                    if p != current {
                        segments.push(Segment::line(current, p));
                    }
                    current = p;
                }
                PathEl::QuadTo(c, p) => {
                    if p != current {
                        segments.push(Segment::quad(current, c, p));
                    }
                    current = p;
                }
                PathEl::CurveTo(..) => {
                    return Err(PathError::CubicSegment {
                        contour: contours.len(),
                    })
                }
                PathEl::ClosePath => {
                    if current != start {
                        segments.push(Segment::line(current, start));
                    }
                    let index = contours.len();
                    contours.push(Contour::checked(std::mem::take(&mut segments), index)?);
                    current = start;
                    open = false;
                }
            }
        }
        if open {
            return Err(PathError::OpenContour {
                contour: contours.len(),
                x: current.x,
                y: current.y,
            });
        }
        if contours.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { contours })
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn into_contours(self) -> Vec<Contour> {
        self.contours
    }

    /// Exterior contours CCW, holes CW, by containment parity.
    pub fn normalized(&self) -> Self {
        Self {
            contours: direction::fix_directions(&self.contours),
        }
    }

    /// Whether any contour contains the point under the even-odd rule.
    pub fn contains(&self, point: Point) -> bool {
        self.contours.iter().filter(|c| c.contains(point)).count() % 2 == 1
    }

    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        for contour in &self.contours {
            path.extend(contour.to_bezpath().elements().iter().copied());
        }
        path
    }

    /// Serialize back to a normal-form path string.
    pub fn to_svg(&self) -> String {
        let mut terms = Vec::new();
        for contour in &self.contours {
            contour.push_terms(&mut terms);
        }
        terms.push("Z".to_string());
        terms.join(" ")
    }

    /// Mirror the outline vertically about `rise / 2`, converting between
    /// baseline-up font coordinates and y-down canvas coordinates.
    pub fn flip_y(&self, rise: f64) -> Self {
        let flip = |p: Point| Point::new(p.x, rise - p.y);
        let contours = self
            .contours
            .iter()
            .map(|contour| Contour {
                segments: contour
                    .segments
                    .iter()
                    .map(|s| Segment {
                        start: flip(s.start),
                        end: flip(s.end),
                        control: s.control.map(flip),
                    })
                    .collect(),
            })
            .collect();
        Self { contours }
    }
}

impl FromStr for Outline {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_svg())
    }
}

fn read_point(tokens: &[&str], index: usize) -> Result<Point, PathError> {
    let x = read_number(tokens, index + 1)?;
    let y = read_number(tokens, index + 2)?;
    Ok(Point::new(x, y))
}

fn read_number(tokens: &[&str], index: usize) -> Result<f64, PathError> {
    let token = tokens
        .get(index)
        .ok_or(PathError::MissingCoordinate { index: index - 1 })?;
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PathError::InvalidNumber {
            token: token.to_string(),
            index,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SQUARE_WITH_HOLE: &str =
        "M 0 0 L 100 0 L 100 100 L 0 100 L 0 0 M 25 25 L 75 25 L 75 75 L 25 75 L 25 25 Z";

    #[test]
    fn normal_form_round_trip() {
        let d = "M 0 0 L 100 0 Q 150 50 100 100 L 0 100 L 0 0 Z";
        let outline = Outline::parse(d).unwrap();
        assert_eq!(outline.contours().len(), 1);
        assert_eq!(outline.contours()[0].len(), 4);
        assert!(outline.contours()[0].segments()[1].is_curve());
        assert_eq!(outline.to_svg(), d);
        assert_eq!(Outline::parse(&outline.to_svg()).unwrap(), outline);
    }

    #[test]
    fn degenerate_segments_and_controls_are_dropped() {
        let d = "M 0 0 L 0 0 L 10 0 Q 10 0 10 10 L 0 0 Z";
        let outline = Outline::parse(d).unwrap();
        let segments = outline.contours()[0].segments();
        assert_eq!(segments.len(), 3);
        assert!(!segments[1].is_curve());
    }

    #[test]
    fn open_contour_is_rejected() {
        let err = Outline::parse("M 0 0 L 10 0 L 10 10 Z").unwrap_err();
        assert!(matches!(err, PathError::OpenContour { contour: 0, .. }));
        let err = Outline::parse("M 0 0 L 10 0 L 10 10 M 20 20 L 30 20 L 20 20 Z").unwrap_err();
        assert!(matches!(err, PathError::OpenContour { contour: 0, .. }));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(Outline::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            Outline::parse("L 0 0 Z"),
            Err(PathError::MissingMoveTo(_))
        ));
        assert_eq!(Outline::parse("M 0 0 L 1 1"), Err(PathError::MissingClose));
        assert!(matches!(
            Outline::parse("M 0 0 C 1 1 2 2 0 0 Z"),
            Err(PathError::UnsupportedCommand { .. })
        ));
        assert!(matches!(
            Outline::parse("M 0 0 L x 1 L 0 0 Z"),
            Err(PathError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn orientation_is_normalized_by_containment() {
        let outline = Outline::parse(SQUARE_WITH_HOLE).unwrap();
        // The outer square is CCW already; the hole is CCW too and must flip.
        assert!(outline.contours()[0].is_ccw());
        let normalized = outline.normalized();
        assert!(normalized.contours()[0].is_ccw());
        assert!(!normalized.contours()[1].is_ccw());

        let flipped = outline.flip_y(100.0).normalized();
        assert!(flipped.contours()[0].is_ccw());
        assert!(!flipped.contours()[1].is_ccw());
    }

    #[test]
    fn containment_respects_holes() {
        let outline = Outline::parse(SQUARE_WITH_HOLE).unwrap();
        assert!(outline.contains(Point::new(10.0, 10.0)));
        assert!(!outline.contains(Point::new(50.0, 50.0)));
        assert!(!outline.contains(Point::new(150.0, 50.0)));
    }

    #[test]
    fn bezpath_conversion_closes_implicitly() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.quad_to((15.0, 5.0), (10.0, 10.0));
        path.close_path();
        let outline = Outline::from_bezpath(&path).unwrap();
        let contour = &outline.contours()[0];
        assert_eq!(contour.len(), 3);
        assert_eq!(contour.segments()[2].end, Point::new(0.0, 0.0));
    }

    #[test]
    fn deserialized_contours_are_checked() {
        let outline = Outline::parse(SQUARE_WITH_HOLE).unwrap();
        let json = serde_json::to_string(&outline).unwrap();
        assert_eq!(serde_json::from_str::<Outline>(&json).unwrap(), outline);

        let empty = serde_json::from_str::<Outline>(r#"{"contours":[{"segments":[]}]}"#);
        let message = empty.unwrap_err().to_string();
        assert!(message.contains("contour 0 has no segments"), "{message}");

        let open = r#"{"contours":[
            {"segments":[{"start":{"x":0.0,"y":0.0},"end":{"x":10.0,"y":0.0},"control":null},
                         {"start":{"x":10.0,"y":0.0},"end":{"x":0.0,"y":0.0},"control":null}]},
            {"segments":[{"start":{"x":0.0,"y":0.0},"end":{"x":10.0,"y":0.0},"control":null}]}
        ]}"#;
        let message = serde_json::from_str::<Outline>(open).unwrap_err().to_string();
        assert!(message.contains("contour 1 is open"), "{message}");
        assert!(serde_json::from_str::<Contour>(r#"{"segments":[]}"#).is_err());
    }

    #[test]
    fn polygon_samples_every_segment() {
        let outline = Outline::parse("M 0 0 L 16 0 L 16 16 L 0 0 Z").unwrap();
        let contour = &outline.contours()[0];
        let polygon = contour.polygon(4);
        assert_eq!(polygon.len(), 12);
        assert_abs_diff_eq!(polygon[1].x, 4.0);
        assert_abs_diff_eq!(contour.twice_area(), 256.0);
    }
}
