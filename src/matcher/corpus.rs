//! Binary median corpus and its preprocessed, shareable form.
//!
//! The stream is a plain concatenation of entries with no header:
//!
//! ```text
//! u16 LE  codepoint
//! u8      stroke count
//! per stroke:
//!   u8    point count
//!   [u8; 2] per point: x, y
//! ```

use kurbo::Point;
use rayon::prelude::*;
use std::sync::{Arc, PoisonError, RwLock};

use super::{normalize, StrokeFeatures};
use crate::config::MatchParams;
use crate::error::{CorpusError, MatchError, StrokeError};
use crate::median::Median;

/// Canvas units per quantized unit.
const QUANTIZE_STEP: f64 = 4.0;
/// Largest quantized coordinate.
const QUANTIZE_MAX: f64 = 255.0;

/// Decode every entry of a binary median stream.
pub fn decode_corpus(bytes: &[u8]) -> Result<Vec<(char, Vec<Median>)>, CorpusError> {
    let mut reader = Reader { bytes, offset: 0 };
    let mut entries = Vec::new();
    while !reader.at_end() {
        let offset = reader.offset;
        let lo = reader.byte("codepoint")?;
        let hi = reader.byte("codepoint")?;
        let codepoint = u32::from(lo) | u32::from(hi) << 8;
        let character = char::from_u32(codepoint)
            .ok_or(CorpusError::InvalidCodepoint { codepoint, offset })?;

        let strokes = reader.byte("stroke count")?;
        let mut medians = Vec::with_capacity(strokes as usize);
        for _ in 0..strokes {
            let points = reader.byte("point count")?;
            let mut median = Vec::with_capacity(points as usize);
            for _ in 0..points {
                let x = reader.byte("point")?;
                let y = reader.byte("point")?;
                median.push(Point::new(f64::from(x), f64::from(y)));
            }
            medians.push(median);
        }
        entries.push((character, medians));
    }
    tracing::debug!(entries = entries.len(), bytes = bytes.len(), "decoded corpus");
    Ok(entries)
}

/// Encode entries whose medians are already quantized to 0..=255.
pub fn encode_corpus(entries: &[(char, Vec<Median>)]) -> Result<Vec<u8>, CorpusError> {
    let mut out = Vec::new();
    for (character, medians) in entries {
        let character = *character;
        let codepoint = u16::try_from(u32::from(character))
            .map_err(|_| CorpusError::CodepointOutOfRange { character })?;
        out.extend_from_slice(&codepoint.to_le_bytes());
        out.push(u8::try_from(medians.len()).map_err(|_| CorpusError::TooManyStrokes {
            character,
            count: medians.len(),
        })?);
        for (stroke, median) in medians.iter().enumerate() {
            out.push(u8::try_from(median.len()).map_err(|_| CorpusError::TooManyPoints {
                character,
                stroke,
                count: median.len(),
            })?);
            for p in median {
                let in_range = |v: f64| (0.0..=255.0).contains(&v);
                if !(in_range(p.x) && in_range(p.y)) {
                    return Err(CorpusError::CoordinateOutOfRange {
                        character,
                        stroke,
                        x: p.x,
                        y: p.y,
                    });
                }
                out.push(p.x as u8);
                out.push(p.y as u8);
            }
        }
    }
    Ok(out)
}

/// Scale a median on the 1024 canvas into the byte range of the stream.
///
/// The corpus keeps the canvas frame, y down, like every other median in
/// the crate. Font-unit outlines are brought into that frame with
/// [`Outline::flip_y`](crate::path::Outline::flip_y) before extraction.
pub fn quantize_median(median: &[Point]) -> Median {
    let quantize = |v: f64| (v / QUANTIZE_STEP).floor().clamp(0.0, QUANTIZE_MAX);
    median.iter().map(|p| Point::new(quantize(p.x), quantize(p.y))).collect()
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn byte(&mut self, field: &'static str) -> Result<u8, CorpusError> {
        let b = *self.bytes.get(self.offset).ok_or(CorpusError::Truncated {
            offset: self.offset,
            field,
        })?;
        self.offset += 1;
        Ok(b)
    }
}

/// One character of a corpus with its preprocessed stroke features.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub character: char,
    pub medians: Vec<Median>,
    features: Vec<StrokeFeatures>,
}

impl CorpusEntry {
    pub fn features(&self) -> &[StrokeFeatures] {
        &self.features
    }

    pub fn stroke_count(&self) -> usize {
        self.features.len()
    }
}

/// An immutable, preprocessed set of reference characters.
#[derive(Debug, Clone)]
pub struct Corpus {
    params: MatchParams,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Preprocess every entry in parallel. Fails on the first entry
    /// without strokes or with an empty stroke.
    pub fn new(entries: Vec<(char, Vec<Median>)>, params: MatchParams) -> Result<Self, MatchError> {
        let entries = entries
            .into_par_iter()
            .map(|(character, medians)| {
                let features = normalize(&medians, &params)?;
                Ok(CorpusEntry {
                    character,
                    medians,
                    features,
                })
            })
            .collect::<Result<Vec<_>, MatchError>>()?;
        tracing::debug!(entries = entries.len(), "preprocessed corpus");
        Ok(Self { params, entries })
    }

    /// Decode and preprocess a binary median stream.
    pub fn from_bytes(bytes: &[u8], params: MatchParams) -> Result<Self, StrokeError> {
        Ok(Self::new(decode_corpus(bytes)?, params)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CorpusError> {
        let entries: Vec<(char, Vec<Median>)> = self
            .entries
            .iter()
            .map(|e| (e.character, e.medians.clone()))
            .collect();
        encode_corpus(&entries)
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, character: char) -> Option<&CorpusEntry> {
        self.entries.iter().find(|e| e.character == character)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The current corpus, shared between matcher threads.
///
/// Readers take a snapshot and keep using it for as long as they like;
/// `replace` swaps in a fully built corpus, so no reader ever sees a
/// partial one.
#[derive(Debug)]
pub struct SharedCorpus {
    current: RwLock<Arc<Corpus>>,
}

impl SharedCorpus {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            current: RwLock::new(Arc::new(corpus)),
        }
    }

    pub fn snapshot(&self) -> Arc<Corpus> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install `corpus` and return the one it replaced.
    pub fn replace(&self, corpus: Corpus) -> Arc<Corpus> {
        let next = Arc::new(corpus);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Median {
        vec![Point::new(x0, y0), Point::new(x1, y1)]
    }

    #[test]
    fn decodes_byte_layout() {
        // '一' is U+4E00: one stroke of two points.
        let bytes = [0x00, 0x4E, 1, 2, 10, 20, 200, 20];
        let entries = decode_corpus(&bytes).unwrap();
        assert_eq!(entries, vec![('一', vec![line(10.0, 20.0, 200.0, 20.0)])]);
        assert_eq!(encode_corpus(&entries).unwrap(), bytes.to_vec());
    }

    #[test]
    fn truncation_reports_offset_and_field() {
        let bytes = [0x00, 0x4E, 1, 2, 10, 20, 200];
        assert_eq!(
            decode_corpus(&bytes),
            Err(CorpusError::Truncated {
                offset: 7,
                field: "point"
            })
        );
        assert_eq!(
            decode_corpus(&[0x00]),
            Err(CorpusError::Truncated {
                offset: 1,
                field: "codepoint"
            })
        );
    }

    #[test]
    fn surrogates_are_invalid() {
        assert_eq!(
            decode_corpus(&[0x00, 0xD8, 0]),
            Err(CorpusError::InvalidCodepoint {
                codepoint: 0xD800,
                offset: 0
            })
        );
    }

    #[test]
    fn encoder_checks_ranges() {
        assert_eq!(
            encode_corpus(&[('😀', vec![])]),
            Err(CorpusError::CodepointOutOfRange { character: '😀' })
        );
        assert!(matches!(
            encode_corpus(&[('一', vec![line(0.0, 0.0, 256.0, 0.0)])]),
            Err(CorpusError::CoordinateOutOfRange { stroke: 0, .. })
        ));
        let long = vec![Point::ZERO; 256];
        assert!(matches!(
            encode_corpus(&[('一', vec![long])]),
            Err(CorpusError::TooManyPoints { count: 256, .. })
        ));
    }

    #[test]
    fn quantization_keeps_the_canvas_frame() {
        let q = quantize_median(&[
            Point::new(100.0, 900.0),
            Point::new(1023.0, -12.0),
            Point::new(1024.0, 1100.0),
        ]);
        assert_eq!(
            q,
            vec![Point::new(25.0, 225.0), Point::new(255.0, 0.0), Point::new(255.0, 255.0)]
        );
    }

    #[test]
    fn replace_is_atomic_for_snapshots() {
        let params = MatchParams::default();
        let first = Corpus::new(vec![('一', vec![line(0.0, 0.0, 100.0, 0.0)])], params.clone()).unwrap();
        let shared = SharedCorpus::new(first);
        let before = shared.snapshot();

        let second = Corpus::new(
            vec![
                ('一', vec![line(0.0, 0.0, 100.0, 0.0)]),
                ('丨', vec![line(0.0, 0.0, 0.0, 100.0)]),
            ],
            params,
        )
        .unwrap();
        let old = shared.replace(second);
        assert!(Arc::ptr_eq(&old, &before));
        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
        assert!(shared.snapshot().get('丨').is_some());
    }

    #[test]
    fn corpus_rejects_empty_strokes() {
        let result = Corpus::new(vec![('一', vec![vec![]])], MatchParams::default());
        assert_eq!(result.err(), Some(MatchError::EmptyMedian(0)));
    }
}
