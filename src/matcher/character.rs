//! Whole-character matching against a corpus.

use serde::Serialize;
use std::sync::Arc;

use super::corpus::{Corpus, SharedCorpus};
use super::{normalize, StrokeFeatures};
use crate::config::MatchParams;
use crate::error::MatchError;
use crate::median::Median;

/// A ranked corpus character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub character: char,
    pub score: f64,
}

/// Keeps the best `max` candidates, highest score first.
/// Equal scores keep their arrival order.
struct MatchCollector {
    max: usize,
    matches: Vec<Candidate>,
}

impl MatchCollector {
    fn new(max: usize) -> Self {
        Self {
            max,
            matches: Vec::with_capacity(max + 1),
        }
    }

    fn file_match(&mut self, candidate: Candidate) {
        if self.max == 0 {
            return;
        }
        // Already full: skip anything that would land at the end.
        if self.matches.len() == self.max
            && self.matches.last().is_some_and(|m| candidate.score <= m.score)
        {
            return;
        }
        match self.matches.iter().position(|m| m.score < candidate.score) {
            Some(ix) => self.matches.insert(ix, candidate),
            None => self.matches.push(candidate),
        }
        self.matches.truncate(self.max);
    }

    fn into_matches(self) -> Vec<Candidate> {
        self.matches
    }
}

/// Ranks corpus characters by similarity to a full set of query strokes.
///
/// Holds a snapshot of the corpus, so a concurrent
/// [`SharedCorpus::replace`] never changes the results of a matcher that
/// already exists.
#[derive(Debug, Clone)]
pub struct CharacterMatcher {
    corpus: Arc<Corpus>,
}

impl CharacterMatcher {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }

    pub fn from_shared(shared: &SharedCorpus) -> Self {
        Self::new(shared.snapshot())
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn preprocess(&self, medians: &[Median]) -> Result<Vec<StrokeFeatures>, MatchError> {
        normalize(medians, self.corpus.params())
    }

    /// The `k` best characters with the same stroke count as the query.
    pub fn match_medians(&self, medians: &[Median], k: usize) -> Result<Vec<Candidate>, MatchError> {
        let query = self.preprocess(medians)?;
        let params = self.corpus.params();
        let mut collector = MatchCollector::new(k);
        for entry in self.corpus.entries() {
            if entry.stroke_count() != query.len() {
                continue;
            }
            collector.file_match(Candidate {
                character: entry.character,
                score: score_match(&query, entry.features(), params),
            });
        }
        let matches = collector.into_matches();
        tracing::debug!(strokes = query.len(), candidates = matches.len(), "matched character");
        Ok(matches)
    }
}

/// Similarity of two equally long stroke lists; zero is identical.
fn score_match(query: &[StrokeFeatures], target: &[StrokeFeatures], params: &MatchParams) -> f64 {
    query
        .iter()
        .zip(target)
        .map(|(q, t)| {
            let forward = score_stroke(q, t, params);
            if params.allow_reversal {
                forward.max(score_stroke(&q.reversed(params.side_length), t, params))
            } else {
                forward
            }
        })
        .sum()
}

fn score_stroke(a: &StrokeFeatures, b: &StrokeFeatures, params: &MatchParams) -> f64 {
    let side = params.side_length;
    let distance: f64 = a
        .points
        .iter()
        .zip(&b.points)
        .map(|(p, q)| p.distance_squared(*q))
        .sum();
    let angle = (a.direction - b.direction).abs();
    let ratio = (a.length + b.length) / side;
    let n = a.points.len() as f64;
    -distance - 4.0 * n * ratio * angle.min(side - angle)
}
