// veil-core/src/span.rs
//! Candidate findings produced by the detection passes.

use serde::{Deserialize, Serialize};

/// Where a span came from: a compiled regex rule or the entity recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    Regex,
    Model,
}

impl SpanSource {
    /// Conflict-resolution rank: regex beats model on otherwise equal spans.
    pub(crate) fn rank(self) -> u8 {
        match self {
            SpanSource::Regex => 0,
            SpanSource::Model => 1,
        }
    }
}

/// A candidate finding over a half-open byte interval `[start, end)`.
///
/// Invariants at detection time: `start < end <= len(text)` and `text` equals
/// the source slice at `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub confidence: f64,
    pub source: SpanSource,
    /// Confidence class inherited from the producing rule; model spans are
    /// always heuristic (tier 2).
    pub tier: u8,
    /// Rule load order for deterministic tie-breaks; model spans sort last.
    #[serde(default = "model_priority")]
    pub priority: usize,
}

fn model_priority() -> usize {
    usize::MAX
}

impl Span {
    /// A span emitted by a regex rule.
    pub fn from_rule(label: &str, start: usize, end: usize, text: &str, tier: u8, priority: usize) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
            text: text.to_string(),
            confidence: 1.0,
            source: SpanSource::Regex,
            tier,
            priority,
        }
    }

    /// A span emitted by the entity recognizer.
    pub fn from_model(label: &str, start: usize, end: usize, text: &str, confidence: f64) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
            text: text.to_string(),
            confidence,
            source: SpanSource::Model,
            tier: 2,
            priority: usize::MAX,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether this span intersects `other`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_symmetric_and_half_open() {
        let a = Span::from_rule("A", 0, 4, "abcd", 1, 0);
        let b = Span::from_rule("B", 4, 8, "efgh", 1, 1);
        let c = Span::from_rule("C", 3, 5, "de", 1, 2);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn regex_ranks_before_model() {
        assert!(SpanSource::Regex.rank() < SpanSource::Model.rank());
    }
}
