//! recognizer.rs - The entity recognizer seam.
//!
//! The core consumes an optional sequence-labeling model behind this narrow
//! contract. Training, loading, and device selection are external concerns;
//! an adapter that is absent or failing never aborts sanitization — the
//! pipeline degrades to regex-only and records a warning.
//!
//! License: MIT OR Apache-2.0

use crate::errors::VeilError;
use crate::span::Span;

/// The canonical labels a recognizer adapter may emit after normalization.
pub const CANONICAL_RECOGNIZER_LABELS: [&str; 3] = ["NAME", "ORGANIZATION", "LOCATION"];

/// Normalizes a raw model label (`PER`, `B-LOC`, `GPE`, ...) to its canonical
/// form. Returns `None` for labels outside the recognized entity set.
pub fn canonical_label(raw: &str) -> Option<&'static str> {
    let upper = raw.to_ascii_uppercase();
    if upper.contains("PER") || upper == "NAME" {
        Some("NAME")
    } else if upper.contains("ORG") {
        Some("ORGANIZATION")
    } else if upper.contains("LOC") || upper == "GPE" {
        Some("LOCATION")
    } else {
        None
    }
}

/// Whether a label is already in the canonical recognizer set.
pub fn is_canonical(label: &str) -> bool {
    CANONICAL_RECOGNIZER_LABELS.contains(&label)
}

/// Contract over an optional sequence-labeling model.
///
/// Implementations must be safe for concurrent inference; if the underlying
/// model is not, the adapter is responsible for serializing access.
pub trait EntityRecognizer: Send + Sync {
    /// Whether a model is loaded and ready for inference.
    fn available(&self) -> bool;

    /// Produces candidate spans over `text` with `source = model` and
    /// canonical labels. Offsets are byte offsets into `text`.
    fn label_text(&self, text: &str) -> Result<Vec<Span>, VeilError>;
}

/// The absent recognizer: never available, never produces spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecognizer;

impl EntityRecognizer for NoopRecognizer {
    fn available(&self) -> bool {
        false
    }

    fn label_text(&self, _text: &str) -> Result<Vec<Span>, VeilError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_labels_normalize() {
        assert_eq!(canonical_label("PER"), Some("NAME"));
        assert_eq!(canonical_label("B-PER"), Some("NAME"));
        assert_eq!(canonical_label("PERSON"), Some("NAME"));
        assert_eq!(canonical_label("ORG"), Some("ORGANIZATION"));
        assert_eq!(canonical_label("LOC"), Some("LOCATION"));
        assert_eq!(canonical_label("GPE"), Some("LOCATION"));
        assert_eq!(canonical_label("MISC"), None);
    }

    #[test]
    fn noop_is_unavailable_and_silent() {
        let recognizer = NoopRecognizer;
        assert!(!recognizer.available());
        assert!(recognizer.label_text("John Doe").unwrap().is_empty());
    }
}
