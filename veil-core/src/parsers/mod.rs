//! Format-aware extraction and reconstruction.
//!
//! A parser turns an input container into text [`Fragment`]s the detection
//! engine can scan, and later rebuilds the container with the rewritten
//! fragments. The parser set is closed and known at compile time, so it is a
//! tagged variant rather than an open trait: plain text, structured
//! key/value trees, and marked-up text.
//!
//! License: MIT OR Apache-2.0

pub mod markup;
pub mod structured;

use serde_json::Value;

use crate::config::FormatHint;
use crate::errors::VeilError;

/// A unit of content handed to the sanitizer: free text or a key/value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Text(String),
    Tree(Value),
}

impl Document {
    /// Input size in characters, the unit `max_input_characters` caps.
    /// Trees are measured over their serialized rendering.
    pub fn char_len(&self) -> usize {
        match self {
            Document::Text(text) => text.chars().count(),
            Document::Tree(tree) => tree.to_string().chars().count(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Document::Text(text) => Some(text),
            Document::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Value> {
        match self {
            Document::Text(_) => None,
            Document::Tree(tree) => Some(tree),
        }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Text(text.to_string())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Text(text)
    }
}

impl From<Value> for Document {
    fn from(tree: Value) -> Self {
        Document::Tree(tree)
    }
}

/// One step of a path from the root of a structured tree to a string leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

/// Where a fragment came from, opaque to detection and masking but
/// sufficient for the owning parser to re-insert a replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// The fragment is the whole input.
    Whole,
    /// Keys and indices from the root of a structured tree.
    Path(Vec<PathSeg>),
    /// A byte range in the original marked-up input.
    Offsets { start: usize, end: usize },
}

/// A text unit extracted by a parser, paired with its locator.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub locator: Locator,
}

/// The closed parser set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    Plain,
    Structured,
    Markup,
}

impl Parser {
    /// Auto-detection: structured trees go to the structured parser; text
    /// whose first non-whitespace character is `<` with a closing `>`
    /// somewhere after it goes to the markup parser; everything else is
    /// plain text.
    pub fn detect(doc: &Document) -> Parser {
        match doc {
            Document::Tree(_) => Parser::Structured,
            Document::Text(text) => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('<') && trimmed.contains('>') {
                    Parser::Markup
                } else {
                    Parser::Plain
                }
            }
        }
    }

    /// Applies a format hint over auto-detection. A tree input always goes
    /// to the structured parser: container shape outranks the hint.
    pub fn select(doc: &Document, hint: FormatHint) -> Parser {
        match (hint, doc) {
            (_, Document::Tree(_)) => Parser::Structured,
            (FormatHint::Auto, _) => Parser::detect(doc),
            (FormatHint::Text, _) => Parser::Plain,
            (FormatHint::Structured, _) => Parser::Structured,
            (FormatHint::Markup, _) => Parser::Markup,
        }
    }

    /// Extracts fragments. The markup variant signals unparseable input with
    /// [`VeilError::ParserFallback`]; the orchestrator degrades to the plain
    /// parser and records a warning.
    pub fn parse(&self, doc: &Document) -> Result<Vec<Fragment>, VeilError> {
        match (self, doc) {
            (Parser::Plain, _) => Ok(vec![Fragment {
                text: plain_text(doc),
                locator: Locator::Whole,
            }]),
            (Parser::Structured, Document::Tree(tree)) => structured::parse(tree),
            (Parser::Structured, Document::Text(_)) => Err(VeilError::ParserFallback(
                "structured parser requires a tree input".to_string(),
            )),
            (Parser::Markup, Document::Text(text)) => markup::parse(text),
            (Parser::Markup, Document::Tree(_)) => Err(VeilError::ParserFallback(
                "markup parser requires a text input".to_string(),
            )),
        }
    }

    /// Rebuilds the container with one replacement per fragment, in the same
    /// order `parse` emitted them.
    pub fn reconstruct(
        &self,
        original: &Document,
        fragments: &[Fragment],
        replacements: &[String],
    ) -> Result<Document, VeilError> {
        debug_assert_eq!(fragments.len(), replacements.len());
        match (self, original) {
            (Parser::Plain, _) => Ok(Document::Text(
                replacements.first().cloned().unwrap_or_default(),
            )),
            (Parser::Structured, Document::Tree(tree)) => {
                structured::reconstruct(tree, fragments, replacements).map(Document::Tree)
            }
            (Parser::Markup, Document::Text(text)) => {
                markup::reconstruct(text, fragments, replacements).map(Document::Text)
            }
            _ => Err(VeilError::ParserFallback(
                "reconstruction input does not match the parser variant".to_string(),
            )),
        }
    }
}

fn plain_text(doc: &Document) -> String {
    match doc {
        Document::Text(text) => text.clone(),
        Document::Tree(tree) => tree.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auto_detection_rules() {
        assert_eq!(Parser::detect(&Document::from(json!({"k": "v"}))), Parser::Structured);
        assert_eq!(Parser::detect(&Document::from("<p>hi</p>")), Parser::Markup);
        assert_eq!(Parser::detect(&Document::from("  <p>hi</p>")), Parser::Markup);
        assert_eq!(Parser::detect(&Document::from("a < b and b > c?")), Parser::Plain);
        assert_eq!(Parser::detect(&Document::from("plain words")), Parser::Plain);
    }

    #[test]
    fn tree_outranks_markup_hint() {
        let doc = Document::from(json!(["a"]));
        assert_eq!(Parser::select(&doc, FormatHint::Markup), Parser::Structured);
    }

    #[test]
    fn plain_round_trip() {
        let doc = Document::from("hello world");
        let fragments = Parser::Plain.parse(&doc).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].locator, Locator::Whole);
        let out = Parser::Plain
            .reconstruct(&doc, &fragments, &["HELLO WORLD".to_string()])
            .unwrap();
        assert_eq!(out, Document::from("HELLO WORLD"));
    }
}
