//! sanitizer.rs - The end-to-end sanitization entry point.
//!
//! A [`Sanitizer`] binds an effective configuration, a compiled pattern
//! registry, and an optional entity recognizer, then runs the pipeline for
//! each call: size cap, parser selection, per-fragment detection and
//! masking, container reconstruction. The registry and recognizer are shared
//! immutable state; every call owns its own fragments, spans, and map, so
//! one sanitizer serves many threads without coordination.
//!
//! License: MIT OR Apache-2.0

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::compiler::PatternRegistry;
use crate::config::{FormatHint, SanitizeConfig};
use crate::detection::DetectionEngine;
use crate::errors::{SanitizeWarning, VeilError};
use crate::masker::{self, Masker, RehydrationMap};
use crate::parsers::{Document, Parser};
use crate::recognizer::{EntityRecognizer, NoopRecognizer};

/// The result of a successful sanitize call: the fully reconstructed
/// container, the rehydration map, and any degradations applied on the way.
#[derive(Debug, Clone)]
pub struct SanitizeOutcome {
    pub output: Document,
    pub map: RehydrationMap,
    pub warnings: Vec<SanitizeWarning>,
}

/// Orchestrates parsing, detection, masking, and reconstruction.
pub struct Sanitizer {
    config: SanitizeConfig,
    registry: Arc<PatternRegistry>,
    recognizer: Arc<dyn EntityRecognizer>,
    recognizer_warned: AtomicBool,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Sanitizer {
    /// Builds a sanitizer from a configuration, loading its pattern packs
    /// from the builtin search path. No recognizer is attached; calls run
    /// regex-only unless [`Sanitizer::with_recognizer`] is used.
    pub fn new(config: SanitizeConfig) -> Result<Self, VeilError> {
        Self::with_recognizer(config, Arc::new(NoopRecognizer))
    }

    /// Builds a sanitizer with an entity recognizer adapter.
    pub fn with_recognizer(
        config: SanitizeConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Result<Self, VeilError> {
        config.validate()?;
        let registry = Arc::new(PatternRegistry::load(&config.pattern_packs, None)?);
        Ok(Self::from_parts(config, registry, recognizer))
    }

    /// Assembles a sanitizer from an already-compiled registry, allowing the
    /// registry to be shared across many sanitizers.
    pub fn from_parts(
        config: SanitizeConfig,
        registry: Arc<PatternRegistry>,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Self {
        Self {
            config,
            registry,
            recognizer,
            recognizer_warned: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SanitizeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Runs the pipeline. A failed call returns an error and no partially
    /// masked output; a successful call returns a fully reconstructed
    /// container and a self-consistent map.
    pub fn sanitize(&self, input: impl Into<Document>) -> Result<SanitizeOutcome, VeilError> {
        let doc = input.into();

        let len = doc.char_len();
        if len > self.config.max_input_characters {
            return Err(VeilError::InputTooLarge {
                len,
                max: self.config.max_input_characters,
            });
        }

        let mut warnings = Vec::new();
        let (parser, doc) = self.bind_parser(doc, &mut warnings);
        let (parser, fragments) = self.parse_with_fallback(parser, &doc, &mut warnings)?;
        debug!("Parsed input into {} fragment(s)", fragments.len());

        let engine = DetectionEngine::new(&self.registry, self.recognizer.as_ref(), &self.config);
        let mut masker = Masker::new(
            &self.config.placeholder_prefix,
            &self.config.placeholder_suffix,
        );
        let mut map = RehydrationMap::new();
        let mut replacements = Vec::with_capacity(fragments.len());
        for fragment in &fragments {
            let (spans, fragment_warnings) = engine.detect(&fragment.text);
            for warning in fragment_warnings {
                self.record_warning(warning, &mut warnings);
            }
            replacements.push(masker.mask_fragment(&fragment.text, &spans, &mut map));
        }

        let output = parser.reconstruct(&doc, &fragments, &replacements)?;
        Ok(SanitizeOutcome {
            output,
            map,
            warnings,
        })
    }

    /// Sanitizes and persists the map under `session_id`, returning only the
    /// masked output and warnings. The caller rehydrates later by session id.
    pub fn sanitize_to_store(
        &self,
        input: impl Into<Document>,
        session_id: &str,
        store: &dyn crate::store::SessionStore,
    ) -> Result<(Document, Vec<SanitizeWarning>), VeilError> {
        let outcome = self.sanitize(input)?;
        store.put(session_id, &outcome.map)?;
        Ok((outcome.output, outcome.warnings))
    }

    /// Selects the parser for this call, converting a text input into a tree
    /// when the structured hint asks for one and the text parses as JSON.
    fn bind_parser(&self, doc: Document, warnings: &mut Vec<SanitizeWarning>) -> (Parser, Document) {
        if self.config.format_hint == FormatHint::Structured {
            if let Document::Text(text) = &doc {
                match serde_json::from_str::<serde_json::Value>(text) {
                    Ok(tree) => return (Parser::Structured, Document::Tree(tree)),
                    Err(e) => {
                        self.record_warning(
                            SanitizeWarning::ParserFallback(format!(
                                "structured hint on unparseable text: {e}"
                            )),
                            warnings,
                        );
                        return (Parser::Plain, doc);
                    }
                }
            }
        }
        let parser = Parser::select(&doc, self.config.format_hint);
        (parser, doc)
    }

    /// Parses with the bound parser; markup inputs the scanner rejects
    /// degrade to plain text with a recorded warning.
    fn parse_with_fallback(
        &self,
        parser: Parser,
        doc: &Document,
        warnings: &mut Vec<SanitizeWarning>,
    ) -> Result<(Parser, Vec<crate::parsers::Fragment>), VeilError> {
        match parser.parse(doc) {
            Ok(fragments) => Ok((parser, fragments)),
            Err(VeilError::ParserFallback(reason)) if parser == Parser::Markup => {
                self.record_warning(SanitizeWarning::ParserFallback(reason), warnings);
                let fragments = Parser::Plain.parse(doc)?;
                Ok((Parser::Plain, fragments))
            }
            Err(e) => Err(e),
        }
    }

    fn record_warning(&self, warning: SanitizeWarning, warnings: &mut Vec<SanitizeWarning>) {
        if let SanitizeWarning::RecognizerUnavailable(detail) = &warning {
            // Degradation is logged once per sanitizer, not once per call.
            if !self.recognizer_warned.swap(true, Ordering::Relaxed) {
                warn!("Entity recognizer unavailable, running regex-only: {detail}");
            }
        }
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
}

/// One-shot sanitization with an optional configuration, for callers that do
/// not want to hold a [`Sanitizer`]. Defaults apply when `config` is `None`.
pub fn sanitize(
    input: impl Into<Document>,
    config: Option<SanitizeConfig>,
) -> Result<SanitizeOutcome, VeilError> {
    Sanitizer::new(config.unwrap_or_default())?.sanitize(input)
}

/// Restores originals throughout a document. Text documents go through
/// [`masker::rehydrate`]; trees are walked leaf by leaf.
pub fn rehydrate_document(doc: &Document, map: &RehydrationMap) -> Document {
    match doc {
        Document::Text(text) => Document::Text(masker::rehydrate(text, map)),
        Document::Tree(tree) => Document::Tree(rehydrate_tree(tree, map)),
    }
}

fn rehydrate_tree(node: &serde_json::Value, map: &RehydrationMap) -> serde_json::Value {
    use serde_json::Value;
    match node {
        Value::String(text) => Value::String(masker::rehydrate(text, map)),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), rehydrate_tree(v, map)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| rehydrate_tree(v, map)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex_only_config() -> SanitizeConfig {
        SanitizeConfig {
            regex_only: true,
            ..SanitizeConfig::default()
        }
    }

    #[test]
    fn oversize_input_fails_without_output() {
        let mut config = regex_only_config();
        config.max_input_characters = 8;
        let sanitizer = Sanitizer::new(config).unwrap();
        let err = sanitizer.sanitize("far too long for the cap").unwrap_err();
        assert!(matches!(err, VeilError::InputTooLarge { len: 24, max: 8 }));
    }

    #[test]
    fn size_cap_counts_characters_not_bytes() {
        let mut config = regex_only_config();
        config.max_input_characters = 4;
        let sanitizer = Sanitizer::new(config).unwrap();
        // Four multi-byte characters fit a four-character cap.
        assert!(sanitizer.sanitize("äöüß").is_ok());
    }

    #[test]
    fn regex_only_masks_structured_detections() {
        let sanitizer = Sanitizer::new(regex_only_config()).unwrap();
        let outcome = sanitizer
            .sanitize("Contact John at john.doe@example.com or 555-123-4567")
            .unwrap();
        let masked = outcome.output.as_text().unwrap();
        assert!(masked.contains("Contact John at <<EMAIL_"));
        assert!(masked.contains(" or <<PHONE_"));
        assert!(!masked.contains("john.doe@example.com"));
        assert!(!masked.contains("555-123-4567"));
        assert_eq!(outcome.map.len(), 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn default_config_without_recognizer_warns_and_degrades() {
        let sanitizer = Sanitizer::new(SanitizeConfig::default()).unwrap();
        let outcome = sanitizer.sanitize("nothing sensitive here").unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            SanitizeWarning::RecognizerUnavailable(_)
        ));
    }

    #[test]
    fn structured_hint_parses_json_text() {
        let mut config = regex_only_config();
        config.format_hint = FormatHint::Structured;
        let sanitizer = Sanitizer::new(config).unwrap();
        let outcome = sanitizer
            .sanitize(r#"{"email": "a@b.co", "count": 3}"#)
            .unwrap();
        let tree = outcome.output.as_tree().unwrap();
        assert_eq!(tree["count"], 3);
        assert!(tree["email"].as_str().unwrap().starts_with("<<EMAIL_"));
    }

    #[test]
    fn structured_hint_on_plain_text_falls_back() {
        let mut config = regex_only_config();
        config.format_hint = FormatHint::Structured;
        let sanitizer = Sanitizer::new(config).unwrap();
        let outcome = sanitizer.sanitize("not json at all: a@b.co").unwrap();
        assert!(outcome.output.as_text().is_some());
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, SanitizeWarning::ParserFallback(_))));
        assert_eq!(outcome.map.len(), 1);
    }

    #[test]
    fn invalid_markup_falls_back_to_plain() {
        let sanitizer = Sanitizer::new(regex_only_config()).unwrap();
        let outcome = sanitizer.sanitize("<p>broken <dangling a@b.co").unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, SanitizeWarning::ParserFallback(_))));
        // The email is still masked on the plain-text path.
        assert!(!outcome.output.as_text().unwrap().contains("a@b.co"));
    }

    #[test]
    fn rehydrate_document_restores_trees() {
        let sanitizer = Sanitizer::new(regex_only_config()).unwrap();
        let input = serde_json::json!({"email": "a@b.co", "n": 1});
        let outcome = sanitizer.sanitize(Document::Tree(input.clone())).unwrap();
        let restored = rehydrate_document(&outcome.output, &outcome.map);
        assert_eq!(restored.as_tree().unwrap(), &input);
    }
}
