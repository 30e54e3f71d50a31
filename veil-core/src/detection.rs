//! detection.rs - Runs the detection passes and resolves conflicts.
//!
//! `detect` scans a text fragment with every compiled rule, optionally
//! consults the entity recognizer, applies the whitelist and type filters,
//! and collapses overlapping candidates into a deterministic, non-overlapping
//! span list ready for the masker.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::compiler::PatternRegistry;
use crate::config::SanitizeConfig;
use crate::errors::SanitizeWarning;
use crate::recognizer::{is_canonical, EntityRecognizer};
use crate::span::{Span, SpanSource};

/// One detection pass over a fragment, borrowing the shared immutable kernel.
pub struct DetectionEngine<'a> {
    registry: &'a PatternRegistry,
    recognizer: &'a dyn EntityRecognizer,
    config: &'a SanitizeConfig,
}

impl<'a> DetectionEngine<'a> {
    pub fn new(
        registry: &'a PatternRegistry,
        recognizer: &'a dyn EntityRecognizer,
        config: &'a SanitizeConfig,
    ) -> Self {
        Self {
            registry,
            recognizer,
            config,
        }
    }

    /// Produces a deduplicated, non-overlapping span list in ascending start
    /// order. Malformed input never aborts detection; recognizer failure
    /// degrades the call to regex-only and is reported as a warning.
    pub fn detect(&self, text: &str) -> (Vec<Span>, Vec<SanitizeWarning>) {
        let mut warnings = Vec::new();
        let mut candidates = self.regex_pass(text);

        if !self.config.regex_only {
            match self.recognizer_pass(text) {
                Ok(spans) => candidates.extend(spans),
                Err(warning) => warnings.push(warning),
            }
        }

        candidates.retain(|span| !self.config.whitelist.contains(&span.text));
        if !self.config.mask_types.is_empty() {
            candidates.retain(|span| self.config.mask_types.contains(&span.label));
        }

        let resolved = resolve_overlaps(candidates);
        (resolved, warnings)
    }

    fn regex_pass(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        for rule in self.registry.rules() {
            for found in rule.regex.find_iter(text) {
                if found.start() == found.end() {
                    continue;
                }
                let mut tier = rule.tier;
                if let Some((token, hook)) = &rule.validator {
                    // A panicking hook counts as a failed validation.
                    let passed = catch_unwind(AssertUnwindSafe(|| hook(found.as_str())))
                        .unwrap_or(false);
                    if !passed {
                        if self.config.strict_validation {
                            debug!(
                                "Dropping '{}' match: validator '{}' rejected it",
                                rule.label, token
                            );
                            continue;
                        }
                        tier = 2;
                    }
                }
                spans.push(Span::from_rule(
                    &rule.label,
                    found.start(),
                    found.end(),
                    found.as_str(),
                    tier,
                    rule.priority,
                ));
            }
        }
        spans
    }

    fn recognizer_pass(&self, text: &str) -> Result<Vec<Span>, SanitizeWarning> {
        if !self.recognizer.available() {
            return Err(SanitizeWarning::RecognizerUnavailable(
                "no entity recognizer is loaded".to_string(),
            ));
        }
        let raw = self
            .recognizer
            .label_text(text)
            .map_err(|e| SanitizeWarning::RecognizerUnavailable(e.to_string()))?;

        let mut spans = Vec::with_capacity(raw.len());
        for mut span in raw {
            if span.confidence < self.config.min_confidence {
                continue;
            }
            if !is_canonical(&span.label) {
                continue;
            }
            // Guard the span invariants against a misbehaving adapter rather
            // than aborting the call.
            match text.get(span.start..span.end) {
                Some(slice) if slice == span.text && !slice.is_empty() => {}
                _ => continue,
            }
            span.source = SpanSource::Model;
            span.tier = 2;
            span.priority = usize::MAX;
            spans.push(span);
        }
        Ok(spans)
    }
}

/// Collapses candidates into a non-overlapping list.
///
/// Candidates are ordered by start ascending, then longer first, then tier,
/// then regex before model, then rule load order; a left-to-right sweep keeps
/// the first surviving span at any covered position.
fn resolve_overlaps(mut candidates: Vec<Span>) -> Vec<Span> {
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.end.cmp(&a.end))
            .then_with(|| a.tier.cmp(&b.tier))
            .then_with(|| a.source.rank().cmp(&b.source.rank()))
            .then_with(|| a.priority.cmp(&b.priority))
    });

    let mut resolved: Vec<Span> = Vec::with_capacity(candidates.len());
    let mut last_end = 0usize;
    for span in candidates {
        if resolved.is_empty() || span.start >= last_end {
            last_end = span.end;
            resolved.push(span);
        }
    }
    resolved
}
