//! Pattern pack documents for `veil-core`.
//!
//! A pack is a named, versioned collection of labeled detection rules,
//! authored as YAML. This module owns the document model, schema validation,
//! and the search path (builtin packs embedded in the crate, plus an optional
//! explicit directory). Compilation into a usable rule table lives in
//! [`crate::compiler`].
//!
//! Loading is tolerant to benign schema extensions: unknown fields at the
//! pattern level are ignored with a warning, unknown fields at the pack root
//! are an error.
//!
//! License: MIT OR Apache-2.0

use anyhow::Context;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::errors::VeilError;
use crate::validators;

/// Maximum allowed length for a single regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Builtin packs shipped with the crate, resolvable by bare name.
static BUILTIN_PACKS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("default", include_str!("../config/packs/default.yaml")),
        ("uk", include_str!("../config/packs/uk.yaml")),
    ])
});

static LABEL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("label shape regex is static")
});

/// Regex compilation flags a rule may opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFlag {
    CaseInsensitive,
    Multiline,
    DotMatchesNewLine,
}

/// A single labeled rule inside a pack: one or more regular expressions plus
/// optional metadata and a validator token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackPattern {
    /// Uppercase identifier used in placeholders, e.g. `EMAIL` or `US_SSN`.
    #[serde(alias = "name")]
    pub label: String,
    /// The regex pattern strings. All of them carry this rule's label.
    pub patterns: Vec<String>,
    /// Confidence class: 1 is high-confidence structural, 2 is heuristic.
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// ISO 639-1 language tag.
    #[serde(default)]
    pub language: Option<String>,
    /// ISO 3166-1 alpha-2 country tag.
    #[serde(default)]
    pub country: Option<String>,
    /// Regex flags applied to every pattern of this rule.
    #[serde(default)]
    pub flags: Vec<PatternFlag>,
    /// Validator token resolved at load time, e.g. `luhn`.
    #[serde(default)]
    pub validator: Option<String>,
    /// Benign schema extensions land here and are warned about, not rejected.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yml::Value>,
}

fn default_tier() -> u8 {
    1
}

impl PackPattern {
    pub fn is_case_insensitive(&self) -> bool {
        self.flags.contains(&PatternFlag::CaseInsensitive)
    }

    pub fn is_multiline(&self) -> bool {
        self.flags.contains(&PatternFlag::Multiline)
    }

    pub fn dot_matches_new_line(&self) -> bool {
        self.flags.contains(&PatternFlag::DotMatchesNewLine)
    }
}

/// A named, versioned collection of rules, as parsed from a pack document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternPack {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub patterns: Vec<PackPattern>,
}

impl PatternPack {
    /// Parses and validates a pack from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, VeilError> {
        let pack: PatternPack = serde_yml::from_str(text).map_err(|e| {
            VeilError::PatternPackInvalid("<unparsed>".to_string(), e.to_string())
        })?;
        pack.validate()?;
        Ok(pack)
    }

    /// Loads and validates a pack from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, VeilError> {
        let path = path.as_ref();
        info!("Loading pattern pack from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern pack {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Resolves a pack name against the search path: an explicit directory
    /// first (`<dir>/<name>.yaml`, then `.yml`), builtin packs second.
    pub fn load(name: &str, pack_dir: Option<&Path>) -> Result<Self, VeilError> {
        if let Some(dir) = pack_dir {
            for ext in ["yaml", "yml"] {
                let candidate = dir.join(format!("{name}.{ext}"));
                if candidate.is_file() {
                    return Self::load_from_file(&candidate);
                }
            }
        }
        match BUILTIN_PACKS.get(name) {
            Some(text) => {
                debug!("Loading builtin pattern pack '{name}'");
                Self::from_yaml_str(text)
            }
            None => Err(VeilError::PatternPackInvalid(
                name.to_string(),
                "not found in the pack search path".to_string(),
            )),
        }
    }

    /// Names of the packs embedded in the crate.
    pub fn builtin_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN_PACKS.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Validates pack integrity: label shape and uniqueness, tier range,
    /// tag shapes, pattern lengths, and validator token resolution. Errors
    /// are accumulated so authors see every problem at once.
    pub fn validate(&self) -> Result<(), VeilError> {
        let mut errors = Vec::new();
        let mut seen_labels = HashSet::new();

        if self.name.trim().is_empty() {
            errors.push("pack has an empty `name` field".to_string());
        }
        if self.version.trim().is_empty() {
            errors.push("pack has an empty `version` field".to_string());
        }

        for rule in &self.patterns {
            if !LABEL_SHAPE.is_match(&rule.label) {
                errors.push(format!(
                    "label '{}' is not an uppercase identifier",
                    rule.label
                ));
            }
            if !seen_labels.insert(rule.label.as_str()) {
                errors.push(format!("duplicate label '{}'", rule.label));
            }
            if rule.patterns.is_empty() {
                errors.push(format!("rule '{}' has no patterns", rule.label));
            }
            for pattern in &rule.patterns {
                if pattern.is_empty() {
                    errors.push(format!("rule '{}' has an empty pattern", rule.label));
                }
                if pattern.len() > MAX_PATTERN_LENGTH {
                    errors.push(format!(
                        "rule '{}': pattern length ({}) exceeds maximum allowed ({})",
                        rule.label,
                        pattern.len(),
                        MAX_PATTERN_LENGTH
                    ));
                }
            }
            if rule.tier != 1 && rule.tier != 2 {
                errors.push(format!(
                    "rule '{}': tier must be 1 or 2, got {}",
                    rule.label, rule.tier
                ));
            }
            if let Some(language) = &rule.language {
                if language.len() != 2 || !language.chars().all(|c| c.is_ascii_lowercase()) {
                    errors.push(format!(
                        "rule '{}': language '{}' is not an ISO 639-1 tag",
                        rule.label, language
                    ));
                }
            }
            if let Some(country) = &rule.country {
                if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
                    errors.push(format!(
                        "rule '{}': country '{}' is not an ISO 3166-1 alpha-2 tag",
                        rule.label, country
                    ));
                }
            }
            if let Some(validator) = &rule.validator {
                if validators::resolve(validator).is_none() {
                    return Err(VeilError::ValidatorUnknown {
                        pack: self.name.clone(),
                        label: rule.label.clone(),
                        validator: validator.clone(),
                    });
                }
            }
            for unknown in rule.extra.keys() {
                warn!(
                    "Pack '{}', rule '{}': ignoring unknown field '{}'",
                    self.name, rule.label, unknown
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(VeilError::PatternPackInvalid(
                self.name.clone(),
                errors.join("; "),
            ))
        }
    }
}
