//! Configuration management for `veil-core`.
//!
//! This module defines the sanitizer configuration struct, its defaults, and
//! the YAML loading path. Schema validation rejects unknown top-level keys
//! and out-of-range numeric values at load time; a bound configuration is
//! never invalid at call time.
//!
//! License: MIT OR Apache-2.0

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::errors::VeilError;

/// Default ceiling on input size, in characters.
pub const DEFAULT_MAX_INPUT_CHARACTERS: usize = 50_000;

/// Default lower bound on recognizer confidence. Regex spans ignore this.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.85;

/// Parser selection override. `Auto` inspects the input: structured trees go
/// to the structured parser, text whose first non-whitespace character is `<`
/// (with a closing `>` present) goes to the markup parser, everything else is
/// plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    #[default]
    Auto,
    Text,
    Structured,
    Markup,
}

/// The recognized sanitizer options.
///
/// The orchestrator owns its configuration exclusively; defaults are explicit
/// values here, not module state. Loading from a document rejects unknown
/// keys so that a typo never silently disables masking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizeConfig {
    /// Which packs the registry loads; order determines priority on ties.
    pub pattern_packs: Vec<String>,
    /// If true, the entity recognizer is never consulted.
    pub regex_only: bool,
    /// Lower bound on recognizer confidence, in `[0, 1]`.
    pub min_confidence: f64,
    /// If true, spans failing their validator hook are dropped; if false they
    /// are kept but demoted to tier 2.
    pub strict_validation: bool,
    /// Exact substrings that must never be masked.
    pub whitelist: HashSet<String>,
    /// If non-empty, only spans with these labels are masked.
    pub mask_types: HashSet<String>,
    /// Opening bracket of every placeholder.
    pub placeholder_prefix: String,
    /// Closing bracket of every placeholder.
    pub placeholder_suffix: String,
    /// Hard cap on input size; exceeding it fails the call.
    pub max_input_characters: usize,
    /// Parser selection override.
    pub format_hint: FormatHint,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            pattern_packs: vec!["default".to_string()],
            regex_only: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            strict_validation: true,
            whitelist: HashSet::new(),
            mask_types: HashSet::new(),
            placeholder_prefix: "<<".to_string(),
            placeholder_suffix: ">>".to_string(),
            max_input_characters: DEFAULT_MAX_INPUT_CHARACTERS,
            format_hint: FormatHint::Auto,
        }
    }
}

impl SanitizeConfig {
    /// Parses a configuration document from YAML text.
    ///
    /// Unknown top-level keys are an error, as are out-of-range values.
    pub fn from_yaml_str(text: &str) -> Result<Self, VeilError> {
        let config: SanitizeConfig = serde_yml::from_str(text)
            .map_err(|e| VeilError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration document from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, VeilError> {
        let path = path.as_ref();
        info!("Loading sanitizer configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Checks numeric ranges and structural requirements.
    pub fn validate(&self) -> Result<(), VeilError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(VeilError::ConfigInvalid(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_input_characters == 0 {
            return Err(VeilError::ConfigInvalid(
                "max_input_characters must be greater than 0".to_string(),
            ));
        }
        if self.placeholder_prefix.is_empty() || self.placeholder_suffix.is_empty() {
            return Err(VeilError::ConfigInvalid(
                "placeholder_prefix and placeholder_suffix must be non-empty".to_string(),
            ));
        }
        if self.pattern_packs.is_empty() {
            return Err(VeilError::ConfigInvalid(
                "pattern_packs must name at least one pack".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SanitizeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pattern_packs, vec!["default"]);
        assert_eq!(config.placeholder_prefix, "<<");
        assert_eq!(config.placeholder_suffix, ">>");
        assert!(config.strict_validation);
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = r#"
regex_only: true
whitelist: ["support@company.com"]
max_input_characters: 1000
"#;
        let config = SanitizeConfig::from_yaml_str(yaml).unwrap();
        assert!(config.regex_only);
        assert!(config.whitelist.contains("support@company.com"));
        assert_eq!(config.max_input_characters, 1000);
        // Unspecified options keep their defaults.
        assert_eq!(config.min_confidence, DEFAULT_MIN_CONFIDENCE);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = SanitizeConfig::from_yaml_str("regex_onli: true").unwrap_err();
        assert!(matches!(err, VeilError::ConfigInvalid(_)));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = SanitizeConfig::from_yaml_str("min_confidence: 1.5").unwrap_err();
        assert!(matches!(err, VeilError::ConfigInvalid(_)));
    }

    #[test]
    fn format_hint_parses_lowercase() {
        let config = SanitizeConfig::from_yaml_str("format_hint: markup").unwrap();
        assert_eq!(config.format_hint, FormatHint::Markup);
    }
}
