//! compiler.rs - Compiles pattern packs into the shared rule table.
//!
//! The [`PatternRegistry`] is the immutable detection kernel: every regex of
//! every loaded pack compiled once, stored in a stable order (pack load
//! order, then order within the pack), and safely shareable by many
//! concurrent sanitize calls behind an `Arc`. Compilation failure of any
//! pattern in any pack fails the whole load.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use regex::RegexBuilder;
use std::collections::BTreeSet;
use std::path::Path;

use crate::errors::VeilError;
use crate::packs::{PackPattern, PatternPack};
use crate::validators::{self, ValidatorFn};

/// Upper bound on a single compiled regex, to keep pathological patterns
/// from ballooning memory at load time.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A single compiled detection rule.
#[derive(Clone)]
pub struct CompiledRule {
    /// The canonical label this rule emits, e.g. `EMAIL`.
    pub label: String,
    /// Name of the pack this rule came from.
    pub pack: String,
    /// The compiled regular expression.
    pub regex: regex::Regex,
    /// Confidence class: 1 structural, 2 heuristic.
    pub tier: u8,
    /// Resolved validator hook, with its token for diagnostics.
    pub validator: Option<(String, ValidatorFn)>,
    /// Global load order, used as the final tie-break during conflict
    /// resolution.
    pub priority: usize,
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("label", &self.label)
            .field("pack", &self.pack)
            .field("regex", &self.regex.as_str())
            .field("tier", &self.tier)
            .field("validator", &self.validator.as_ref().map(|(name, _)| name))
            .field("priority", &self.priority)
            .finish()
    }
}

/// The compiled, immutable rule table shared by all sanitize calls.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    rules: Vec<CompiledRule>,
}

impl PatternRegistry {
    /// Resolves each pack name against the search path, validates, and
    /// compiles everything. Rule order is deterministic: packs in the order
    /// given, rules in document order, patterns in rule order.
    pub fn load<S: AsRef<str>>(pack_names: &[S], pack_dir: Option<&Path>) -> Result<Self, VeilError> {
        let mut packs = Vec::with_capacity(pack_names.len());
        for name in pack_names {
            packs.push(PatternPack::load(name.as_ref(), pack_dir)?);
        }
        Self::from_packs(&packs)
    }

    /// Compiles already-parsed packs into a registry.
    pub fn from_packs(packs: &[PatternPack]) -> Result<Self, VeilError> {
        let mut rules = Vec::new();
        for pack in packs {
            pack.validate()?;
            let mut compile_errors = Vec::new();
            for rule in &pack.patterns {
                compile_rule(pack, rule, &mut rules, &mut compile_errors);
            }
            if !compile_errors.is_empty() {
                return Err(VeilError::PatternPackInvalid(
                    pack.name.clone(),
                    compile_errors.join("; "),
                ));
            }
        }
        debug!("Compiled {} rules from {} packs", rules.len(), packs.len());
        Ok(Self { rules })
    }

    /// The compiled rules, in stable load order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// The union of labels carried by loaded rules.
    pub fn labels(&self) -> BTreeSet<&str> {
        self.rules.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(
    pack: &PatternPack,
    rule: &PackPattern,
    out: &mut Vec<CompiledRule>,
    errors: &mut Vec<String>,
) {
    // Validation already checked the token; resolution here cannot miss.
    let validator = rule
        .validator
        .as_deref()
        .and_then(|token| validators::resolve(token).map(|hook| (token.to_string(), hook)));

    for pattern in &rule.patterns {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(rule.is_case_insensitive())
            .multi_line(rule.is_multiline())
            .dot_matches_new_line(rule.dot_matches_new_line())
            .size_limit(REGEX_SIZE_LIMIT)
            .build();
        match compiled {
            Ok(regex) => {
                let priority = out.len();
                out.push(CompiledRule {
                    label: rule.label.clone(),
                    pack: pack.name.clone(),
                    regex,
                    tier: rule.tier,
                    validator: validator.clone(),
                    priority,
                });
            }
            Err(e) => {
                errors.push(format!("rule '{}': invalid regex: {}", rule.label, e));
            }
        }
    }
}
