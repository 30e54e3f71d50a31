//! masker.rs - Deterministic placeholder derivation and rehydration.
//!
//! Placeholders are content-addressed: a truncated SHA-256 digest of the
//! original substring plus a per-label ordinal assigned in first-appearance
//! order within the call. Identical `(label, original)` pairs collapse to
//! the same placeholder for the whole call; the emitted map's insertion
//! order matches first appearance, so its serialized form is stable and
//! diff-friendly.
//!
//! License: MIT OR APACHE 2.0

use log::warn;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::span::Span;

/// Truncation width of the placeholder digest. Part of the format contract:
/// `{prefix}{LABEL}_{HEX}_{ordinal}{suffix}` with this many hex characters.
pub const FINGERPRINT_WIDTH: usize = 6;

/// Widened digest used when two distinct originals of the same label collide
/// on the truncated digest within one call.
const FINGERPRINT_WIDTH_WIDE: usize = 10;

/// Uppercase hex digest of `text`, truncated to `width` characters. Stable
/// across runs for a given substring; exposed because the digest is part of
/// the placeholder wire shape.
pub fn content_fingerprint(text: &str, width: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hex::encode_upper(hasher.finalize());
    digest[..width.min(digest.len())].to_string()
}

/// One placeholder binding: the placeholder, the original substring it
/// stands for, and the label/ordinal it was derived from.
///
/// Maps deserialized from documents carry only the placeholder/original
/// association; label and ordinal are populated for maps produced by a
/// sanitize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RehydrationEntry {
    pub placeholder: String,
    pub original_text: String,
    pub label: String,
    pub ordinal: u32,
}

/// Ordered association of placeholders to original substrings.
///
/// Serializes as a key/value document in insertion order; `placeholder →
/// original` is a function, and within one sanitize call placeholders are
/// unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RehydrationMap {
    entries: Vec<RehydrationEntry>,
    index: HashMap<String, usize>,
}

impl RehydrationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The original substring a placeholder stands for.
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.index
            .get(placeholder)
            .map(|&i| self.entries[i].original_text.as_str())
    }

    /// Entries in insertion (first-appearance) order.
    pub fn entries(&self) -> &[RehydrationEntry] {
        &self.entries
    }

    /// Inserts a binding; the first binding of a placeholder wins.
    pub(crate) fn insert(&mut self, entry: RehydrationEntry) -> bool {
        if self.index.contains_key(&entry.placeholder) {
            return false;
        }
        self.index
            .insert(entry.placeholder.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Unions `other` into `self`. Conflicting rebinds keep the existing
    /// binding and are logged.
    pub fn merge(&mut self, other: &RehydrationMap) {
        for entry in &other.entries {
            if let Some(existing) = self.get(&entry.placeholder) {
                if existing != entry.original_text {
                    warn!(
                        "Conflicting rehydration binding for '{}'; keeping the first",
                        entry.placeholder
                    );
                }
                continue;
            }
            self.insert(entry.clone());
        }
    }

    /// Checks that every placeholder is bracketed by the given prefix and
    /// suffix. Serialized maps from older runs may use different brackets;
    /// callers should validate before mixing maps.
    pub fn is_well_formed(&self, prefix: &str, suffix: &str) -> bool {
        self.entries.iter().all(|e| {
            e.placeholder.starts_with(prefix)
                && e.placeholder.ends_with(suffix)
                && e.placeholder.len() > prefix.len() + suffix.len()
        })
    }
}

impl Serialize for RehydrationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.placeholder, &entry.original_text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RehydrationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = RehydrationMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of placeholder strings to original substrings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = RehydrationMap::new();
                while let Some((placeholder, original_text)) =
                    access.next_entry::<String, String>()?
                {
                    map.insert(RehydrationEntry {
                        placeholder,
                        original_text,
                        label: String::new(),
                        ordinal: 0,
                    });
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Per-call placeholder state: ordinal counters and assigned bindings.
#[derive(Debug)]
pub struct Masker {
    prefix: String,
    suffix: String,
    next_ordinal: HashMap<String, u32>,
    assigned: HashMap<(String, String), String>,
    claimed_digests: HashMap<(String, String), String>,
}

impl Masker {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            next_ordinal: HashMap::new(),
            assigned: HashMap::new(),
            claimed_digests: HashMap::new(),
        }
    }

    /// Rewrites one fragment, recording bindings into `map`.
    ///
    /// `spans` must be non-overlapping and in ascending start order (the
    /// detection engine guarantees both). Placeholders are assigned in
    /// ascending order so the map's insertion order follows first appearance
    /// in source byte order, then applied in descending start order so
    /// earlier offsets stay valid.
    pub fn mask_fragment(&mut self, text: &str, spans: &[Span], map: &mut RehydrationMap) -> String {
        if spans.is_empty() {
            return text.to_string();
        }
        debug_assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));

        let placeholders: Vec<String> = spans
            .iter()
            .map(|span| self.placeholder_for(&span.label, &span.text, map))
            .collect();

        let mut masked = text.to_string();
        for (span, placeholder) in spans.iter().zip(&placeholders).rev() {
            masked.replace_range(span.start..span.end, placeholder);
        }
        masked
    }

    fn placeholder_for(&mut self, label: &str, original: &str, map: &mut RehydrationMap) -> String {
        let key = (label.to_string(), original.to_string());
        if let Some(existing) = self.assigned.get(&key) {
            return existing.clone();
        }

        let mut digest = content_fingerprint(original, FINGERPRINT_WIDTH);
        match self
            .claimed_digests
            .entry((label.to_string(), digest.clone()))
        {
            Entry::Occupied(claimant) if claimant.get() != original => {
                // Truncated-digest collision within this call; widen.
                digest = content_fingerprint(original, FINGERPRINT_WIDTH_WIDE);
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(original.to_string());
            }
        }

        let counter = self.next_ordinal.entry(label.to_string()).or_insert(1);
        let ordinal = *counter;
        *counter += 1;

        let placeholder = format!(
            "{}{}_{}_{}{}",
            self.prefix, label, digest, ordinal, self.suffix
        );
        map.insert(RehydrationEntry {
            placeholder: placeholder.clone(),
            original_text: original.to_string(),
            label: label.to_string(),
            ordinal,
        });
        self.assigned.insert(key, placeholder.clone());
        placeholder
    }
}

/// Replaces placeholders in `text` with their originals, longest placeholder
/// first so no binding clobbers a longer one it prefixes. Placeholders
/// missing from the map are left intact.
pub fn rehydrate(text: &str, map: &RehydrationMap) -> String {
    let mut entries: Vec<&RehydrationEntry> = map.entries().iter().collect();
    entries.sort_by(|a, b| {
        b.placeholder
            .len()
            .cmp(&a.placeholder.len())
            .then_with(|| a.placeholder.cmp(&b.placeholder))
    });

    let mut out = text.to_string();
    for entry in entries {
        if out.contains(&entry.placeholder) {
            out = out.replace(&entry.placeholder, &entry.original_text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn span(label: &str, start: usize, end: usize, text: &str) -> Span {
        Span::from_rule(label, start, end, text, 1, 0)
    }

    #[test]
    fn fingerprint_is_stable_and_truncated() {
        let a = content_fingerprint("john.doe@example.com", FINGERPRINT_WIDTH);
        let b = content_fingerprint("john.doe@example.com", FINGERPRINT_WIDTH);
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_WIDTH);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn placeholder_shape_is_indexed() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let text = "mail a@b.co now";
        let masked = masker.mask_fragment(text, &[span("EMAIL", 5, 11, "a@b.co")], &mut map);
        let digest = content_fingerprint("a@b.co", FINGERPRINT_WIDTH);
        assert_eq!(masked, format!("mail <<EMAIL_{digest}_1>> now"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.entries()[0].ordinal, 1);
    }

    #[test]
    fn repeated_originals_collapse_to_one_placeholder() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let text = "a@b.co a@b.co";
        let spans = [
            span("EMAIL", 0, 6, "a@b.co"),
            span("EMAIL", 7, 13, "a@b.co"),
        ];
        let masked = masker.mask_fragment(text, &spans, &mut map);
        assert_eq!(map.len(), 1);
        let placeholder = &map.entries()[0].placeholder;
        assert_eq!(masked, format!("{placeholder} {placeholder}"));
    }

    #[test]
    fn distinct_originals_get_distinct_ordinals() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let text = "a@b.co c@d.org";
        let spans = [
            span("EMAIL", 0, 6, "a@b.co"),
            span("EMAIL", 7, 14, "c@d.org"),
        ];
        masker.mask_fragment(text, &spans, &mut map);
        assert_eq!(map.len(), 2);
        assert_eq!(map.entries()[0].ordinal, 1);
        assert_eq!(map.entries()[1].ordinal, 2);
        assert_ne!(map.entries()[0].placeholder, map.entries()[1].placeholder);
    }

    #[test]
    fn ordinal_counters_are_per_label() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let text = "a@b.co 555-123-4567";
        let spans = [
            span("EMAIL", 0, 6, "a@b.co"),
            span("PHONE", 7, 19, "555-123-4567"),
        ];
        masker.mask_fragment(text, &spans, &mut map);
        assert_eq!(map.entries()[0].ordinal, 1);
        assert_eq!(map.entries()[1].ordinal, 1);
    }

    #[test]
    fn ordinals_span_fragments() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        masker.mask_fragment("a@b.co", &[span("EMAIL", 0, 6, "a@b.co")], &mut map);
        masker.mask_fragment("c@d.org", &[span("EMAIL", 0, 7, "c@d.org")], &mut map);
        assert_eq!(map.entries()[1].ordinal, 2);
    }

    #[test]
    fn custom_brackets() {
        let mut masker = Masker::new("[[", "]]");
        let mut map = RehydrationMap::new();
        let masked = masker.mask_fragment("a@b.co", &[span("EMAIL", 0, 6, "a@b.co")], &mut map);
        assert!(masked.starts_with("[[EMAIL_"));
        assert!(masked.ends_with("_1]]"));
        assert!(map.is_well_formed("[[", "]]"));
        assert!(!map.is_well_formed("<<", ">>"));
    }

    #[test]
    fn rehydrate_round_trips() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let text = "mail a@b.co or a@b.co";
        let spans = [
            span("EMAIL", 5, 11, "a@b.co"),
            span("EMAIL", 15, 21, "a@b.co"),
        ];
        let masked = masker.mask_fragment(text, &spans, &mut map);
        assert_eq!(rehydrate(&masked, &map), text);
    }

    #[test]
    fn rehydrate_leaves_unknown_placeholders() {
        let map = RehydrationMap::new();
        assert_eq!(rehydrate("keep <<EMAIL_ABC123_1>>", &map), "keep <<EMAIL_ABC123_1>>");
    }

    #[test]
    fn rehydrate_is_idempotent() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let masked = masker.mask_fragment("a@b.co", &[span("EMAIL", 0, 6, "a@b.co")], &mut map);
        let once = rehydrate(&masked, &map);
        assert_eq!(rehydrate(&once, &map), once);
    }

    #[test]
    fn serialization_preserves_insertion_order() {
        let mut masker = Masker::new("<<", ">>");
        let mut map = RehydrationMap::new();
        let spans = [
            span("EMAIL", 0, 6, "a@b.co"),
            span("EMAIL", 7, 14, "c@d.org"),
        ];
        masker.mask_fragment("a@b.co c@d.org", &spans, &mut map);
        let json = serde_json::to_string(&map).unwrap();
        let first = json.find(&map.entries()[0].placeholder).unwrap();
        let second = json.find(&map.entries()[1].placeholder).unwrap();
        assert!(first < second);

        let parsed: RehydrationMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(&map.entries()[0].placeholder), Some("a@b.co"));
    }

    #[test]
    fn merge_keeps_first_binding() {
        let mut left = RehydrationMap::new();
        left.insert(RehydrationEntry {
            placeholder: "<<EMAIL_AAAAAA_1>>".to_string(),
            original_text: "a@b.co".to_string(),
            label: "EMAIL".to_string(),
            ordinal: 1,
        });
        let mut right = RehydrationMap::new();
        right.insert(RehydrationEntry {
            placeholder: "<<EMAIL_AAAAAA_1>>".to_string(),
            original_text: "other@b.co".to_string(),
            label: "EMAIL".to_string(),
            ordinal: 1,
        });
        right.insert(RehydrationEntry {
            placeholder: "<<PHONE_BBBBBB_1>>".to_string(),
            original_text: "555-123-4567".to_string(),
            label: "PHONE".to_string(),
            ordinal: 1,
        });
        left.merge(&right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get("<<EMAIL_AAAAAA_1>>"), Some("a@b.co"));
    }
}
