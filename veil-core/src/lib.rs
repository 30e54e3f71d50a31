// veil-core/src/lib.rs
//! # Veil Core Library
//!
//! `veil-core` sanitizes free-form content so that sensitive personal
//! identifiers are replaced with stable, reversible placeholders before the
//! content is forwarded to an untrusted downstream processor, typically a
//! large language model. When the caller keeps the rehydration map, the
//! originals can be restored into the downstream response.
//!
//! ## Core Architecture
//!
//! * **Pattern Registry**: loads, validates and compiles pattern packs into
//!   an immutable, prioritized rule table shared by all calls.
//! * **Detection Engine**: runs the regex rules and (optionally) an entity
//!   recognizer, applies validator hooks and filters, and resolves
//!   overlapping candidates deterministically.
//! * **Format Parsers**: extract maskable fragments from plain text,
//!   structured key/value trees, and marked-up inputs, and rebuild the
//!   container afterwards.
//! * **Placeholder Engine**: derives content-addressed placeholders
//!   (`<<EMAIL_7A9B2C_1>>`) and emits the rehydration map.
//! * **Session Store**: optional key/value persistence of maps for
//!   session-keyed rehydration.
//!
//! ## Modules
//!
//! * `config`: the sanitizer options and their YAML document form.
//! * `packs`: pattern pack documents, schema validation, the search path.
//! * `compiler`: compilation of packs into the shared rule table.
//! * `validators`: named validation hooks (`luhn`, `us_ssn`, `uk_nino`).
//! * `detection`: the detection passes and conflict resolution.
//! * `parsers`: format-aware extraction and reconstruction.
//! * `masker`: placeholder derivation, rehydration maps, rehydration.
//! * `recognizer`: the entity recognizer seam and canonical labels.
//! * `sanitizer`: the end-to-end orchestrator.
//! * `store`: in-memory and on-disk session stores.
//! * `errors`: the error and warning surface.
//!
//! ## Usage Example
//!
//! ```rust
//! use veil_core::{sanitize, rehydrate, SanitizeConfig};
//!
//! fn main() -> Result<(), veil_core::VeilError> {
//!     let config = SanitizeConfig {
//!         regex_only: true,
//!         ..SanitizeConfig::default()
//!     };
//!     let original = "Write to alice@example.com today";
//!     let outcome = sanitize(original, Some(config))?;
//!
//!     let masked = outcome.output.as_text().expect("text in, text out");
//!     assert!(!masked.contains("alice@example.com"));
//!
//!     // The map reverses the substitution exactly.
//!     assert_eq!(rehydrate(masked, &outcome.map), original);
//!     Ok(())
//! }
//! ```
//!
//! ---
//! License: MIT OR APACHE 2.0

// Module declarations
pub mod compiler;
pub mod config;
pub mod detection;
pub mod errors;
pub mod masker;
pub mod packs;
pub mod parsers;
pub mod recognizer;
pub mod sanitizer;
pub mod span;
pub mod store;
pub mod validators;

// Re-exports
pub use compiler::{CompiledRule, PatternRegistry};
pub use config::{FormatHint, SanitizeConfig};
pub use detection::DetectionEngine;
pub use errors::{SanitizeWarning, VeilError};
pub use masker::{
    content_fingerprint,
    rehydrate,
    Masker,
    RehydrationEntry,
    RehydrationMap,
    FINGERPRINT_WIDTH,
};
pub use packs::{PackPattern, PatternFlag, PatternPack};
pub use parsers::{Document, Fragment, Locator, Parser, PathSeg};
pub use recognizer::{canonical_label, EntityRecognizer, NoopRecognizer, CANONICAL_RECOGNIZER_LABELS};
pub use sanitizer::{rehydrate_document, sanitize, SanitizeOutcome, Sanitizer};
pub use span::{Span, SpanSource};
pub use store::{rehydrate_from_store, DiskSessionStore, MemorySessionStore, SessionStore};
