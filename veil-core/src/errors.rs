//! errors.rs - Custom error types for the veil-core library.
//!
//! This module defines the structured error enum for the library, plus the
//! non-fatal warning type that sanitize calls carry on their outcome instead
//! of failing.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// This enum represents all possible error types in the `veil-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions. This prevents them from
/// matching all variants exhaustively, thus avoiding breaking changes.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VeilError {
    /// The input exceeded the configured `max_input_characters` cap.
    /// A failed call never returns partially masked output.
    #[error("input of {len} characters exceeds the configured maximum of {max}")]
    InputTooLarge { len: usize, max: usize },

    /// A configuration document was rejected: unknown option, out-of-range
    /// value, or an unloadable pack list. Fatal at initialization, never at
    /// call time.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A pattern pack failed schema validation or regex compilation. Any
    /// failing pack fails the whole load.
    #[error("pattern pack '{0}' is invalid: {1}")]
    PatternPackInvalid(String, String),

    /// A pack referenced a validator hook that is not registered.
    #[error("pattern pack '{pack}' rule '{label}' references unknown validator '{validator}'")]
    ValidatorUnknown {
        pack: String,
        label: String,
        validator: String,
    },

    /// The entity recognizer could not be consulted. Sanitize calls degrade
    /// to regex-only and surface this as a warning; the error form exists for
    /// callers that require the recognizer.
    #[error("entity recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    /// A format parser could not handle the input and no fallback applied.
    /// During sanitization the markup and structured parsers fall back to
    /// plain text instead, recording a [`SanitizeWarning::ParserFallback`].
    #[error("parser fallback: {0}")]
    ParserFallback(String),

    /// A structured input nested deeper than the traversal cap.
    #[error("structured input exceeds maximum nesting depth of {max_depth}")]
    MaxDepthExceeded { max_depth: usize },

    /// No rehydration map is stored under the requested session id.
    #[error("no session found with id '{0}'")]
    SessionNotFound(String),

    #[error("an unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("a critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}

/// Non-fatal conditions recorded against a successful sanitize call.
///
/// Warnings never change the success of the call; they describe degradations
/// the pipeline applied (regex-only mode, parser fallback) so callers can
/// decide whether the result is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SanitizeWarning {
    /// The recognizer was requested but absent or failing; the call ran
    /// regex-only.
    RecognizerUnavailable(String),
    /// The selected parser could not handle the input and the plain parser
    /// was used instead.
    ParserFallback(String),
}

impl std::fmt::Display for SanitizeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanitizeWarning::RecognizerUnavailable(detail) => {
                write!(f, "recognizer unavailable, continuing regex-only: {detail}")
            }
            SanitizeWarning::ParserFallback(detail) => {
                write!(f, "parser fell back to plain text: {detail}")
            }
        }
    }
}
