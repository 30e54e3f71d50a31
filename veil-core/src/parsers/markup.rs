//! Marked-up text extraction and reconstruction.
//!
//! The scanner emits one fragment per text run between tags, plus one per
//! recognized attribute value, each carrying its byte range in the original
//! input. Reconstruction applies replacements in descending offset order so
//! earlier ranges stay valid. Tag boundaries and attribute names are never
//! rewritten.
//!
//! Inputs the scanner cannot make sense of (unterminated tags, quotes, or
//! comments) raise [`VeilError::ParserFallback`]; the orchestrator then
//! retries with the plain parser and records the degradation.
//!
//! License: MIT OR Apache-2.0

use crate::errors::VeilError;
use crate::parsers::{Fragment, Locator};

/// Attribute names whose values are treated as maskable text.
pub const RECOGNIZED_ATTRIBUTES: [&str; 4] = ["alt", "title", "value", "placeholder"];

pub fn parse(input: &str) -> Result<Vec<Fragment>, VeilError> {
    let bytes = input.as_bytes();
    let mut fragments = Vec::new();
    let mut pos = 0usize;
    let mut run_start = 0usize;

    while pos < bytes.len() {
        if bytes[pos] == b'<' {
            push_text_run(input, run_start, pos, &mut fragments);
            if input[pos..].starts_with("<!--") {
                match input[pos..].find("-->") {
                    Some(rel) => pos += rel + 3,
                    None => return Err(fallback("unterminated comment")),
                }
            } else {
                let tag_end = scan_tag(bytes, pos)?;
                collect_attribute_values(input, pos + 1, tag_end, &mut fragments);
                pos = tag_end + 1;
            }
            run_start = pos;
        } else {
            pos += 1;
        }
    }
    push_text_run(input, run_start, bytes.len(), &mut fragments);
    Ok(fragments)
}

/// Applies one replacement per fragment, highest offset first.
pub fn reconstruct(
    input: &str,
    fragments: &[Fragment],
    replacements: &[String],
) -> Result<String, VeilError> {
    let mut pairs: Vec<(&Fragment, &String)> = fragments.iter().zip(replacements).collect();
    pairs.sort_by(|a, b| {
        let sa = match a.0.locator {
            Locator::Offsets { start, .. } => start,
            _ => 0,
        };
        let sb = match b.0.locator {
            Locator::Offsets { start, .. } => start,
            _ => 0,
        };
        sb.cmp(&sa)
    });

    let mut out = input.to_string();
    for (fragment, replacement) in pairs {
        let Locator::Offsets { start, end } = fragment.locator else {
            return Err(fallback("markup fragment without an offset locator"));
        };
        out.replace_range(start..end, replacement);
    }
    Ok(out)
}

fn fallback(reason: &str) -> VeilError {
    VeilError::ParserFallback(reason.to_string())
}

fn push_text_run(input: &str, start: usize, end: usize, out: &mut Vec<Fragment>) {
    if start >= end {
        return;
    }
    let run = &input[start..end];
    if run.chars().any(|c| !c.is_whitespace()) {
        out.push(Fragment {
            text: run.to_string(),
            locator: Locator::Offsets { start, end },
        });
    }
}

/// Finds the `>` closing the tag opened at `lt_pos`, honoring quoted
/// attribute values that may contain `>`.
fn scan_tag(bytes: &[u8], lt_pos: usize) -> Result<usize, VeilError> {
    let mut quote: Option<u8> = None;
    let mut i = lt_pos + 1;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') => quote = Some(b'"'),
            (None, b'\'') => quote = Some(b'\''),
            (None, b'>') => return Ok(i),
            (None, _) => {}
        }
        i += 1;
    }
    Err(fallback(if quote.is_some() {
        "unterminated attribute value"
    } else {
        "unterminated tag"
    }))
}

/// Scans the tag interior `[start, end)` and emits a fragment for every
/// recognized attribute whose value is non-empty.
fn collect_attribute_values(input: &str, start: usize, end: usize, out: &mut Vec<Fragment>) {
    let bytes = input.as_bytes();
    let mut i = start;

    // Skip markers and the tag name itself.
    while i < end && (bytes[i] == b'/' || bytes[i] == b'!' || bytes[i] == b'?') {
        i += 1;
    }
    while i < end && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    while i < end {
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name_start = i;
        while i < end && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            i += 1;
            continue;
        }
        let name = input[name_start..i].to_ascii_lowercase();

        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= end || bytes[i] != b'=' {
            continue; // boolean attribute, no value to mask
        }
        i += 1;
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= end {
            break;
        }

        let quote = bytes[i];
        let (value_start, value_end) = if quote == b'"' || quote == b'\'' {
            i += 1;
            let value_start = i;
            while i < end && bytes[i] != quote {
                i += 1;
            }
            let value_end = i;
            if i < end {
                i += 1;
            }
            (value_start, value_end)
        } else {
            let value_start = i;
            while i < end && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            (value_start, i)
        };

        if RECOGNIZED_ATTRIBUTES.contains(&name.as_str()) {
            push_text_run(input, value_start, value_end, out);
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}
