// File: veil-core/src/validators.rs
//! Named validator hooks for specific sensitive data types.
//!
//! Pattern packs attach a validator by token (e.g. `luhn`); the registry
//! resolves the token to a function at load time, so an unknown name fails
//! pack loading rather than a later sanitize call. A hook receives the
//! matched substring and returns pass/fail.
//!
//! License: MIT OR APACHE 2.0

use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::HashSet;

/// A validator hook: matched substring in, verdict out.
pub type ValidatorFn = fn(&str) -> bool;

/// Resolves a validator token to its hook. `None` means the token is unknown
/// and the pack referencing it must fail to load.
pub fn resolve(name: &str) -> Option<ValidatorFn> {
    match name {
        "luhn" => Some(luhn),
        "us_ssn" => Some(us_ssn),
        "uk_nino" => Some(uk_nino),
        _ => None,
    }
}

/// Validates a card-like number with the Luhn checksum.
///
/// Non-digit separators (spaces, dashes) are stripped before the checksum is
/// applied, so the hook accepts matches in any of the grouped formats the
/// card patterns emit.
pub fn luhn(candidate: &str) -> bool {
    let digits: String = candidate.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let mut sum = 0u32;
    let mut alternate = false;
    for c in digits.chars().rev() {
        let Some(mut digit) = c.to_digit(10) else { return false; };
        if alternate {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        alternate = !alternate;
    }
    sum % 10 == 0
}

/// Validates a US Social Security Number in the "XXX-XX-XXXX" format against
/// the Social Security Administration's structural rules.
pub fn us_ssn(candidate: &str) -> bool {
    let mut parts = candidate.split('-');
    let (Some(area), Some(group), Some(serial), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    if area.len() != 3 || group.len() != 2 || serial.len() != 4 {
        return false;
    }

    let Ok(area_num) = area.parse::<u16>() else { return false; };
    let Ok(group_num) = group.parse::<u8>() else { return false; };
    let Ok(serial_num) = serial.parse::<u16>() else { return false; };

    let invalid_area = area_num == 0 || area_num == 666 || area_num >= 900;
    let invalid_group = group_num == 0;
    let invalid_serial = serial_num == 0;

    !(invalid_area || invalid_group || invalid_serial)
}

static INVALID_NINO_PREFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["BF", "BG", "EH", "GB", "JE", "NK", "KN", "LI", "NT", "TN", "ZZ"])
});

static INVALID_NINO_PREFIX_CHARS: Lazy<HashSet<char>> =
    Lazy::new(|| HashSet::from(['D', 'F', 'I', 'Q', 'U', 'V', 'O']));

static VALID_NINO_SUFFIX_CHARS: Lazy<HashSet<char>> =
    Lazy::new(|| HashSet::from(['A', 'B', 'C', 'D']));

/// Validates a UK National Insurance Number against HMRC structural rules.
///
/// Accepts the spaced "AA 12 34 56 A" and compact "AA123456A" forms.
pub fn uk_nino(candidate: &str) -> bool {
    const NINO_LENGTH: usize = 9;

    let normalized: Cow<str> = if candidate.chars().any(|c| c.is_ascii_lowercase()) {
        Cow::Owned(candidate.to_uppercase())
    } else {
        Cow::Borrowed(candidate)
    };
    let compact: String = normalized.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.len() != NINO_LENGTH {
        return false;
    }

    let mut chars = compact.chars();
    let (Some(first), Some(second)) = (chars.next(), chars.next()) else { return false; };
    if !first.is_ascii_alphabetic() || !second.is_ascii_alphabetic() {
        return false;
    }
    if INVALID_NINO_PREFIXES.contains(&compact[0..2]) {
        return false;
    }
    if INVALID_NINO_PREFIX_CHARS.contains(&first) || INVALID_NINO_PREFIX_CHARS.contains(&second) {
        return false;
    }
    if !chars.by_ref().take(6).all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Some(suffix) = chars.next() else { return false; };
    if !VALID_NINO_SUFFIX_CHARS.contains(&suffix) {
        return false;
    }
    chars.next().is_none()
}
