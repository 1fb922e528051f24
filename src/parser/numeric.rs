//! Legacy numeric normalisation for Fortran-written fields
//!
//! W2 writes numbers with Fortran edit descriptors, which produces text that
//! a strict float parser rejects or misreads:
//!
//! - `-.1000` and `.5`, where the leading zero is dropped
//! - `1.234-05`, where the exponent letter is dropped to fit the width
//! - `1.0D+03`, a double-precision exponent
//!
//! All of these are rewritten into standard notation before parsing.

use crate::models::RawValue;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static MISSING_EXPONENT_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))([+-]\d+)$")
        .unwrap_or_else(|e| panic!("exponent pattern is invalid: {e}"))
});

static DOUBLE_EXPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))[dD]([+-]?\d+)$")
        .unwrap_or_else(|e| panic!("exponent pattern is invalid: {e}"))
});

/// Rewrite a legacy numeric field into a form `f64::from_str` accepts
pub fn normalize_legacy(raw: &str) -> Cow<'_, str> {
    let text = raw.trim();

    // A bare dot has no digits to pad and must stay unparsable.
    let fraction = |rest: &str| rest.starts_with(|c: char| c.is_ascii_digit());
    let text: Cow<'_, str> = match text.strip_prefix("-.") {
        Some(rest) if fraction(rest) => Cow::Owned(format!("-0.{rest}")),
        _ => match text.strip_prefix("+.").or_else(|| text.strip_prefix('.')) {
            Some(rest) if fraction(rest) => Cow::Owned(format!("0.{rest}")),
            _ => Cow::Borrowed(text),
        },
    };

    if let Some(caps) = DOUBLE_EXPONENT.captures(&text) {
        return Cow::Owned(format!("{}E{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = MISSING_EXPONENT_LETTER.captures(&text) {
        return Cow::Owned(format!("{}E{}", &caps[1], &caps[2]));
    }
    text
}

/// Parse a legacy numeric string to a finite value
pub fn parse_number(raw: &str) -> Option<f64> {
    normalize_legacy(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse one data field; blank fields are missing, unparsable ones are
/// returned as the trimmed raw text
pub fn parse_field(raw: &str) -> Result<RawValue, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(RawValue::Missing);
    }
    parse_number(trimmed)
        .map(RawValue::Number)
        .ok_or_else(|| trimmed.to_string())
}
