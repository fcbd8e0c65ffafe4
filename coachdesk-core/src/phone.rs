//! Chilean mobile phone numbers
//!
//! Input is coerced toward `+569XXXXXXXX` with a couple of prefix heuristics,
//! then validated strictly. Anything the heuristics can't fix is rejected,
//! never corrected further.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Human-readable format shown next to phone inputs
pub const PHONE_FORMAT: &str = "+569XXXXXXXX";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+569\d{8}$").expect("phone pattern is valid"));

/// Coerce free-form input toward `+569` followed by 8 digits.
///
/// - `569...` gets a leading `+`
/// - `9...` gets a leading `+56`
/// - anything else, including input already starting with `+`, is kept
pub fn normalize_phone(input: &str) -> String {
    let value = input.trim();
    if value.is_empty() || value.starts_with('+') {
        return value.to_string();
    }
    if value.starts_with("569") {
        format!("+{}", value)
    } else if value.starts_with('9') {
        format!("+56{}", value)
    } else {
        value.to_string()
    }
}

/// Strict check against `^\+569\d{8}$`
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Normalize and validate in one step, returning the stored form
pub fn validate_phone(input: &str) -> Result<String> {
    let phone = normalize_phone(input);
    if is_valid_phone(&phone) {
        Ok(phone)
    } else {
        Err(Error::InvalidPhone)
    }
}
