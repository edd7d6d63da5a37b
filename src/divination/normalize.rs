//! Digit-sum normalization of user supplied numbers.
//!
//! `"1234.9"` → truncate → `1234` → `1+2+3+4` → `10`. Sums of 10000 or more
//! are summed again until they fall below the bound.

use std::borrow::Cow;

use crate::error::OracleError;

/// Digit sums at or above this value are reduced again.
pub const REDUCE_BOUND: u64 = 10_000;

/// Parse a form value as a finite floating-point number.
///
/// Underscores are accepted as digit separators when they sit between two
/// digits (`1_000`).
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let cleaned = strip_digit_separators(trimmed)?;
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn strip_digit_separators(s: &str) -> Option<Cow<'_, str>> {
    if !s.contains('_') {
        return Some(Cow::Borrowed(s));
    }
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 1).copied();
        let between_digits = before.is_some_and(|c| c.is_ascii_digit())
            && after.is_some_and(|c| c.is_ascii_digit());
        if !between_digits {
            return None;
        }
    }
    Some(Cow::Owned(s.replace('_', "")))
}

/// Sum of the decimal digits of `n`.
pub fn digit_sum(mut n: u64) -> u64 {
    let mut total = 0;
    while n > 0 {
        total += n % 10;
        n /= 10;
    }
    total
}

/// Repeat digit-summing until the value drops below [`REDUCE_BOUND`].
pub fn reduce_below_bound(mut total: u64) -> u64 {
    while total >= REDUCE_BOUND {
        total = digit_sum(total);
    }
    total
}

/// Normalize an already parsed value.
///
/// The fractional part is truncated toward zero and the sign dropped. The
/// digits are taken from the exact decimal expansion of the truncated
/// value, so inputs wider than `u64` are handled too.
pub fn normalize_value(value: f64) -> u64 {
    let integral = format!("{:.0}", value.trunc().abs());
    let total = integral
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(u64::from)
        .sum();
    reduce_below_bound(total)
}

/// Normalize a raw form value, naming `field` in the error.
pub fn normalize_field(field: &str, raw: &str) -> Result<u64, OracleError> {
    match parse_number(raw) {
        Some(value) => Ok(normalize_value(value)),
        None => {
            log::debug!("rejecting non-numeric {}: {:?}", field, raw);
            Err(OracleError::invalid_input(field, raw))
        }
    }
}

/// Normalize a raw value that is not tied to a named field.
pub fn normalize(raw: &str) -> Result<u64, OracleError> {
    normalize_field("value", raw)
}
