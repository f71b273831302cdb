//! Fast numeric parsing for `-?\d+\.\d` byte ranges.
//!
//! The hot-path parser assumes the grammar holds and does not validate;
//! the aggregator guarantees it only ever sees complete value fields. A
//! validating variant is kept for diagnostics and tests.

use crate::error::TallyError;
use crate::stats::Tenths;

/// Parse a value known to match `-?\d+\.\d` into tenths.
///
/// The fractional digit comes from the last byte; the integer part is
/// accumulated right to left from the digit before the decimal point,
/// stopping at a leading `-`. Correct for any magnitude that fits an `i64`.
#[inline]
pub fn parse_tenths(bytes: &[u8]) -> Tenths {
    debug_assert!(bytes.len() >= 3 && bytes[bytes.len() - 2] == b'.');
    let frac = (bytes[bytes.len() - 1] - b'0') as i64;
    let mut whole = 0i64;
    let mut place = 1i64;
    for &b in bytes[..bytes.len() - 2].iter().rev() {
        if b == b'-' {
            return Tenths(-(whole * 10 + frac));
        }
        whole += (b - b'0') as i64 * place;
        place *= 10;
    }
    Tenths(whole * 10 + frac)
}

/// Validating variant of [`parse_tenths`].
///
/// Rejects anything outside `-?\d+\.\d` and values that overflow the
/// storage type.
pub fn parse_tenths_checked(bytes: &[u8]) -> Result<Tenths, TallyError> {
    let malformed = || {
        TallyError::InternalInvariantViolated(format!(
            "malformed value field: {:?}",
            String::from_utf8_lossy(bytes)
        ))
    };

    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(_) => (false, bytes),
        None => return Err(malformed()),
    };
    if digits.len() < 3 || digits[digits.len() - 2] != b'.' {
        return Err(malformed());
    }
    let frac = digits[digits.len() - 1];
    if !frac.is_ascii_digit() {
        return Err(malformed());
    }

    let mut whole = 0i64;
    for &b in &digits[..digits.len() - 2] {
        if !b.is_ascii_digit() {
            return Err(malformed());
        }
        whole = whole
            .checked_mul(10)
            .and_then(|w| w.checked_add((b - b'0') as i64))
            .ok_or_else(malformed)?;
    }
    let tenths = whole
        .checked_mul(10)
        .and_then(|w| w.checked_add((frac - b'0') as i64))
        .ok_or_else(malformed)?;

    Ok(Tenths(if negative { -tenths } else { tenths }))
}
