//! Decimal Text Codec
//!
//! Converts between the textual form stored in the key-value store and
//! [`Decimal`] values.
//!
//! ## Accepted Input
//!
//! ```text
//! [+|-] ( digits [ . [digits] ] | . digits ) [ (e|E) [+|-] digits ]
//! ```
//!
//! No surrounding whitespace is accepted, and neither are the special
//! literals (`NaN`, `Inf`, ...). Inputs longer than the context's
//! `max_literal_len` are rejected before they are scanned.
//!
//! ## Output
//!
//! Values are written in canonical scientific notation with a lower-case
//! `e`: `10.75`, `0.00012`, `1.2e+3`, `1e-7`. Formatting then parsing gives
//! back the identical value, coefficient and exponent included.

use super::context::{self, Context, Status};
use super::error::{DecimalError, DecimalResult};
use super::number::Decimal;
use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Exponent literals are saturated at this magnitude while scanning. Any
/// value this far out is already an overflow or an underflow to zero.
const EXPONENT_LIMIT: i64 = 1 << 40;

/// Parses `text` under the process-wide context and rescales the result to
/// `fractional_digits` digits after the point when that is non-zero.
pub fn parse(text: impl AsRef<[u8]>, fractional_digits: i64) -> DecimalResult<Decimal> {
    let mut status = Status::default();
    let result = parse_in(text.as_ref(), fractional_digits, context::current(), &mut status);
    if !status.is_empty() {
        trace!(?status, "Decimal conversion status");
    }
    result
}

/// Parses `text` under `ctx`, recording conditions in `status`.
pub fn parse_in(
    text: &[u8],
    fractional_digits: i64,
    ctx: &Context,
    status: &mut Status,
) -> DecimalResult<Decimal> {
    if text.len() > ctx.max_literal_len {
        status.insert(Status::CONVERSION_SYNTAX);
        return Err(DecimalError::LiteralTooLong {
            len: text.len(),
            max: ctx.max_literal_len,
        });
    }

    let Some(literal) = scan(text) else {
        status.insert(Status::CONVERSION_SYNTAX);
        return Err(DecimalError::Conversion);
    };

    let coefficient = BigUint::parse_bytes(&literal.digits, 10).ok_or_else(|| {
        status.insert(Status::CONVERSION_SYNTAX);
        DecimalError::Conversion
    })?;
    let exponent = literal.exponent - literal.fraction_len as i64;

    let value = Decimal::from_parts(literal.negative, coefficient, exponent).finalize(ctx, status)?;
    if fractional_digits == 0 {
        Ok(value)
    } else {
        rescale_in(&value, fractional_digits, ctx, status)
    }
}

/// Formats a value in canonical scientific notation.
pub fn format(value: &Decimal) -> String {
    let digits = value.coefficient().to_string();
    let exponent = value.exponent();
    let adjusted = value.adjusted();

    let mut out = String::with_capacity(digits.len() + 8);
    if value.is_negative() {
        out.push('-');
    }

    if exponent <= 0 && adjusted >= -6 {
        if exponent == 0 {
            out.push_str(&digits);
        } else {
            // Digits left of the point; zero or negative means "0.000ddd".
            let point = digits.len() as i64 + exponent;
            if point > 0 {
                let (int, frac) = digits.split_at(point as usize);
                out.push_str(int);
                out.push('.');
                out.push_str(frac);
            } else {
                out.push_str("0.");
                out.extend(std::iter::repeat('0').take(point.unsigned_abs() as usize));
                out.push_str(&digits);
            }
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push_str(&std::format!("{:+}", adjusted));
    }

    out
}

/// Re-expresses `value` with exactly `fractional_digits` digits after the
/// point under the process-wide context.
///
/// Extra digits are truncated toward zero and missing digits are filled with
/// zeros. Negative counts rescale to a multiple of a power of ten.
pub fn rescale(value: &Decimal, fractional_digits: i64) -> DecimalResult<Decimal> {
    let mut status = Status::default();
    let result = rescale_in(value, fractional_digits, context::current(), &mut status);
    if !status.is_empty() {
        trace!(?status, fractional_digits, "Decimal rescale status");
    }
    result
}

/// Same as [`rescale`], under an explicit context.
pub fn rescale_in(
    value: &Decimal,
    fractional_digits: i64,
    ctx: &Context,
    status: &mut Status,
) -> DecimalResult<Decimal> {
    let invalid = DecimalError::InvalidRescale {
        digits: fractional_digits,
    };
    let target = fractional_digits.checked_neg().ok_or_else(|| invalid.clone())?;
    value.with_exponent(target, ctx, status).ok_or(invalid)
}

/// The pieces of a syntactically valid literal.
struct Literal {
    negative: bool,
    /// Integer and fraction digits, concatenated
    digits: Vec<u8>,
    fraction_len: usize,
    /// Value of the exponent part, saturated at `EXPONENT_LIMIT`
    exponent: i64,
}

fn scan(text: &[u8]) -> Option<Literal> {
    let mut pos = 0;

    let negative = match text.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let int_start = pos;
    while pos < text.len() && text[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut digits = text[int_start..pos].to_vec();

    let mut fraction_len = 0;
    if text.get(pos) == Some(&b'.') {
        pos += 1;
        let frac_start = pos;
        while pos < text.len() && text[pos].is_ascii_digit() {
            pos += 1;
        }
        fraction_len = pos - frac_start;
        digits.extend_from_slice(&text[frac_start..pos]);
    }

    if digits.is_empty() {
        return None;
    }

    let mut exponent: i64 = 0;
    if matches!(text.get(pos), Some(b'e') | Some(b'E')) {
        pos += 1;
        let exp_negative = match text.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let exp_start = pos;
        while pos < text.len() && text[pos].is_ascii_digit() {
            exponent = (exponent * 10 + i64::from(text[pos] - b'0')).min(EXPONENT_LIMIT);
            pos += 1;
        }
        if pos == exp_start {
            return None;
        }
        if exp_negative {
            exponent = -exponent;
        }
    }

    if pos != text.len() {
        return None;
    }

    Some(Literal {
        negative,
        digits,
        fraction_len,
        exponent,
    })
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self))
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(text: &str) -> String {
        format(&parse(text, 0).unwrap())
    }

    #[test]
    fn test_plain_notation() {
        assert_eq!(roundtrip("10.75"), "10.75");
        assert_eq!(roundtrip("0.00012"), "0.00012");
        assert_eq!(roundtrip("-0"), "-0");
        assert_eq!(roundtrip("+7"), "7");
        assert_eq!(roundtrip(".5"), "0.5");
        assert_eq!(roundtrip("5."), "5");
        assert_eq!(roundtrip("1.50"), "1.50");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(roundtrip("1E3"), "1e+3");
        assert_eq!(roundtrip("12e2"), "1.2e+3");
        assert_eq!(roundtrip("0.0000001"), "1e-7");
        assert_eq!(roundtrip("-1.5e-10"), "-1.5e-10");
        assert_eq!(roundtrip("0e5"), "0e+5");
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "", "+", "-", ".", "1e", "1e+", " 1", "1 ", "abc", "1.2.3", "--1", "1e5.5", "0x10",
            "NaN", "sNaN", "Inf", "Infinity", "-inf",
        ] {
            assert_eq!(parse(text, 0), Err(DecimalError::Conversion), "input {:?}", text);
        }
    }

    #[test]
    fn test_literal_too_long() {
        let text = "1".repeat(4097);
        assert_eq!(
            parse(&text, 0),
            Err(DecimalError::LiteralTooLong { len: 4097, max: 4096 })
        );
        assert!(parse("1".repeat(4096), 0).is_ok());
    }

    #[test]
    fn test_truncates_to_precision() {
        let value = parse("1234567890123456789012345678901234567", 0).unwrap();
        assert_eq!(value.digits(), 34);
        assert_eq!(format(&value), "1.234567890123456789012345678901234e+36");

        let negative = parse("-0.99999999999999999999999999999999999", 0).unwrap();
        assert_eq!(format(&negative), "-0.9999999999999999999999999999999999");
    }

    #[test]
    fn test_parse_with_rescale() {
        assert_eq!(format(&parse("1.005", 2).unwrap()), "1.00");
        assert_eq!(format(&parse("0.123456789", 2).unwrap()), "0.12");
        assert_eq!(format(&parse("-1.999", 1).unwrap()), "-1.9");
        assert_eq!(format(&parse("3", 4).unwrap()), "3.0000");
    }

    #[test]
    fn test_negative_fractional_digits() {
        assert_eq!(format(&parse("1234", -2).unwrap()), "1.2e+3");
        assert_eq!(format(&parse("0", -2).unwrap()), "0e+2");
    }

    #[test]
    fn test_invalid_rescale() {
        assert_eq!(parse("1", 40), Err(DecimalError::InvalidRescale { digits: 40 }));
        assert_eq!(
            parse("1", i64::MIN),
            Err(DecimalError::InvalidRescale { digits: i64::MIN })
        );
        assert_eq!(
            parse("1", -7000),
            Err(DecimalError::InvalidRescale { digits: -7000 })
        );
    }

    #[test]
    fn test_exponent_extremes() {
        assert_eq!(parse("1e99999999999999999999", 0), Err(DecimalError::Overflow));

        let tiny = parse("1e-99999999999999999999", 0).unwrap();
        assert!(tiny.is_zero());
        assert_eq!(tiny.exponent(), -6176);
    }

    #[test]
    fn test_status_reports_rounding() {
        let ctx = Context::decimal128();
        let mut status = Status::default();
        parse_in(b"1.0000000000000000000000000000000001", 0, &ctx, &mut status).unwrap();
        assert!(status.contains(Status::INEXACT | Status::ROUNDED));

        let mut status = Status::default();
        assert!(parse_in(b"x", 0, &ctx, &mut status).is_err());
        assert!(status.contains(Status::CONVERSION_SYNTAX));
    }

    #[test]
    fn test_from_str_and_display() {
        let value: Decimal = "42.50".parse().unwrap();
        assert_eq!(value.to_string(), "42.50");
    }

    fn finite_decimal() -> impl Strategy<Value = Decimal> {
        (any::<bool>(), any::<u64>(), -6176i64..=6111).prop_map(|(negative, coefficient, exponent)| {
            Decimal::from_parts(negative, BigUint::from(coefficient), exponent)
        })
    }

    proptest! {
        #[test]
        fn prop_format_parse_roundtrip(value in finite_decimal()) {
            let text = format(&value);
            prop_assert_eq!(parse(&text, 0), Ok(value));
        }

        #[test]
        fn prop_rescale_idempotent(value in finite_decimal(), digits in -20i64..40) {
            if let Ok(once) = rescale(&value, digits) {
                prop_assert_eq!(rescale(&once, digits), Ok(once.clone()));
                prop_assert_eq!(once.exponent(), -digits);
            }
        }
    }
}
