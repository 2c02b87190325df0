//! Price and quantity normalization
//!
//! Every amount the oracle compares comes from DOM text such as `"Rs. 1,000"`
//! or `"  2 "`. This module is the only place that text becomes a number.
//!
//! # Separator convention
//!
//! - `.` is the decimal separator.
//! - `,` is a thousands separator and is discarded.
//! - Everything before the first digit is currency decoration and is ignored,
//!   so the dot in a `"Rs."` prefix never reads as a decimal point.
//! - After the first digit only digits and `.` are retained; a trailing `.`
//!   is dropped. More than one remaining `.` is an error, never a guess.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};

/// Decimal places prices are compared at unless configured otherwise
pub const DEFAULT_PRECISION: u32 = 2;

static NOT_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").expect("static regex"));

/// Parse a displayed amount into a fixed-precision decimal
pub fn normalize_amount(raw: &str) -> Result<Decimal> {
    let fail = |reason: &str| Error::Normalization {
        input: raw.to_string(),
        reason: reason.to_string(),
    };

    let start = raw
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| fail("no digits"))?;
    let retained = NOT_AMOUNT.replace_all(&raw[start..], "");
    let retained = retained.trim_end_matches('.');

    if retained.matches('.').count() > 1 {
        return Err(fail("more than one decimal separator"));
    }

    retained
        .parse::<Decimal>()
        .map_err(|e| fail(&e.to_string()))
}

/// Parse a displayed quantity; it must be a non-negative whole number
pub fn normalize_quantity(raw: &str) -> Result<u32> {
    let amount = normalize_amount(raw)?;
    if !amount.fract().is_zero() {
        return Err(Error::Normalization {
            input: raw.to_string(),
            reason: "quantity is not a whole number".into(),
        });
    }
    amount.to_u32().ok_or_else(|| Error::Normalization {
        input: raw.to_string(),
        reason: "quantity out of range".into(),
    })
}

/// Round half away from zero, the way shop totals are displayed
pub fn round_price(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// `|expected - observed| <= epsilon`
pub fn within(expected: Decimal, observed: Decimal, epsilon: Decimal) -> bool {
    (expected - observed).abs() <= epsilon
}
