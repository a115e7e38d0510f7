//! Decimal normalization and exact amount helpers
//!
//! Raw on-chain amounts are `u128` in a token's native precision. Cross-chain
//! messages carry amounts in canonical precision ([`MAX_DECIMALS`]).
//! Normalizing down truncates: the bridge must never mint more than was locked.
//!
//! Human-facing amounts (fees, send/receive amounts) are exact [`BigDecimal`]s.

use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use std::cmp::Ordering;

use crate::error::{RouteError, RouteResult};

/// Canonical cross-chain precision
pub const MAX_DECIMALS: u8 = 8;

/// Largest power of ten representable in a u128
const MAX_U128_POW10: u8 = 38;

fn pow10(exp: u8) -> RouteResult<u128> {
    10u128
        .checked_pow(exp as u32)
        .ok_or_else(|| RouteError::arithmetic(format!("10^{} overflows u128", exp)))
}

/// Convert a raw amount between two precisions.
///
/// Scaling down truncates toward zero; scaling up is exact or fails on overflow.
pub fn rescale(amount: u128, from_decimals: u8, to_decimals: u8) -> RouteResult<u128> {
    match from_decimals.cmp(&to_decimals) {
        Ordering::Equal => Ok(amount),
        Ordering::Greater => {
            let diff = from_decimals - to_decimals;
            if diff > MAX_U128_POW10 {
                return Ok(0);
            }
            Ok(amount / pow10(diff)?)
        }
        Ordering::Less => {
            let factor = pow10(to_decimals - from_decimals)?;
            amount.checked_mul(factor).ok_or_else(|| {
                RouteError::arithmetic(format!(
                    "{} scaled from {} to {} decimals overflows",
                    amount, from_decimals, to_decimals
                ))
            })
        }
    }
}

/// Source precision to canonical precision (truncating)
pub fn normalize(amount: u128, source_decimals: u8, canonical_decimals: u8) -> RouteResult<u128> {
    rescale(amount, source_decimals, canonical_decimals)
}

/// Canonical precision back to a chain's precision.
///
/// Exact inverse of [`normalize`] when the source had at most canonical
/// precision; when re-expanding a truncated value the dropped digits stay lost.
pub fn denormalize(amount: u128, target_decimals: u8, canonical_decimals: u8) -> RouteResult<u128> {
    rescale(amount, canonical_decimals, target_decimals)
}

/// Raw units to a human amount
pub fn to_decimal_amount(raw: u128, decimals: u8) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw), decimals as i64)
}

/// Human amount to raw units.
///
/// Rejects negative amounts and amounts with more fractional digits than
/// `decimals` can hold.
pub fn parse_units(amount: &BigDecimal, decimals: u8) -> RouteResult<u128> {
    if *amount < BigDecimal::zero() {
        return Err(RouteError::arithmetic(format!("negative amount {}", amount)));
    }

    let (digits, scale) = amount.as_bigint_and_exponent();
    let shifted = BigDecimal::new(digits, scale - decimals as i64);
    let whole = shifted.with_scale(0);
    if whole != shifted {
        return Err(RouteError::arithmetic(format!(
            "{} has more than {} fractional digits",
            format_amount(amount, u8::MAX),
            decimals
        )));
    }

    let (raw, _) = whole.into_bigint_and_exponent();
    raw.to_u128()
        .ok_or_else(|| RouteError::arithmetic("amount does not fit in u128"))
}

/// Round half-up to `places` fractional digits
pub fn round_to(amount: &BigDecimal, places: u8) -> BigDecimal {
    let half = BigDecimal::new(BigInt::from(5), places as i64 + 1);
    let biased = if *amount < BigDecimal::zero() {
        amount - half
    } else {
        amount + half
    };
    biased.with_scale(places as i64)
}

/// Plain decimal string truncated to `places` fractional digits, trailing
/// zeros removed.
pub fn format_amount(amount: &BigDecimal, places: u8) -> String {
    let (digits, scale) = amount.as_bigint_and_exponent();
    let places = scale.clamp(0, places as i64);
    let truncated = BigDecimal::new(digits, scale).with_scale(places);
    let (digits, scale) = truncated.into_bigint_and_exponent();

    let mut text = digits.magnitude().to_string();
    let scale = scale.max(0) as usize;
    if scale > 0 {
        if text.len() <= scale {
            text = format!("{}{}", "0".repeat(scale - text.len() + 1), text);
        }
        text.insert(text.len() - scale, '.');
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        text = trimmed.to_string();
    }

    if digits.sign() == Sign::Minus && text != "0" {
        format!("-{}", text)
    } else {
        text
    }
}
