//! Decimal amount strings and their exact base-unit representation.
//!
//! Amounts typed by a user stay strings until a quote is needed. Scaling into base units never
//! goes through floating point so the amount sent to an aggregator is exactly the one typed.
use num_bigint::BigUint;

use crate::models::error::SwapError;

/// Whether `value` is acceptable interactive input: digits with at most one decimal point.
///
/// Signs, exponents, whitespace and letters are rejected. The empty string and a lone `"."`
/// are accepted, they are what a user has typed before a number is complete.
pub fn is_valid_decimal_input(value: &str) -> bool {
    let mut seen_point = false;
    for c in value.chars() {
        match c {
            '0'..='9' => {}
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    true
}

/// Number of digits after the decimal point in an already validated input.
pub fn fraction_digits(value: &str) -> usize {
    value
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

/// Whether a valid input denotes no amount at all (empty, a lone point or only zeros).
pub fn is_zero_input(value: &str) -> bool {
    value.chars().all(|c| c == '0' || c == '.')
}

/// Scales a decimal string into base units of a token with `decimals` fractional digits.
///
/// Empty input and `"."` scale to zero.
pub fn parse_units(value: &str, decimals: u32) -> Result<BigUint, SwapError> {
    if !is_valid_decimal_input(value) {
        return Err(SwapError::InvalidAmountInput(value.to_string()));
    }
    if fraction_digits(value) > decimals as usize {
        return Err(SwapError::InvalidAmountInput(format!(
            "{value} has more than {decimals} fractional digits"
        )));
    }

    let (integer, fraction) = value
        .split_once('.')
        .unwrap_or((value, ""));
    let mut digits = String::with_capacity(integer.len() + decimals as usize);
    digits.push_str(integer);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(decimals as usize - fraction.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(BigUint::from(0u32));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| SwapError::InvalidAmountInput(value.to_string()))
}

/// Formats base units as a decimal string without trailing zeros, `"0"` for zero.
pub fn format_units(amount: &BigUint, decimals: u32) -> String {
    let s = amount.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return s;
    }

    let padded =
        if s.len() <= decimals { format!("{s:0>width$}", width = decimals + 1) } else { s };
    let (integer_part, decimal_part) = padded.split_at(padded.len() - decimals);
    let trimmed = decimal_part.trim_end_matches('0');
    if trimmed.is_empty() {
        integer_part.to_string()
    } else {
        format!("{integer_part}.{trimmed}")
    }
}

/// Formats base units with exactly `precision` fractional digits, truncating the rest.
pub fn format_units_fixed(amount: &BigUint, decimals: u32, precision: u32) -> String {
    let truncated = if precision < decimals {
        amount / BigUint::from(10u32).pow(decimals - precision)
    } else {
        amount * BigUint::from(10u32).pow(precision - decimals)
    };
    if precision == 0 {
        return truncated.to_string();
    }

    let s = format!("{truncated:0>width$}", width = precision as usize + 1);
    let (integer_part, decimal_part) = s.split_at(s.len() - precision as usize);
    format!("{integer_part}.{decimal_part}")
}

/// Lossy conversion for display-only arithmetic such as exchange rates.
pub fn to_f64(amount: &BigUint, decimals: u32) -> f64 {
    format_units(amount, decimals)
        .parse()
        .unwrap_or(0.0)
}
