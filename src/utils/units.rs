use serde::Serializer;
use web3::types::U256;

use crate::error::SaleError;

pub const ETHER_DECIMALS: usize = 18;

/// Renders a fixed-point integer with `decimals` places, keeping at least one
/// fractional digit (`1000.0`, `0.25`). Zero decimals renders the bare integer.
pub fn format_units(value: U256, decimals: usize) -> String {
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };

    format!("{}.{}", whole, fraction)
}

pub fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS)
}

/// Parses a decimal ether amount into wei. Digits past the 18th fractional
/// place are truncated.
pub fn parse_ether(amount: &str) -> Result<U256, SaleError> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    let valid = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !valid(whole) || !valid(fraction) {
        return Err(SaleError::InvalidRate(format!("not a decimal amount: {:?}", amount)));
    }

    let mut fraction = fraction.chars().take(ETHER_DECIMALS).collect::<String>();
    while fraction.len() < ETHER_DECIMALS {
        fraction.push('0');
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let overflow = || SaleError::InvalidRate(format!("amount out of range: {}", amount));
    let whole = U256::from_dec_str(whole).map_err(|_| overflow())?;
    let fraction = U256::from_dec_str(&fraction).map_err(|_| overflow())?;

    whole
        .checked_mul(U256::exp10(ETHER_DECIMALS))
        .and_then(|wei| wei.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Lossy conversion through the decimal representation.
pub fn to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(f64::INFINITY)
}

/// `1 / rate` as a floating-point ether amount. The sale rate is read as
/// the reciprocal of the unit price.
pub fn reciprocal(rate: U256) -> Result<f64, SaleError> {
    if rate.is_zero() {
        return Err(SaleError::InvalidRate("rate is zero".to_string()));
    }
    Ok(1.0 / to_f64(rate))
}

/// Wei charged for one token: `parseEther(String(1 / rate))`.
///
/// Rates above 1e18 price a token below one wei, which would buy for free.
pub fn unit_price_wei(rate: U256) -> Result<U256, SaleError> {
    let price = reciprocal(rate)?;
    let wei = parse_ether(&format!("{}", price))?;
    if wei.is_zero() {
        return Err(SaleError::InvalidRate(format!("rate {} prices a token below one wei", rate)));
    }
    Ok(wei)
}

/// Serializes a `U256` as a decimal string rather than the default hex quantity.
pub fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
