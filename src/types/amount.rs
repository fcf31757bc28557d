use alloy::primitives::{U256, utils::format_units};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Converts a raw on-chain amount into whole token units.
///
/// Returns `None` if the amount does not fit into a [`Decimal`].
pub fn to_decimal_units(amount: U256, decimals: u8) -> Option<Decimal> {
    let formatted = format_units(amount, decimals).ok()?;
    Decimal::from_str(&formatted).ok()
}

/// Returns the USD value of a raw amount given the token decimals and its USD price.
pub fn usd_value(amount: U256, decimals: u8, price: Decimal) -> Option<Decimal> {
    to_decimal_units(amount, decimals)?.checked_mul(price)
}

/// Returns `ratio` of a raw amount, rounded down. The ratio is clamped to `[0, 1]`.
pub fn scale_amount(amount: U256, ratio: Decimal) -> U256 {
    let ratio = ratio.clamp(Decimal::ZERO, Decimal::ONE);
    let numerator = U256::from(ratio.mantissa().unsigned_abs());
    let denominator = U256::from(10u64).pow(U256::from(ratio.scale()));
    match amount.checked_mul(numerator) {
        Some(scaled) => scaled / denominator,
        None => amount / denominator * numerator,
    }
}
