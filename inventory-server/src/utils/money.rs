//! Money calculation utilities using rust_decimal for precision
//!
//! Prices are stored as `f64`; every sum or product is computed in `Decimal`
//! and rounded to 2 places (half away from zero) before it goes back to storage.

use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation; `None` for NaN, infinities and
/// magnitudes outside the Decimal range
#[inline]
pub fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round a price to storage precision
#[inline]
pub fn round_price(value: f64) -> Option<f64> {
    to_decimal(value).map(to_f64)
}

/// Line total: unit price × quantity, `None` on overflow
pub fn line_total(price: f64, quantity: i64) -> Option<Decimal> {
    to_decimal(price)?.checked_mul(Decimal::from(quantity))
}

/// Order total: Σ(unit price × quantity), rounded for storage.
/// `None` when any line or the running sum overflows.
pub fn order_total<I>(lines: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, i64)>,
{
    let sum = lines
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (price, quantity)| {
            acc.checked_add(line_total(price, quantity)?)
        })?;
    Some(to_f64(sum))
}
