//! Decimal precision helpers for exchange-bound quantities
//!
//! Exchanges express quantity and price increments as decimal steps
//! (`lotSz = "0.0001"`, `tickSz = "0.1"`). Every size or price that goes on
//! the wire must be an exact multiple of its step and is rendered without
//! trailing zeros.
//!
//! ## Critical Rules
//!
//! 1. **Round quantities down**: never size above what the target notional
//!    pays for; [`floor_to_step`] truncates toward zero.
//! 2. **Step scale is authoritative**: the result carries exactly as many
//!    fractional digits as the step, so `size * 10^d` is an integer.
//! 3. **No exponent notation on the wire**: [`format_decimal`] strips
//!    trailing zeros and nothing else.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits in a step, ignoring trailing zeros
/// (`0.00010` has 4).
pub fn decimal_places(step: Decimal) -> u32 {
    step.normalize().scale()
}

/// Round `quantity` down to the nearest multiple of `step`.
///
/// The result is rescaled to the step's fractional-digit count. A
/// non-positive step leaves the quantity unchanged.
pub fn floor_to_step(quantity: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return quantity;
    }
    let places = decimal_places(step);
    let mut floored = ((quantity / step).floor() * step)
        .round_dp_with_strategy(places, RoundingStrategy::ToZero);
    floored.rescale(places);
    floored
}

/// Round `price` to the nearest multiple of `step` (half away from zero).
pub fn round_to_step(price: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return price;
    }
    let places = decimal_places(step);
    let mut rounded = ((price / step)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        * step)
        .round_dp(places);
    rounded.rescale(places);
    rounded
}

/// Render a decimal for the wire: trailing zeros stripped, no exponent.
pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Convert a candle price into a decimal. `None` for NaN or infinities.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(dec!(0.0001)), 4);
        assert_eq!(decimal_places(dec!(0.00010)), 4);
        assert_eq!(decimal_places(dec!(1)), 0);
        assert_eq!(decimal_places(dec!(10)), 0);
    }

    #[test]
    fn test_floor_to_step() {
        assert_eq!(floor_to_step(dec!(0.003), dec!(0.0001)), dec!(0.0030));
        assert_eq!(floor_to_step(dec!(0.003), dec!(0.0001)).scale(), 4);
        assert_eq!(floor_to_step(dec!(0.12349), dec!(0.001)), dec!(0.123));
        assert_eq!(floor_to_step(dec!(7.9), dec!(1)), dec!(7));
        assert_eq!(floor_to_step(dec!(0.37), dec!(0.05)), dec!(0.35));
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(dec!(50250.06), dec!(0.1)), dec!(50250.1));
        assert_eq!(round_to_step(dec!(49750.04), dec!(0.1)), dec!(49750.0));
    }

    #[test]
    fn test_format_strips_trailing_zeros() {
        assert_eq!(format_decimal(dec!(0.0030)), "0.003");
        assert_eq!(format_decimal(dec!(150.00)), "150");
        assert_eq!(format_decimal(dec!(50250.10)), "50250.1");
        assert_eq!(format_decimal(Decimal::ZERO), "0");
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(2.5), Some(dec!(2.5)));
        assert_eq!(to_decimal(f64::NAN), None);
    }
}
