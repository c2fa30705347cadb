//! Numeric helpers shared by the operation table and the orchestrator.
//!
//! Rounding goes through `rust_decimal::Decimal` with
//! `RoundingStrategy::MidpointNearestEven` so that a result is rounded on its
//! decimal value rather than by scaling the binary float.
//!
//! Floored division and modulus follow the sign-of-divisor convention:
//! `-7 mod 3 == 2` and `-7 floordiv 3 == -3`. Rust's `%` truncates, so the
//! remainder is corrected explicitly.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest scale `Decimal` can represent.
pub const MAX_PRECISION: u32 = 28;

/// Round `value` to `precision` decimal places.
///
/// Values too large for `Decimal` have no fractional part left to round and
/// are returned as-is. Values too small for `Decimal` round to a signed zero.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() || precision > MAX_PRECISION {
        return value;
    }
    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
            .to_f64()
            .unwrap_or(value),
        None if value.abs() < 1.0 => 0.0_f64.copysign(value),
        None => value,
    }
}

/// Remainder whose sign follows the divisor. `divisor` must be non-zero.
pub fn floored_mod(dividend: f64, divisor: f64) -> f64 {
    floored_divmod(dividend, divisor).1
}

/// Floor of `dividend / divisor`. `divisor` must be non-zero.
pub fn floor_div(dividend: f64, divisor: f64) -> f64 {
    floored_divmod(dividend, divisor).0
}

/// Quotient and remainder under floored division.
///
/// The quotient is derived from the exact `fmod` remainder instead of
/// `(a / b).floor()`, which can be off by one when `a / b` rounds up to an
/// integer.
fn floored_divmod(dividend: f64, divisor: f64) -> (f64, f64) {
    let mut rem = dividend % divisor;
    let mut div = (dividend - rem) / divisor;
    if rem != 0.0 {
        if (divisor < 0.0) != (rem < 0.0) {
            rem += divisor;
            div -= 1.0;
        }
    } else {
        rem = 0.0_f64.copysign(divisor);
    }

    let quotient = if div != 0.0 {
        let mut floor = div.floor();
        if div - floor > 0.5 {
            floor += 1.0;
        }
        floor
    } else {
        0.0_f64.copysign(dividend / divisor)
    };
    (quotient, rem)
}

/// `true` when `value` has no fractional part.
pub fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_ten_places() {
        assert_eq!(round_to(1.0 / 3.0, 10), 0.3333333333);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
        assert_eq!(round_to(256.0, 10), 256.0);
    }

    #[test]
    fn round_to_midpoint_is_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn round_to_leaves_huge_values_alone() {
        assert_eq!(round_to(1e300, 10), 1e300);
        assert_eq!(round_to(-1e300, 10), -1e300);
    }

    #[test]
    fn round_to_flushes_tiny_values() {
        assert_eq!(round_to(1e-300, 10), 0.0);
        assert_eq!(round_to(-1e-300, 10), 0.0);
    }

    #[test]
    fn floored_mod_follows_divisor_sign() {
        assert_eq!(floored_mod(7.0, 3.0), 1.0);
        assert_eq!(floored_mod(-7.0, 3.0), 2.0);
        assert_eq!(floored_mod(7.0, -3.0), -2.0);
        assert_eq!(floored_mod(-7.0, -3.0), -1.0);
        assert_eq!(floored_mod(5.5, 2.0), 1.5);
    }

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(7.0, 2.0), 3.0);
        assert_eq!(floor_div(-7.0, 2.0), -4.0);
        assert_eq!(floor_div(7.0, -2.0), -4.0);
        assert_eq!(floor_div(10.7, 3.2), 3.0);
        assert_eq!(floor_div(1.0, 0.1), 9.0);
    }

    #[test]
    fn integral_check() {
        assert!(is_integral(3.0));
        assert!(is_integral(-4.0));
        assert!(!is_integral(2.5));
        assert!(!is_integral(f64::NAN));
    }
}
