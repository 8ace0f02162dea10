//! Fixed-point amount type with 18 decimals of precision.
//!
//! Every collateral amount, debt amount, price and ratio in the engine is a `Wad`.
//! Products go through a 256-bit intermediate and division truncates toward zero.

use primitive_types::U256;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scale of a `Wad`: `1.0` is stored as `10^18`.
pub const DECIMAL_PRECISION: u128 = 1_000_000_000_000_000_000;

const HALF_PRECISION: u128 = DECIMAL_PRECISION / 2;
const PRECISION_DIGITS: u32 = 18;

/// Exponent cap for [`Wad::dec_pow`]: 1000 years of minutes.
pub const MAX_DEC_POW_EXPONENT: u64 = 525_600_000;

/// Unsigned 18-decimal fixed-point number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(u128);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WadParseError {
    #[error("invalid decimal: {0}")]
    Invalid(String),
    #[error("negative amounts are not representable")]
    Negative,
    #[error("more than 18 decimal places")]
    TooPrecise,
    #[error("amount out of range")]
    Overflow,
}

impl Wad {
    pub const ZERO: Wad = Wad(0);
    pub const ONE: Wad = Wad(DECIMAL_PRECISION);
    pub const MAX: Wad = Wad(u128::MAX);

    /// Wrap a raw, already-scaled integer.
    pub const fn from_raw(raw: u128) -> Self {
        Wad(raw)
    }

    /// Whole units, e.g. `Wad::from_units(200)` is `200.0`.
    pub const fn from_units(units: u64) -> Self {
        Wad(units as u128 * DECIMAL_PRECISION)
    }

    /// `numerator / denominator` as a fixed-point fraction, e.g. `(11, 10)` is `1.1`.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Self {
        Self::mul_div_raw(
            numerator as u128,
            DECIMAL_PRECISION,
            denominator as u128,
        )
    }

    /// Parse a decimal string losslessly.
    ///
    /// # Errors
    /// Rejects malformed, negative, over-precise and out-of-range input.
    pub fn from_str_canonical(s: &str) -> Result<Self, WadParseError> {
        let parsed = RustDecimal::from_str(s.trim())
            .map_err(|e| WadParseError::Invalid(e.to_string()))?;
        if parsed.is_sign_negative() && !parsed.is_zero() {
            return Err(WadParseError::Negative);
        }
        let normalized = parsed.normalize();
        let scale = normalized.scale();
        if scale > PRECISION_DIGITS {
            return Err(WadParseError::TooPrecise);
        }
        let mantissa = normalized.mantissa().unsigned_abs();
        10u128
            .checked_pow(PRECISION_DIGITS - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .map(Wad)
            .ok_or(WadParseError::Overflow)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let whole = self.0 / DECIMAL_PRECISION;
        let frac = self.0 % DECIMAL_PRECISION;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:018}", frac);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Wad) -> Option<Wad> {
        self.0.checked_add(rhs.0).map(Wad)
    }

    pub fn checked_sub(self, rhs: Wad) -> Option<Wad> {
        self.0.checked_sub(rhs.0).map(Wad)
    }

    pub fn saturating_add(self, rhs: Wad) -> Wad {
        Wad(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Wad) -> Wad {
        Wad(self.0.saturating_sub(rhs.0))
    }

    /// Fixed-point product, truncated. Saturates at `Wad::MAX`.
    pub fn mul(self, rhs: Wad) -> Wad {
        Self::mul_div_raw(self.0, rhs.0, DECIMAL_PRECISION)
    }

    /// Fixed-point quotient, truncated. Division by zero yields `Wad::MAX`.
    pub fn div(self, rhs: Wad) -> Wad {
        if rhs.is_zero() {
            return Wad::MAX;
        }
        Self::mul_div_raw(self.0, DECIMAL_PRECISION, rhs.0)
    }

    /// `self * numerator / denominator` with a 256-bit intermediate.
    pub fn mul_div(self, numerator: Wad, denominator: Wad) -> Wad {
        if denominator.is_zero() {
            return Wad::MAX;
        }
        Self::mul_div_raw(self.0, numerator.0, denominator.0)
    }

    /// Raise a fraction to an integer power, rounding half-up after every step.
    ///
    /// Used for time-based decay; `n` is capped at [`MAX_DEC_POW_EXPONENT`].
    pub fn dec_pow(self, n: u64) -> Wad {
        let mut n = n.min(MAX_DEC_POW_EXPONENT);
        if n == 0 {
            return Wad::ONE;
        }
        let mut y = Wad::ONE;
        let mut x = self;
        while n > 1 {
            if n % 2 == 0 {
                x = x.dec_mul(x);
                n /= 2;
            } else {
                y = x.dec_mul(y);
                x = x.dec_mul(x);
                n = (n - 1) / 2;
            }
        }
        x.dec_mul(y)
    }

    fn dec_mul(self, rhs: Wad) -> Wad {
        let product = U256::from(self.0) * U256::from(rhs.0) + U256::from(HALF_PRECISION);
        Self::narrow(product / U256::from(DECIMAL_PRECISION))
    }

    fn mul_div_raw(a: u128, b: u128, d: u128) -> Wad {
        Self::narrow(U256::from(a) * U256::from(b) / U256::from(d))
    }

    fn narrow(value: U256) -> Wad {
        if value > U256::from(u128::MAX) {
            Wad::MAX
        } else {
            Wad(value.low_u128())
        }
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Wad {
    type Err = WadParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl Serialize for Wad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Wad {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Wad::from_str_canonical(&s).map_err(serde::de::Error::custom)
    }
}

impl std::ops::Add for Wad {
    type Output = Wad;

    fn add(self, rhs: Wad) -> Wad {
        self.checked_add(rhs).expect("wad addition overflowed")
    }
}

impl std::ops::Sub for Wad {
    type Output = Wad;

    fn sub(self, rhs: Wad) -> Wad {
        self.checked_sub(rhs).expect("wad subtraction underflowed")
    }
}

impl std::ops::AddAssign for Wad {
    fn add_assign(&mut self, rhs: Wad) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Wad {
    fn sub_assign(&mut self, rhs: Wad) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Wad {
    fn sum<I: Iterator<Item = Wad>>(iter: I) -> Wad {
        iter.fold(Wad::ZERO, |acc, w| acc + w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Wad {
        Wad::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_scales_to_eighteen_decimals() {
        assert_eq!(w("1").raw(), DECIMAL_PRECISION);
        assert_eq!(w("1.1").raw(), 1_100_000_000_000_000_000);
        assert_eq!(w("0.005").raw(), 5_000_000_000_000_000);
        assert_eq!(w("2000").raw(), 2_000 * DECIMAL_PRECISION);
        assert_eq!(w("1.500000000000000000000").raw(), 1_500_000_000_000_000_000);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Wad::from_str_canonical("-1"), Err(WadParseError::Negative));
        assert_eq!(
            Wad::from_str_canonical("0.0000000000000000001"),
            Err(WadParseError::TooPrecise)
        );
        assert!(matches!(
            Wad::from_str_canonical("abc"),
            Err(WadParseError::Invalid(_))
        ));
    }

    #[test]
    fn test_canonical_string_trims_zeros() {
        assert_eq!(w("2000").to_canonical_string(), "2000");
        assert_eq!(w("1.10").to_canonical_string(), "1.1");
        assert_eq!(Wad::from_raw(1).to_canonical_string(), "0.000000000000000001");
        assert_eq!(Wad::ZERO.to_string(), "0");
    }

    #[test]
    fn test_mul_and_div_truncate() {
        assert_eq!(w("2").mul(w("2000")), w("4000"));
        assert_eq!(w("1").div(w("3")).raw(), 333_333_333_333_333_333);
        assert_eq!(w("4000").div(w("2210")), Wad::from_raw(1_809_954_751_131_221_719));
    }

    #[test]
    fn test_division_by_zero_is_max() {
        assert_eq!(w("1").div(Wad::ZERO), Wad::MAX);
        assert_eq!(w("1").mul_div(w("1"), Wad::ZERO), Wad::MAX);
    }

    #[test]
    fn test_large_products_do_not_overflow() {
        // 10^9 units at a price of 10^6 would overflow a plain u128 product.
        let coll = Wad::from_units(1_000_000_000);
        let price = Wad::from_units(1_000_000);
        assert_eq!(coll.mul(price), Wad::from_units(1_000_000_000_000_000));
    }

    #[test]
    fn test_dec_pow() {
        assert_eq!(w("0.5").dec_pow(0), Wad::ONE);
        assert_eq!(w("0.5").dec_pow(1), w("0.5"));
        assert_eq!(w("0.5").dec_pow(3), w("0.125"));
        assert_eq!(Wad::ONE.dec_pow(u64::MAX), Wad::ONE);
    }

    #[test]
    fn test_from_ratio() {
        assert_eq!(Wad::from_ratio(11, 10), w("1.1"));
        assert_eq!(Wad::from_ratio(1, 200), w("0.005"));
    }

    #[test]
    fn test_json_roundtrip_as_string() {
        let json = serde_json::to_value(w("123.456")).unwrap();
        assert_eq!(json, serde_json::json!("123.456"));
        let back: Wad = serde_json::from_value(json).unwrap();
        assert_eq!(back, w("123.456"));
    }

    #[test]
    fn test_ordering() {
        assert!(w("1.1") < w("1.5"));
        assert!(Wad::MAX > w("1000000000"));
    }
}
