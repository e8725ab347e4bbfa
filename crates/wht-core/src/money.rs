//! # Fixed-Point Money and Rates
//!
//! [`Money`] holds an amount in integer cents. [`Rate`] holds a percentage in
//! hundredths of a percent (basis points of one percent): 5% is `500`, 0.65%
//! is `65`. Both parse from and format to decimal strings with exactly two
//! fractional digits and serialize that way, so no binary float is ever part
//! of a persisted amount.
//!
//! Retention amounts use [`Money::percent`], which truncates sub-cent
//! fractions toward zero: a withholding never exceeds its nominal rate. Fee
//! arithmetic uses [`div_round_half_up`] to round each step to the cent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Parse a decimal string into hundredths. Accepts an optional leading `-`
/// and at most two fractional digits.
fn parse_hundredths(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (int_str, frac_str) = body.split_once('.').unwrap_or((body, ""));
    if int_str.is_empty()
        || frac_str.len() > 2
        || !int_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let integer = int_str.parse::<i64>().ok()?;
    let frac = match frac_str.len() {
        0 => 0,
        1 => frac_str.parse::<i64>().ok()? * 10,
        _ => frac_str.parse::<i64>().ok()?,
    };

    // Overflow means the value is not representable; reject it rather than
    // returning a clamped figure.
    let magnitude = integer.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -magnitude } else { magnitude })
}

fn format_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Divide with rounding half away from zero.
///
/// `div_round_half_up(5, 2) == 3`, `div_round_half_up(-5, 2) == -3`.
/// The denominator must be positive.
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A monetary amount in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Create an amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create an amount from whole currency units.
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Parse a decimal string such as `"1234.56"`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] for empty strings, more than
    /// two fractional digits, or values that overflow.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        parse_hundredths(s)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidAmount(s.to_string()))
    }

    /// The amount in cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// `true` if the amount is below zero.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `rate` percent of this amount, truncated toward zero.
    pub fn percent(self, rate: Rate) -> Money {
        let product = i128::from(self.0) * i128::from(rate.bps());
        Money((product / 10_000) as i64)
    }

    /// `rate` percent of this amount, rounded half-up to the cent.
    pub fn percent_rounded(self, rate: Rate) -> Money {
        let product = i128::from(self.0) * i128::from(rate.bps());
        Money(div_round_half_up(product, 10_000) as i64)
    }

    /// The amount as a float in currency units. Only for compounding math
    /// whose result is immediately rounded back with [`Money::from_f64_rounded`].
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Round a float amount in currency units to the nearest cent.
    pub fn from_f64_rounded(value: f64) -> Money {
        Money((value * 100.0).round() as i64)
    }

    /// Subtraction that fails instead of wrapping.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Addition that fails instead of wrapping.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_hundredths(self.0))
    }
}

impl std::str::FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hundredths(self.0))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// A non-negative percentage in hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Rate(i64);

impl Rate {
    /// 0%.
    pub const ZERO: Rate = Rate(0);

    /// Create a rate from hundredths of a percent (`65` is 0.65%).
    pub const fn from_bps(bps: i64) -> Self {
        Self(bps)
    }

    /// Parse a percent string such as `"0.65"` or `"5"`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRate`] for negative values, more
    /// than two fractional digits, or unparseable input.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match parse_hundredths(s) {
            Some(v) if v >= 0 => Ok(Self(v)),
            _ => Err(ValidationError::InvalidRate(s.to_string())),
        }
    }

    /// Hundredths of a percent.
    pub const fn bps(self) -> i64 {
        self.0
    }

    /// `true` if the rate is above zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_hundredths(self.0))
    }
}

impl std::str::FromStr for Rate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hundredths(self.0))
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rate::parse(&raw).map_err(serde::de::Error::custom)
    }
}
