// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Basis points in a whole (100%).
pub const BPS_SCALE: u32 = 10_000;

/// Non-negative amount in minor currency units (cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    pub fn from_cents(cents: i64) -> Result<Self, ValidationError> {
        if cents < 0 {
            return Err(ValidationError(format!(
                "amount must not be negative, got {cents}"
            )));
        }
        Ok(Self(cents))
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parses `"12"`, `"12.3"` or `"12.34"`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        let invalid = || ValidationError(format!("invalid amount `{input}`"));
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.ends_with('.') {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<i64>().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Self)
            .ok_or_else(|| ValidationError(format!("amount `{input}` overflows")))
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| ValidationError("amount overflow".to_string()))
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, ValidationError> {
        match self.0.checked_sub(other.0) {
            Some(v) if v >= 0 => Ok(Self(v)),
            _ => Err(ValidationError("amount underflow".to_string())),
        }
    }

    pub fn checked_mul(self, quantity: u32) -> Result<Self, ValidationError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or_else(|| ValidationError("amount overflow".to_string()))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Money {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, ValidationError> {
        Self::from_cents(value)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|m| m.0).fold(0_i64, i64::saturating_add))
    }
}

/// Marketplace commission, in basis points of the line total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CommissionRate(u32);

impl Default for CommissionRate {
    fn default() -> Self {
        Self(1_000)
    }
}

impl CommissionRate {
    pub fn from_bps(bps: u32) -> Result<Self, ValidationError> {
        if bps > BPS_SCALE {
            return Err(ValidationError(format!(
                "commission rate must be within 0..={BPS_SCALE} bps, got {bps}"
            )));
        }
        Ok(Self(bps))
    }

    /// Accepts a fraction such as `0.10`; rounds to the nearest basis point.
    pub fn from_ratio(ratio: f64) -> Result<Self, ValidationError> {
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(ValidationError(format!(
                "commission rate must be within 0.0..=1.0, got {ratio}"
            )));
        }
        let bps = (ratio * f64::from(BPS_SCALE)).round() as u32;
        Self::from_bps(bps)
    }

    #[must_use]
    pub const fn bps(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_ratio(self) -> f64 {
        f64::from(self.0) / f64::from(BPS_SCALE)
    }

    /// Seller share of a line total, rounded down to the cent.
    #[must_use]
    pub fn seller_amount(self, line_total: Money) -> Money {
        let kept = i128::from(BPS_SCALE - self.0);
        let amount = i128::from(line_total.cents()) * kept / i128::from(BPS_SCALE);
        Money(i64::try_from(amount).unwrap_or(i64::MAX))
    }

    #[must_use]
    pub fn commission(self, line_total: Money) -> Money {
        Money(line_total.cents() - self.seller_amount(line_total).cents())
    }
}

impl From<CommissionRate> for u32 {
    fn from(value: CommissionRate) -> Self {
        value.0
    }
}

impl TryFrom<u32> for CommissionRate {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, ValidationError> {
        Self::from_bps(value)
    }
}
