//! Value Objects for the Vente engine

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Number of fractional digits of the store currency (millimes).
pub const MONEY_SCALE: u32 = 3;

/// Monetary amount in the single store currency.
///
/// Arithmetic keeps full precision; [`Money::rounded`] is applied once, when a
/// value is frozen into a record or shown to a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }

    pub fn rounded(&self) -> Money {
        Money(self.0.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Largest amount a money column (`NUMERIC(14,3)`) can hold.
    pub fn max_storable() -> Money { Money(Decimal::new(99_999_999_999_999, MONEY_SCALE)) }

    pub fn exceeds_storable(&self) -> bool { self.0.abs() > Self::max_storable().0 }

    pub fn checked_add(self, rhs: Money) -> Option<Money> { self.0.checked_add(rhs.0).map(Money) }
    pub fn checked_sub(self, rhs: Money) -> Option<Money> { self.0.checked_sub(rhs.0).map(Money) }
    pub fn checked_mul(self, rhs: Decimal) -> Option<Money> { self.0.checked_mul(rhs).map(Money) }
    pub fn checked_multiply(self, qty: u32) -> Option<Money> { self.checked_mul(Decimal::from(qty)) }

    pub fn at_least_zero(self) -> Money { if self.is_negative() { Money::ZERO } else { self } }

    /// Positive difference `self - other`, zero when `other` is larger.
    pub fn saturating_sub(self, other: Money) -> Money { (self - other).at_least_zero() }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self { Self(value) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money { Money(self.0 * rhs) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.3}", self.rounded().0) }
}

/// A rate stored as a fraction (`0.19` = 19%).
///
/// Plain deserialization only accepts `[0, 1]`; fields with a narrower domain
/// use [`Rate::deserialize_tax`] or [`Rate::deserialize_discount`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// Tax rate, `0 <= rate < 1`.
    pub fn tax(value: Decimal) -> Result<Self, RateError> {
        if value < Decimal::ZERO || value >= Decimal::ONE { return Err(RateError::OutOfRange { value, min: Decimal::ZERO, max: Decimal::ONE }); }
        Ok(Self(value))
    }

    /// Promo discount rate, `0.01 <= rate <= 1`.
    pub fn discount(value: Decimal) -> Result<Self, RateError> {
        let min = Decimal::new(1, 2);
        if value < min || value > Decimal::ONE { return Err(RateError::OutOfRange { value, min, max: Decimal::ONE }); }
        Ok(Self(value))
    }

    /// For compile-time known rates and values already checked by the database.
    pub(crate) fn new_unchecked(value: Decimal) -> Self { Self(value) }

    pub fn fraction(&self) -> Decimal { self.0 }

    /// Whole-number percentage for presentation (`0.10` -> `10`).
    pub fn as_percent(&self) -> Decimal { (self.0 * Decimal::ONE_HUNDRED).normalize() }

    pub fn from_percent(percent: Decimal) -> Result<Self, RateError> { Self::discount(percent / Decimal::ONE_HUNDRED) }

    pub fn deserialize_tax<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::tax(<Decimal as Deserialize>::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_discount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::discount(<Decimal as Deserialize>::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = RateError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value < Decimal::ZERO || value > Decimal::ONE { return Err(RateError::OutOfRange { value, min: Decimal::ZERO, max: Decimal::ONE }); }
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, PartialEq)] pub enum RateError { OutOfRange { value: Decimal, min: Decimal, max: Decimal } }
impl std::error::Error for RateError {}
impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::OutOfRange { value, min, max } => write!(f, "rate {} outside [{}, {}]", value, min, max) }
    }
}

/// Line quantity, always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

#[derive(Debug, Clone)] pub enum QuantityError { Zero }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "quantity must be at least 1") }
}

/// System-generated order reference, e.g. `VNT-2024-000042`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenteReference(String);

impl VenteReference {
    const PREFIX: &'static str = "VNT";

    pub fn from_sequence(year: i32, seq: u64) -> Self { Self(format!("{}-{}-{:06}", Self::PREFIX, year, seq)) }

    pub fn parse(value: impl Into<String>) -> Result<Self, ReferenceError> {
        let value = value.into().trim().to_uppercase();
        let mut parts = value.split('-');
        let well_formed = parts.next() == Some(Self::PREFIX)
            && parts.next().is_some_and(|y| y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()))
            && parts.next().is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            && parts.next().is_none();
        if !well_formed { return Err(ReferenceError::Malformed(value)); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for VenteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum ReferenceError { Malformed(String) }
impl std::error::Error for ReferenceError {}
impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Malformed(v) => write!(f, "malformed vente reference '{}'", v) }
    }
}
