//! Value types shared by the store and the domain.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of units of a product on an order line. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

/// Returned when a quantity is zero, negative, or too large to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid quantity {0} (must be a positive integer)")]
pub struct InvalidQuantity(pub i64);

impl Quantity {
    /// A single unit.
    pub const ONE: Quantity = Quantity(1);

    /// Creates a quantity, rejecting values that are not strictly positive.
    pub fn new(value: i64) -> Result<Self, InvalidQuantity> {
        match i32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(InvalidQuantity(value)),
        }
    }

    /// Returns the raw count.
    pub fn get(&self) -> i32 {
        self.0
    }

    /// Adds two quantities, failing if the sum leaves the storable range.
    pub fn checked_add(self, other: Quantity) -> Result<Quantity, InvalidQuantity> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or(InvalidQuantity(i64::from(self.0) + i64::from(other.0)))
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = InvalidQuantity;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Quantity::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Non-negative money amount held in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

/// Returned when a price string is not a non-negative decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid price '{0}' (must be a non-negative amount with at most two decimals)")]
pub struct InvalidMoney(pub String);

impl Money {
    /// Creates an amount from cents, rejecting negative values.
    pub fn from_cents(cents: i64) -> Result<Self, InvalidMoney> {
        if cents < 0 {
            return Err(InvalidMoney(cents.to_string()));
        }
        Ok(Self { cents })
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion.
    pub fn cents_part(&self) -> i64 {
        self.cents % 100
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.units(), self.cents_part())
    }
}

impl FromStr for Money {
    type Err = InvalidMoney;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMoney(s.to_string());
        let (whole, fraction) = match s.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) || fraction.len() > 2 {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(|cents| Money { cents })
            .ok_or_else(invalid)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
