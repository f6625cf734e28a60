//! Exact integer money amounts
//!
//! `Amount` wraps an arbitrary-precision `num_bigint::BigInt`, so every value is a
//! signed integer of any size and no floating point is involved anywhere. Amounts are
//! written to records and read from arguments as decimal strings.

use crate::types::error::LedgerError;
use num_bigint::{BigInt, Sign};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Signed integer amount of token units
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    pub const ZERO: Amount = Amount(BigInt::ZERO);

    pub fn from_i64(value: i64) -> Self {
        Amount(BigInt::from(value))
    }

    /// Parse an integer decimal string
    ///
    /// An optional sign followed by ASCII digits; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for empty input, fractions, separators or any other
    /// non-digit character.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('+'))
            .unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid_amount(input));
        }
        BigInt::from_str(trimmed)
            .map(Amount)
            .map_err(|_| LedgerError::invalid_amount(input))
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Multiply by `numerator / denominator`, truncating toward zero
    ///
    /// # Returns
    ///
    /// `None` when the denominator is zero.
    pub fn mul_ratio(&self, numerator: &Amount, denominator: &Amount) -> Option<Amount> {
        if denominator.is_zero() {
            return None;
        }
        Some(Amount(&self.0 * &numerator.0 / &denominator.0))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, other: &'a Amount) -> Amount {
        Amount(&self.0 + &other.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, other: Amount) -> Amount {
        Amount(self.0 - other.0)
    }
}

impl<'a> Sub<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn sub(self, other: &'a Amount) -> Amount {
        Amount(&self.0 - &other.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, other: &Amount) {
        self.0 += &other.0;
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, other: &Amount) {
        self.0 -= &other.0;
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Neg for &Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-&self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Amount::parse(&text).map_err(de::Error::custom)
    }
}
