//! Fee policy, fee records and fee sums

use crate::types::address::Address;
use crate::types::amount::Amount;
use crate::types::error::LedgerError;
use crate::types::time::TxTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Operation kinds a fee policy can price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeKind {
    Transfer,
    Pay,
}

impl FeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeKind::Transfer => "transfer",
            FeeKind::Pay => "pay",
        }
    }
}

impl FromStr for FeeKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transfer" => Ok(FeeKind::Transfer),
            "pay" => Ok(FeeKind::Pay),
            other => Err(LedgerError::InvalidFeePolicy {
                message: format!("unknown fee kind '{}'", other),
            }),
        }
    }
}

/// Rate text and cap for one operation kind
///
/// The rate is kept as written (`0.01` or `1/50`) and converted to an exact ratio on
/// use. A zero `max_amount` means the fee is uncapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate {
    pub rate: String,
    pub max_amount: Amount,
}

impl FeeRate {
    /// Build a rate after checking that its text parses
    pub fn new(rate: &str, max_amount: Amount) -> Result<Self, LedgerError> {
        if max_amount.is_negative() {
            return Err(LedgerError::InvalidFeePolicy {
                message: format!("negative max amount {}", max_amount),
            });
        }
        let fee_rate = FeeRate {
            rate: rate.trim().to_string(),
            max_amount,
        };
        fee_rate.ratio()?;
        Ok(fee_rate)
    }

    /// Exact `(numerator, denominator)` of the rate
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeePolicy` for malformed or negative rates and zero denominators.
    pub fn ratio(&self) -> Result<(Amount, Amount), LedgerError> {
        let invalid = || LedgerError::InvalidFeePolicy {
            message: format!("invalid rate '{}'", self.rate),
        };

        let (numerator, denominator) = match self.rate.split_once('/') {
            Some((num, den)) => (
                Amount::parse(num).map_err(|_| invalid())?,
                Amount::parse(den).map_err(|_| invalid())?,
            ),
            None => {
                let decimal = Decimal::from_str(&self.rate).map_err(|_| invalid())?;
                let numerator = Amount::parse(&decimal.mantissa().to_string()).map_err(|_| invalid())?;
                let denominator = Amount::parse(&format!("1{}", "0".repeat(decimal.scale() as usize)))
                    .map_err(|_| invalid())?;
                (numerator, denominator)
            }
        };

        if numerator.is_negative() || !denominator.is_positive() {
            return Err(invalid());
        }
        Ok((numerator, denominator))
    }

    /// `floor(amount × rate)`, clamped to the cap and never negative
    pub fn apply(&self, amount: &Amount) -> Result<Amount, LedgerError> {
        let (numerator, denominator) = self.ratio()?;
        let fee = amount
            .mul_ratio(&numerator, &denominator)
            .ok_or_else(|| LedgerError::InvalidFeePolicy {
                message: format!("invalid rate '{}'", self.rate),
            })?;

        if fee.is_negative() {
            return Ok(Amount::ZERO);
        }
        if self.max_amount.is_positive() && fee > self.max_amount {
            return Ok(self.max_amount.clone());
        }
        Ok(fee)
    }
}

/// Token fee policy: where fees are swept and how each kind is priced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub target_address: Address,
    pub rates: BTreeMap<FeeKind, FeeRate>,
}

impl FeePolicy {
    pub fn new(target_address: Address) -> Self {
        FeePolicy {
            target_address,
            rates: BTreeMap::new(),
        }
    }
}

/// Parse fee rates from `kind=rate[,max];kind=rate[,max]`
///
/// Empty input yields no rates.
///
/// # Examples
///
/// ```
/// use token_ledger::types::parse_fee_rates;
///
/// let rates = parse_fee_rates("transfer=0.01,100;pay=1/50").unwrap();
/// assert_eq!(rates.len(), 2);
/// ```
pub fn parse_fee_rates(text: &str) -> Result<BTreeMap<FeeKind, FeeRate>, LedgerError> {
    let mut rates = BTreeMap::new();
    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (kind, spec) = entry.split_once('=').ok_or_else(|| LedgerError::InvalidFeePolicy {
            message: format!("missing '=' in '{}'", entry),
        })?;
        let kind = FeeKind::from_str(kind)?;
        let (rate, max_amount) = match spec.split_once(',') {
            Some((rate, max)) => (
                rate,
                Amount::parse(max).map_err(|_| LedgerError::InvalidFeePolicy {
                    message: format!("invalid max amount '{}'", max.trim()),
                })?,
            ),
            None => (spec, Amount::ZERO),
        };
        rates.insert(kind, FeeRate::new(rate, max_amount)?);
    }
    Ok(rates)
}

impl fmt::Display for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .rates
            .iter()
            .map(|(kind, rate)| format!("{}={},{}", kind.as_str(), rate.rate, rate.max_amount))
            .collect();
        write!(f, "{}", entries.join(";"))
    }
}

/// Immutable fee record
///
/// `fee_id` is the 19-digit transaction time followed by the transaction id, so ids
/// sort in time order and never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub token: String,
    pub fee_id: String,
    pub account: Address,
    pub amount: Amount,
    pub created_time: TxTime,
}

/// Result of summing a batch of fee rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSum {
    pub sum: Amount,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub has_more: bool,
}
