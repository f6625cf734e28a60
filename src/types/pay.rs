//! Merchant pay and refund rows

use crate::types::address::Address;
use crate::types::amount::Amount;
use crate::types::balance::BalanceLog;
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};

/// Immutable pay row stored under the merchant
///
/// A root pay has a positive `amount`; a refund row has negative `amount` and `fee`
/// and references its root through `parent_id`. Only `total_refund` of a root is ever
/// updated, and it stays within `0..=amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pay {
    pub pay_id: String,
    /// Merchant account the pay is settled into
    pub address: Address,
    pub amount: Amount,
    pub fee: Amount,
    #[serde(default)]
    pub total_refund: Amount,
    /// Payer for a root pay, refund receiver for a refund row
    pub rid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    pub created_time: TxTime,
}

impl Pay {
    pub fn is_refund(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Amount still refundable on a root pay
    pub fn refundable(&self) -> Amount {
        let remaining = &self.amount - &self.total_refund;
        if remaining.is_negative() {
            Amount::ZERO
        } else {
            remaining
        }
    }
}

/// Result of summing a batch of pay rows
///
/// `sum` and `fee` are gross totals; the merchant is credited `sum - fee`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaySum {
    pub sum: Amount,
    pub fee: Amount,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub has_more: bool,
}

/// Pay row plus the payer's balance log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayResult {
    pub pay: Pay,
    pub balance_log: BalanceLog,
}
