//! Balance state, balance logs and pending (escrowed) balances

use crate::types::address::Address;
use crate::types::amount::Amount;
use crate::types::error::LedgerError;
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Live balance of one account
///
/// `amount` is never negative once a transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: Address,
    pub amount: Amount,
    pub created_time: TxTime,
    pub updated_time: TxTime,
    /// Pay-prune cursor; pays with an id at or before it are settled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pruned_pay_id: Option<String>,
}

impl Balance {
    pub fn new(address: Address, now: TxTime) -> Self {
        Balance {
            address,
            amount: Amount::ZERO,
            created_time: now,
            updated_time: now,
            last_pruned_pay_id: None,
        }
    }

    /// Add a signed delta, rejecting negative results
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if the result would be negative
    pub fn apply(&mut self, diff: &Amount, now: TxTime) -> Result<(), LedgerError> {
        let next = &self.amount + diff;
        if next.is_negative() {
            return Err(LedgerError::insufficient_balance(&self.address, self.amount.clone(), -diff));
        }
        self.amount = next;
        self.updated_time = now;
        Ok(())
    }
}

/// Kind of balance mutation recorded by a log row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceLogType {
    Mint,
    Burn,
    Send,
    Receive,
    Deposit,
    Withdraw,
    Pay,
    Refund,
    PrunePay,
    PruneFee,
}

impl BalanceLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceLogType::Mint => "mint",
            BalanceLogType::Burn => "burn",
            BalanceLogType::Send => "send",
            BalanceLogType::Receive => "receive",
            BalanceLogType::Deposit => "deposit",
            BalanceLogType::Withdraw => "withdraw",
            BalanceLogType::Pay => "pay",
            BalanceLogType::Refund => "refund",
            BalanceLogType::PrunePay => "prune_pay",
            BalanceLogType::PruneFee => "prune_fee",
        }
    }
}

impl fmt::Display for BalanceLogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceLogType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            BalanceLogType::Mint,
            BalanceLogType::Burn,
            BalanceLogType::Send,
            BalanceLogType::Receive,
            BalanceLogType::Deposit,
            BalanceLogType::Withdraw,
            BalanceLogType::Pay,
            BalanceLogType::Refund,
            BalanceLogType::PrunePay,
            BalanceLogType::PruneFee,
        ];
        let wanted = s.trim().to_lowercase();
        all.into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| LedgerError::invalid_argument(format!("unknown balance log type '{}'", s)))
    }
}

/// Immutable audit row, one per balance mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLog {
    pub address: Address,
    #[serde(rename = "type")]
    pub log_type: BalanceLogType,
    /// Counterparty account, contract, token code or pending id
    pub rid: String,
    pub diff: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Amount>,
    /// Balance after the mutation
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    pub created_time: TxTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune_start_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune_end_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_id: Option<String>,
}

impl BalanceLog {
    /// Log row for `balance` after a mutation of `diff`
    pub fn new(balance: &Balance, log_type: BalanceLogType, rid: impl Into<String>, diff: Amount) -> Self {
        BalanceLog {
            address: balance.address.clone(),
            log_type,
            rid: rid.into(),
            diff,
            fee: None,
            amount: balance.amount.clone(),
            memo: String::new(),
            created_time: balance.updated_time,
            prune_start_id: None,
            prune_end_id: None,
            pay_id: None,
        }
    }

    pub fn with_fee(mut self, fee: Option<Amount>) -> Self {
        self.fee = fee.filter(|f| !f.is_zero());
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn with_pay_id(mut self, pay_id: &str) -> Self {
        self.pay_id = Some(pay_id.to_string());
        self
    }

    pub fn with_prune_range(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.prune_start_id = start;
        self.prune_end_id = end;
        self
    }
}

/// Who a pending balance is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingBalanceType {
    /// Time-locked credit owed to `account`
    Account,
    /// Escrow owned by `account`, settled or cancelled by contract `rid`
    Contract,
}

/// Debited-but-not-yet-credited value
///
/// Deleted on its single terminal transition: finalize credits the counterparty,
/// cancel or withdraw credits `account` back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBalance {
    pub id: String,
    #[serde(rename = "type")]
    pub pending_type: PendingBalanceType,
    pub account: Address,
    pub rid: String,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Amount>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    pub created_time: TxTime,
    pub pending_time: TxTime,
}

impl PendingBalance {
    /// Escrowed amount plus any attached fee
    pub fn total(&self) -> Amount {
        match &self.fee {
            Some(fee) => &self.amount + fee,
            None => self.amount.clone(),
        }
    }
}
