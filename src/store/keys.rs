//! Key layout
//!
//! Primary records live under a short type prefix. Queries the ledger needs are served
//! by composite keys whose lexicographic order is the query order: the holder index,
//! per-account balance logs, pending balances by owner, pays by merchant and fees by
//! token. Time components use [`TxTime::sort_key`], so key order is time order.

use crate::types::{Address, TimeRange, TxTime};

pub fn account(address: &Address) -> String {
    format!("ACC_{}", address)
}

pub fn balance(address: &Address) -> String {
    format!("BLC_{}", address)
}

pub fn token(code: &str) -> String {
    format!("TKN_{}", code)
}

pub fn holder(holder: &str, address: &Address) -> String {
    format!("HLD_{}_{}", holder, address)
}

pub fn holder_prefix(holder: &str) -> String {
    format!("HLD_{}_", holder)
}

pub fn balance_log(address: &Address, time: &TxTime, tx_id: &str, seq: u32) -> String {
    format!("BLOG_{}_{}_{}_{:04}", address, time.sort_key(), tx_id, seq)
}

pub fn balance_log_prefix(address: &Address) -> String {
    format!("BLOG_{}_", address)
}

pub fn pending(id: &str) -> String {
    format!("PBLC_{}", id)
}

pub fn pending_by_created(owner: &Address, time: &TxTime, id: &str) -> String {
    format!("PBC_{}_{}_{}", owner, time.sort_key(), id)
}

pub fn pending_by_created_prefix(owner: &Address) -> String {
    format!("PBC_{}_", owner)
}

pub fn pending_by_release(owner: &Address, time: &TxTime, id: &str) -> String {
    format!("PBP_{}_{}_{}", owner, time.sort_key(), id)
}

pub fn pending_by_release_prefix(owner: &Address) -> String {
    format!("PBP_{}_", owner)
}

pub fn pay(merchant: &Address, pay_id: &str) -> String {
    format!("PAY_{}_{}", merchant, pay_id)
}

pub fn pay_prefix(merchant: &Address) -> String {
    format!("PAY_{}_", merchant)
}

pub fn pay_id_index(pay_id: &str) -> String {
    format!("PAYID_{}", pay_id)
}

pub fn pay_order_index(order_id: &str) -> String {
    format!("PAYORD_{}", order_id)
}

pub fn fee(code: &str, fee_id: &str) -> String {
    format!("FEE_{}_{}", code, fee_id)
}

pub fn fee_prefix(code: &str) -> String {
    format!("FEE_{}_", code)
}

/// Ordered id: the 19-digit time key followed by the transaction id
pub fn ordered_id(time: &TxTime, tx_id: &str) -> String {
    format!("{}{}", time.sort_key(), tx_id)
}

/// Half-open key interval `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    /// Every key beginning with `prefix`
    pub fn prefix(prefix: &str) -> Self {
        KeyRange {
            start: prefix.to_string(),
            end: format!("{}{}", prefix, char::MAX),
        }
    }

    /// Keys beginning with `prefix` followed by a time key inside `range`
    pub fn time_window(prefix: &str, range: &TimeRange) -> Self {
        let start = match range.start {
            Some(time) => format!("{}{}", prefix, time.sort_key()),
            None => prefix.to_string(),
        };
        let end = match range.end {
            Some(time) => format!("{}{}", prefix, time.sort_key_after()),
            None => format!("{}{}", prefix, char::MAX),
        };
        KeyRange { start, end }
    }
}
