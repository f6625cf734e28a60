//! Account and holder types
//!
//! Accounts are a closed variant, [`Account::Personal`] or [`Account::Joint`], persisted
//! with a `type` tag. A personal account's only holder is encoded in its own address
//! id; a joint account carries its holder set explicitly.

use crate::types::address::{AccountType, Address};
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Holder identity as resolved by the identity collaborator (40 lower-case hex digits)
pub type HolderId = String;

/// Fields shared by every account variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Address,
    pub token: String,
    pub created_time: TxTime,
    pub updated_time: TxTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_time: Option<TxTime>,
}

impl AccountInfo {
    pub fn new(address: Address, now: TxTime) -> Self {
        AccountInfo {
            token: address.code().to_string(),
            address,
            created_time: now,
            updated_time: now,
            suspended_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalAccount {
    #[serde(flatten)]
    pub info: AccountInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointAccount {
    #[serde(flatten)]
    pub info: AccountInfo,
    pub holders: BTreeSet<HolderId>,
}

/// Persisted account state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Account {
    Personal(PersonalAccount),
    Joint(JointAccount),
}

impl Account {
    pub fn info(&self) -> &AccountInfo {
        match self {
            Account::Personal(account) => &account.info,
            Account::Joint(account) => &account.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut AccountInfo {
        match self {
            Account::Personal(account) => &mut account.info,
            Account::Joint(account) => &mut account.info,
        }
    }

    pub fn address(&self) -> &Address {
        &self.info().address
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            Account::Personal(_) => AccountType::Personal,
            Account::Joint(_) => AccountType::Joint,
        }
    }

    /// Every identity with authority over the account
    pub fn holders(&self) -> BTreeSet<HolderId> {
        match self {
            Account::Personal(account) => BTreeSet::from([account.info.address.id_hex()]),
            Account::Joint(account) => account.holders.clone(),
        }
    }

    pub fn has_holder(&self, holder: &str) -> bool {
        match self {
            Account::Personal(account) => account.info.address.id_hex() == holder,
            Account::Joint(account) => account.holders.contains(holder),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.info().suspended_time.is_some()
    }
}

/// One row of the holder/account relation
///
/// A row exists exactly while the holder has authority over the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub holder: HolderId,
    pub address: Address,
    pub token: String,
    pub account_type: AccountType,
    pub created_time: TxTime,
}
