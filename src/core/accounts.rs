//! Account directory
//!
//! This module provides the `AccountDirectory`, which owns account records and the
//! holder relation. It is responsible for:
//! - Creating personal accounts (one per holder and token) and randomized joint accounts
//! - Adding and removing joint-account holders while keeping the holder rows in step
//! - Suspending and unsuspending personal accounts
//! - Listing a holder's accounts through the holder index

use crate::core::context::Session;
use crate::core::ledger::LedgerEngine;
use crate::store::{keys, KeyRange};
use crate::types::{
    Account, AccountInfo, AccountType, Address, Balance, Holder, HolderId, JointAccount,
    LedgerError, PageRequest, PersonalAccount, QueryResult,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Fewest holders a joint account keeps after a removal
pub const MIN_JOINT_HOLDERS: usize = 2;

/// Account and holder records of one session
pub struct AccountDirectory<'a> {
    session: &'a mut Session,
}

impl<'a> AccountDirectory<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        AccountDirectory { session }
    }

    /// Load an account
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` when no account is stored under `address`.
    pub fn get(&mut self, address: &Address) -> Result<Account, LedgerError> {
        self.session
            .get(&keys::account(address))?
            .ok_or_else(|| LedgerError::account_not_found(address))
    }

    pub fn exists(&mut self, address: &Address) -> Result<bool, LedgerError> {
        self.session.exists(&keys::account(address))
    }

    /// Load an account the holder may move value from
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` if the account does not exist
    /// * `NotHolder` if `holder` has no authority over it
    /// * `AccountSuspended` if it is suspended
    pub fn authorized(&mut self, address: &Address, holder: &str) -> Result<Account, LedgerError> {
        let account = self.get(address)?;
        if !account.has_holder(holder) {
            return Err(LedgerError::not_holder(address));
        }
        if account.is_suspended() {
            return Err(LedgerError::account_suspended(address));
        }
        Ok(account)
    }

    /// Load an account that may receive value
    pub fn active(&mut self, address: &Address) -> Result<Account, LedgerError> {
        let account = self.get(address)?;
        if account.is_suspended() {
            return Err(LedgerError::account_suspended(address));
        }
        Ok(account)
    }

    /// Holders of the account behind `address_text`, which must belong to token `code`
    pub fn signers_of(&mut self, code: &str, address_text: &str) -> Result<BTreeSet<HolderId>, LedgerError> {
        let address = Address::parse(address_text)?;
        if address.code() != code {
            return Err(LedgerError::TokenMismatch {
                sender_token: code.to_string(),
                receiver_token: address.code().to_string(),
            });
        }
        Ok(self.get(&address)?.holders())
    }

    /// Create the personal account of `holder` for token `code`
    ///
    /// Writes the account, a zero balance and the holder row together.
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` if the holder already has an account for the token.
    pub fn create_personal(&mut self, code: &str, holder: &str) -> Result<(Account, Balance), LedgerError> {
        let address = Address::derive(code, AccountType::Personal, holder)?;
        if self.exists(&address)? {
            return Err(LedgerError::account_exists(&address));
        }

        let account = Account::Personal(PersonalAccount {
            info: AccountInfo::new(address.clone(), self.session.now()),
        });
        let balance = LedgerEngine::new(&mut *self.session).create_balance(&address)?;
        self.put_holder_row(&address.id_hex(), &account)?;
        self.put(&account)?;

        debug!(parent: self.session.span(), address = %address, "personal account created");
        Ok((account, balance))
    }

    /// Create a joint account whose address is seeded from the transaction id
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` for an empty holder set
    /// * `HolderLimit` for more holders than allowed
    /// * `AddressCollision` (retryable) if the derived address already has state
    pub fn create_joint(&mut self, code: &str, holders: &BTreeSet<HolderId>) -> Result<(Account, Balance), LedgerError> {
        if holders.is_empty() {
            return Err(LedgerError::invalid_argument("joint account needs holders"));
        }
        let max = self.session.config().max_holders;
        let address = Address::derive(code, AccountType::Joint, self.session.tx_id())?;
        if holders.len() > max {
            return Err(LedgerError::holder_limit(&address, &format!("maximum holders ({})", max)));
        }
        if self.exists(&address)? {
            return Err(LedgerError::AddressCollision {
                address: address.to_string(),
            });
        }

        let account = Account::Joint(JointAccount {
            info: AccountInfo::new(address.clone(), self.session.now()),
            holders: holders.clone(),
        });
        let balance = LedgerEngine::new(&mut *self.session).create_balance(&address)?;
        for holder in holders {
            self.put_holder_row(holder, &account)?;
        }
        self.put(&account)?;

        debug!(parent: self.session.span(), address = %address, holders = holders.len(), "joint account created");
        Ok((account, balance))
    }

    /// Add `holder` to a joint account
    pub fn add_holder(&mut self, address: &Address, holder: &str) -> Result<Account, LedgerError> {
        let max = self.session.config().max_holders;
        let now = self.session.now();
        let mut account = self.get(address)?;
        let Account::Joint(joint) = &mut account else {
            return Err(LedgerError::invalid_argument("holders can only be added to joint accounts"));
        };
        if joint.holders.contains(holder) {
            return Err(LedgerError::HolderExists {
                address: address.to_string(),
                holder: holder.to_string(),
            });
        }
        if joint.holders.len() >= max {
            return Err(LedgerError::holder_limit(address, &format!("maximum holders ({})", max)));
        }
        joint.holders.insert(holder.to_string());
        joint.info.updated_time = now;

        self.put_holder_row(holder, &account)?;
        self.put(&account)?;
        Ok(account)
    }

    /// Remove `holder` from a joint account, keeping at least two holders
    pub fn remove_holder(&mut self, address: &Address, holder: &str) -> Result<Account, LedgerError> {
        let now = self.session.now();
        let mut account = self.get(address)?;
        let Account::Joint(joint) = &mut account else {
            return Err(LedgerError::invalid_argument("holders can only be removed from joint accounts"));
        };
        if !joint.holders.contains(holder) {
            return Err(LedgerError::HolderNotFound {
                address: address.to_string(),
                holder: holder.to_string(),
            });
        }
        if joint.holders.len() <= MIN_JOINT_HOLDERS {
            return Err(LedgerError::holder_limit(
                address,
                &format!("minimum holders ({})", MIN_JOINT_HOLDERS),
            ));
        }
        joint.holders.remove(holder);
        joint.info.updated_time = now;

        self.session.delete(keys::holder(holder, address));
        self.put(&account)?;
        Ok(account)
    }

    /// Mark a personal account suspended
    pub fn suspend(&mut self, address: &Address) -> Result<Account, LedgerError> {
        let now = self.session.now();
        let mut account = self.personal(address)?;
        if account.is_suspended() {
            return Err(LedgerError::AlreadySuspended {
                address: address.to_string(),
            });
        }
        let info = account.info_mut();
        info.suspended_time = Some(now);
        info.updated_time = now;
        self.put(&account)?;
        Ok(account)
    }

    /// Clear the suspension of a personal account
    pub fn unsuspend(&mut self, address: &Address) -> Result<Account, LedgerError> {
        let now = self.session.now();
        let mut account = self.personal(address)?;
        if !account.is_suspended() {
            return Err(LedgerError::NotSuspended {
                address: address.to_string(),
            });
        }
        let info = account.info_mut();
        info.suspended_time = None;
        info.updated_time = now;
        self.put(&account)?;
        Ok(account)
    }

    /// Page through the accounts `holder` has authority over, optionally for one token
    pub fn list_by_holder(
        &mut self,
        holder: &str,
        token: Option<&str>,
        page: &PageRequest,
    ) -> Result<QueryResult<Holder>, LedgerError> {
        let range = KeyRange::prefix(&keys::holder_prefix(holder));
        self.session
            .page(&range, page, |row: &Holder| token.map_or(true, |code| row.token == code))
    }

    fn personal(&mut self, address: &Address) -> Result<Account, LedgerError> {
        let account = self.get(address)?;
        if account.account_type() != AccountType::Personal {
            return Err(LedgerError::invalid_argument("only personal accounts can be suspended"));
        }
        Ok(account)
    }

    fn put(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.session.put(keys::account(account.address()), account)
    }

    fn put_holder_row(&mut self, holder: &str, account: &Account) -> Result<(), LedgerError> {
        let info = account.info();
        let row = Holder {
            holder: holder.to_string(),
            address: info.address.clone(),
            token: info.token.clone(),
            account_type: account.account_type(),
            created_time: self.session.now(),
        };
        self.session.put(keys::holder(holder, &info.address), &row)
    }
}
