//! Token registry
//!
//! Owns token records: issuance with its genesis joint account, supply changes on
//! the genesis balance, and metadata updates. Mint and burn clamp the requested
//! amount to what the supply and balance allow rather than failing.

use crate::core::accounts::AccountDirectory;
use crate::core::context::Session;
use crate::core::ledger::LedgerEngine;
use crate::store::keys;
use crate::types::{
    Amount, Balance, BalanceLog, FeePolicy, HolderId, LedgerError, Token, TokenMeta,
};
use std::collections::BTreeSet;
use tracing::debug;

pub struct TokenRegistry<'a> {
    session: &'a mut Session,
}

impl<'a> TokenRegistry<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        TokenRegistry { session }
    }

    /// Load token `code`
    ///
    /// # Errors
    ///
    /// Returns `TokenNotIssued` when the token does not exist.
    pub fn get(&mut self, code: &str) -> Result<Token, LedgerError> {
        self.session
            .get(&keys::token(code))?
            .ok_or_else(|| LedgerError::token_not_issued(code))
    }

    pub fn exists(&mut self, code: &str) -> Result<bool, LedgerError> {
        self.session.exists(&keys::token(code))
    }

    pub fn put(&mut self, token: &Token) -> Result<(), LedgerError> {
        self.session.put(keys::token(&token.code), token)
    }

    /// Issue token `code`
    ///
    /// Creates the genesis joint account for `holders`, applies the metadata and
    /// mints the initial supply into the genesis balance.
    ///
    /// # Returns
    ///
    /// The token and the mint log, if an initial supply was minted.
    ///
    /// # Errors
    ///
    /// * `TokenAlreadyIssued` if the token exists
    /// * `InvalidArgument`/`InvalidFeePolicy` for bad metadata
    /// * `AccountNotFound` if the metadata names a fee target that does not exist
    pub fn create(
        &mut self,
        code: &str,
        meta: &TokenMeta,
        holders: &BTreeSet<HolderId>,
    ) -> Result<(Token, Option<BalanceLog>), LedgerError> {
        if self.exists(code)? {
            return Err(LedgerError::TokenAlreadyIssued {
                code: code.to_string(),
            });
        }

        let (genesis, mut balance) = AccountDirectory::new(&mut *self.session).create_joint(code, holders)?;
        let genesis_address = genesis.address().clone();
        let fee_policy = meta.validate(code, &genesis_address)?;
        if let Some(policy) = &fee_policy {
            if policy.target_address != genesis_address
                && !AccountDirectory::new(&mut *self.session).exists(&policy.target_address)?
            {
                return Err(LedgerError::account_not_found(&policy.target_address));
            }
        }

        let now = self.session.now();
        let mut token = Token {
            code: code.to_string(),
            decimal: meta.decimal,
            max_supply: meta.max_supply.clone(),
            supply: Amount::ZERO,
            genesis_account: genesis_address,
            fee_policy,
            last_pruned_fee_id: None,
            created_time: now,
            updated_time: now,
        };

        let log = if meta.initial_supply.is_positive() {
            token.supply = meta.initial_supply.clone();
            Some(LedgerEngine::new(&mut *self.session).supply(&mut balance, code, meta.initial_supply.clone())?)
        } else {
            None
        };
        self.put(&token)?;

        debug!(parent: self.session.span(), code = %code, supply = %token.supply, "token issued");
        Ok((token, log))
    }

    /// Mint up to `amount` into the genesis balance
    ///
    /// The minted amount is clamped to `max_supply - supply`.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` unless `amount > 0`
    /// * `Supply` when the supply is already at its maximum
    pub fn mint(&mut self, token: &mut Token, genesis: &mut Balance, amount: Amount) -> Result<BalanceLog, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        let room = &token.max_supply - &token.supply;
        if !room.is_positive() {
            return Err(LedgerError::supply(&token.code, "max supply reached"));
        }
        let minted = amount.min(room);

        let log = LedgerEngine::new(&mut *self.session).supply(genesis, &token.code, minted.clone())?;
        token.supply += &minted;
        token.updated_time = self.session.now();
        self.put(token)?;
        Ok(log)
    }

    /// Burn up to `amount` from the genesis balance
    ///
    /// The burned amount is clamped to both the genesis balance and the supply.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` unless `amount > 0`
    /// * `Supply` when there is no supply or nothing left to burn
    pub fn burn(&mut self, token: &mut Token, genesis: &mut Balance, amount: Amount) -> Result<BalanceLog, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        if !token.supply.is_positive() {
            return Err(LedgerError::supply(&token.code, "no supply"));
        }
        let burned = amount.min(genesis.amount.clone()).min(token.supply.clone());
        if !burned.is_positive() {
            return Err(LedgerError::supply(&token.code, "nothing to burn"));
        }

        let log = LedgerEngine::new(&mut *self.session).supply(genesis, &token.code, -&burned)?;
        token.supply -= &burned;
        token.updated_time = self.session.now();
        self.put(token)?;
        Ok(log)
    }

    /// Replace decimals, max supply and fee rates from fresh metadata
    ///
    /// Without a fee section the current fee target is kept with no rates, so fees
    /// already charged can still be pruned. The initial supply is ignored.
    pub fn update(&mut self, token: &mut Token, meta: &TokenMeta) -> Result<(), LedgerError> {
        let default_target = token
            .fee_policy
            .as_ref()
            .map(|policy| policy.target_address.clone())
            .unwrap_or_else(|| token.genesis_account.clone());
        let checked = TokenMeta {
            initial_supply: Amount::ZERO,
            ..meta.clone()
        };
        let fee_policy = match checked.validate(&token.code, &default_target)? {
            Some(policy) => Some(policy),
            None => token
                .fee_policy
                .as_ref()
                .map(|policy| FeePolicy::new(policy.target_address.clone())),
        };
        if meta.max_supply < token.supply {
            return Err(LedgerError::invalid_argument(format!(
                "max supply {} is below the current supply {}",
                meta.max_supply, token.supply
            )));
        }

        token.decimal = meta.decimal;
        token.max_supply = meta.max_supply.clone();
        token.fee_policy = fee_policy;
        token.updated_time = self.session.now();
        self.put(token)
    }
}
