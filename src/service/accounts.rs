//! Account operations

use super::{holders_of, scope_address, token_code, AccountWithBalance, Ledger, Outcome};
use crate::core::accounts::MIN_JOINT_HOLDERS;
use crate::core::{AccountDirectory, LedgerEngine, Session, TokenRegistry, TxContext};
use crate::types::{
    Account, AccountType, Address, ContractDocument, Holder, LedgerError, PageRequest, QueryResult,
};
use std::collections::BTreeSet;

impl Ledger {
    /// Create an account for token `code`
    ///
    /// Without co-holders this creates the invoker's personal account. With
    /// co-holder addresses it escrows an `account/create` document signed by the
    /// invoker and every co-holder; the joint account appears on finalize.
    ///
    /// # Errors
    ///
    /// * `InvalidTokenCode` for a malformed code
    /// * `TokenNotIssued` if the token is neither issued nor known to the metadata service
    /// * `AccountExists` if the invoker already has a personal account
    /// * `AccountNotFound` if the invoker or a co-holder lacks a personal account (joint only)
    /// * `HolderLimit` for more holders than allowed
    pub fn account_create(
        &self,
        ctx: TxContext,
        code: &str,
        co_holders: &[String],
    ) -> Result<Outcome<AccountWithBalance>, LedgerError> {
        let code = token_code(code)?;
        for address in co_holders {
            Address::parse(address)?;
        }

        self.run(ctx, "account.create", |session| {
            let invoker = session.ctx().invoker()?.clone();
            self.ensure_token_known(session, &code)?;

            if co_holders.is_empty() {
                let (account, balance) = AccountDirectory::new(session).create_personal(&code, &invoker)?;
                return Ok(Outcome::Applied(AccountWithBalance { account, balance }));
            }

            let personal = Address::derive(&code, AccountType::Personal, &invoker)?;
            AccountDirectory::new(session).get(&personal)?;
            let mut holders = holders_of(session, &code, co_holders)?;
            holders.insert(invoker);
            if holders.len() < 2 {
                return Err(LedgerError::invalid_argument(
                    "a joint account needs at least one other holder",
                ));
            }
            if holders.len() > self.config.max_holders {
                return Err(LedgerError::holder_limit(
                    &code,
                    &format!("maximum holders ({})", self.config.max_holders),
                ));
            }

            let document = ContractDocument::AccountCreate {
                token: code.clone(),
                holders: holders.clone(),
            };
            Ok(Outcome::Escrowed(self.escrow(session, document, None, &holders)?))
        })
    }

    /// Account and balance for a token code (the invoker's personal account) or address
    pub fn account_get(&self, ctx: TxContext, scope: &str) -> Result<AccountWithBalance, LedgerError> {
        self.run(ctx, "account.get", |session| {
            let address = scope_address(session, scope)?;
            let account = AccountDirectory::new(session).get(&address)?;
            let balance = LedgerEngine::new(session).get_balance(&address)?;
            Ok(AccountWithBalance { account, balance })
        })
    }

    /// Accounts the invoker holds, optionally for one token
    pub fn account_list(
        &self,
        ctx: TxContext,
        code: Option<&str>,
        page: PageRequest,
    ) -> Result<QueryResult<Holder>, LedgerError> {
        let code = code.filter(|c| !c.trim().is_empty()).map(token_code).transpose()?;
        self.run(ctx, "account.list", |session| {
            let invoker = session.ctx().invoker()?.clone();
            AccountDirectory::new(session).list_by_holder(&invoker, code.as_deref(), &page)
        })
    }

    /// Add the holder of personal account `target` to joint account `joint`
    ///
    /// Always escrowed: the current holders and the new holder sign.
    pub fn account_holder_add(
        &self,
        ctx: TxContext,
        joint: &str,
        target: &str,
    ) -> Result<Outcome<AccountWithBalance>, LedgerError> {
        let (joint, target) = parse_joint_and_target(joint, target)?;

        self.run(ctx, "account.holder.add", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let account = load_joint(session, &joint, &invoker)?;
            if account.holders().len() >= self.config.max_holders {
                return Err(LedgerError::holder_limit(
                    &joint,
                    &format!("maximum holders ({})", self.config.max_holders),
                ));
            }
            AccountDirectory::new(session).active(&target)?;
            let holder = target.id_hex();
            if account.has_holder(&holder) {
                return Err(LedgerError::HolderExists {
                    address: joint.to_string(),
                    holder,
                });
            }

            let mut signers = account.holders();
            signers.insert(holder.clone());
            let document = ContractDocument::AccountHolderAdd {
                address: joint.clone(),
                holder,
            };
            Ok(Outcome::Escrowed(self.escrow(session, document, None, &signers)?))
        })
    }

    /// Remove the holder of personal account `target` from joint account `joint`
    ///
    /// A holder removing themself applies immediately; removing someone else is
    /// escrowed for the remaining holders to sign.
    pub fn account_holder_remove(
        &self,
        ctx: TxContext,
        joint: &str,
        target: &str,
    ) -> Result<Outcome<AccountWithBalance>, LedgerError> {
        let (joint, target) = parse_joint_and_target(joint, target)?;

        self.run(ctx, "account.holder.remove", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let account = load_joint(session, &joint, &invoker)?;
            let holder = target.id_hex();
            if !account.has_holder(&holder) {
                return Err(LedgerError::HolderNotFound {
                    address: joint.to_string(),
                    holder,
                });
            }

            if holder == invoker {
                let account = AccountDirectory::new(session).remove_holder(&joint, &holder)?;
                let balance = LedgerEngine::new(session).get_balance(&joint)?;
                return Ok(Outcome::Applied(AccountWithBalance { account, balance }));
            }
            if account.holders().len() <= MIN_JOINT_HOLDERS {
                return Err(LedgerError::holder_limit(
                    &joint,
                    &format!("minimum holders ({})", MIN_JOINT_HOLDERS),
                ));
            }

            let signers: BTreeSet<_> = account.holders().into_iter().filter(|h| *h != holder).collect();
            let document = ContractDocument::AccountHolderRemove {
                address: joint.clone(),
                holder,
            };
            Ok(Outcome::Escrowed(self.escrow(session, document, None, &signers)?))
        })
    }

    /// Suspend the invoker's personal account for token `code`
    pub fn account_suspend(&self, ctx: TxContext, code: &str) -> Result<Account, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "account.suspend", |session| {
            let address = Address::derive(&code, AccountType::Personal, session.ctx().invoker()?)?;
            AccountDirectory::new(session).suspend(&address)
        })
    }

    /// Lift the suspension of the invoker's personal account for token `code`
    pub fn account_unsuspend(&self, ctx: TxContext, code: &str) -> Result<Account, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "account.unsuspend", |session| {
            let address = Address::derive(&code, AccountType::Personal, session.ctx().invoker()?)?;
            AccountDirectory::new(session).unsuspend(&address)
        })
    }

    /// Accept `code` if the token is issued or the metadata service knows it
    fn ensure_token_known(&self, session: &mut Session, code: &str) -> Result<(), LedgerError> {
        if TokenRegistry::new(session).exists(code)? || self.token_meta.token_meta(code)?.is_some() {
            Ok(())
        } else {
            Err(LedgerError::token_not_issued(code))
        }
    }
}

fn parse_joint_and_target(joint: &str, target: &str) -> Result<(Address, Address), LedgerError> {
    let joint = Address::parse(joint)?;
    let target = Address::parse(target)?;
    if joint.account_type() != AccountType::Joint {
        return Err(LedgerError::invalid_argument(format!("{} is not a joint account", joint)));
    }
    if !target.is_personal() {
        return Err(LedgerError::invalid_argument(format!("{} is not a personal account", target)));
    }
    if joint.code() != target.code() {
        return Err(LedgerError::TokenMismatch {
            sender_token: joint.code().to_string(),
            receiver_token: target.code().to_string(),
        });
    }
    Ok((joint, target))
}

/// Joint account the invoker holds and may act on
fn load_joint(session: &mut Session, joint: &Address, invoker: &str) -> Result<Account, LedgerError> {
    AccountDirectory::new(session).authorized(joint, invoker)
}
