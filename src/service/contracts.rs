//! Escrow callbacks from the contract service
//!
//! The contract service calls back with the contract id and the document it was
//! given. Finalize executes the document; cancel returns escrowed value and is a
//! no-op for documents that escrowed nothing. Every escrow document is checked
//! against its live pending balance before anything is mutated, and settling the
//! pending balance deletes it, so a second callback for the same contract fails
//! with `PendingBalanceNotFound`.

use super::tokens::{apply_supply_change, SupplyChange, SupplyResult};
use super::{token_code, AccountWithBalance, Ledger};
use crate::core::{
    AccountDirectory, FeeEngine, LedgerEngine, Origin, PaymentEngine, Session, Settlement, TokenRegistry,
    TxContext,
};
use crate::types::{
    Address, Amount, BalanceLog, ContractDocument, FeeKind, LedgerError, Pay, PendingBalance,
    PendingBalanceType, Token,
};
use serde::Serialize;

/// What a contract callback did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// Joint account created or its holders changed
    Account(AccountWithBalance),
    /// Token issued
    Token(Token),
    /// Token supply changed
    Supply(SupplyResult),
    /// Escrowed transfer credited to the receiver
    Credited(BalanceLog),
    /// Escrowed transfer moved into a time lock for the receiver
    Relocked(PendingBalance),
    /// Escrowed pay recorded for the merchant
    Paid(Pay),
    /// Escrowed value returned to the sender
    Withdrawn(BalanceLog),
    /// Nothing was escrowed for this document
    Noop,
}

impl Ledger {
    /// Execute the document of an approved contract
    ///
    /// # Errors
    ///
    /// * `InvalidAccess` unless the transaction comes from the contract service
    /// * `InvalidDocument` for a document that does not decode
    /// * `PendingBalanceNotFound`/`PendingBalanceMismatch` when the escrow is gone or differs
    pub fn contract_execute(
        &self,
        ctx: TxContext,
        contract_id: &str,
        document: &str,
    ) -> Result<CallbackOutcome, LedgerError> {
        let document = ContractDocument::from_json(document)?;
        self.run(ctx, "contract.execute", |session| {
            require_contract_service(session)?;
            match document {
                ContractDocument::AccountCreate { token, holders } => {
                    let code = token_code(&token)?;
                    if holders.len() < 2 {
                        return Err(LedgerError::invalid_argument(
                            "a joint account needs at least two holders",
                        ));
                    }
                    let (account, balance) = AccountDirectory::new(session).create_joint(&code, &holders)?;
                    Ok(CallbackOutcome::Account(AccountWithBalance { account, balance }))
                }
                ContractDocument::AccountHolderAdd { address, holder } => {
                    let account = AccountDirectory::new(session).add_holder(&address, &holder)?;
                    let balance = LedgerEngine::new(session).get_balance(&address)?;
                    Ok(CallbackOutcome::Account(AccountWithBalance { account, balance }))
                }
                ContractDocument::AccountHolderRemove { address, holder } => {
                    let account = AccountDirectory::new(session).remove_holder(&address, &holder)?;
                    let balance = LedgerEngine::new(session).get_balance(&address)?;
                    Ok(CallbackOutcome::Account(AccountWithBalance { account, balance }))
                }
                ContractDocument::Transfer {
                    pending_balance_id,
                    sender,
                    receiver,
                    amount,
                    pending_time,
                    ..
                } => {
                    let pending = live_escrow(session, &pending_balance_id, contract_id, &sender, &amount)?;
                    AccountDirectory::new(session).active(&receiver)?;
                    let mut ledger = LedgerEngine::new(session);
                    let mut receiver_balance = ledger.get_balance(&receiver)?;
                    match ledger.finalize_pending(&pending, &mut receiver_balance, pending_time)? {
                        Settlement::Credited(log) => Ok(CallbackOutcome::Credited(log)),
                        Settlement::Relocked(relocked) => Ok(CallbackOutcome::Relocked(relocked)),
                    }
                }
                ContractDocument::Pay {
                    pending_balance_id,
                    sender,
                    receiver,
                    amount,
                    order_id,
                    memo,
                } => {
                    let pending = live_escrow(session, &pending_balance_id, contract_id, &sender, &amount)?;
                    AccountDirectory::new(session).active(&receiver)?;
                    let fee = FeeEngine::new(session).calc_fee(&receiver, FeeKind::Pay, &amount)?;
                    let pay = PaymentEngine::new(session).settle_pending(
                        &pending,
                        &receiver,
                        fee,
                        order_id.as_deref(),
                        &memo,
                    )?;
                    Ok(CallbackOutcome::Paid(pay))
                }
                ContractDocument::TokenCreate { token, holders } => {
                    let code = token_code(&token)?;
                    let meta = self.issuance_meta(&code)?;
                    let (token, _) = TokenRegistry::new(session).create(&code, &meta, &holders)?;
                    Ok(CallbackOutcome::Token(token))
                }
                ContractDocument::TokenMint { token, amount } => {
                    let token = TokenRegistry::new(session).get(&token_code(&token)?)?;
                    Ok(CallbackOutcome::Supply(apply_supply_change(
                        session,
                        token,
                        amount,
                        SupplyChange::Mint,
                    )?))
                }
                ContractDocument::TokenBurn { token, amount } => {
                    let token = TokenRegistry::new(session).get(&token_code(&token)?)?;
                    Ok(CallbackOutcome::Supply(apply_supply_change(
                        session,
                        token,
                        amount,
                        SupplyChange::Burn,
                    )?))
                }
            }
        })
    }

    /// Cancel a contract, returning any escrowed value to its sender
    pub fn contract_cancel(
        &self,
        ctx: TxContext,
        contract_id: &str,
        document: &str,
    ) -> Result<CallbackOutcome, LedgerError> {
        let document = ContractDocument::from_json(document)?;
        self.run(ctx, "contract.cancel", |session| {
            require_contract_service(session)?;
            match document {
                ContractDocument::Transfer {
                    pending_balance_id,
                    sender,
                    amount,
                    ..
                }
                | ContractDocument::Pay {
                    pending_balance_id,
                    sender,
                    amount,
                    ..
                } => {
                    let pending = live_escrow(session, &pending_balance_id, contract_id, &sender, &amount)?;
                    let log = LedgerEngine::new(session).withdraw_pending(&pending)?;
                    Ok(CallbackOutcome::Withdrawn(log))
                }
                _ => Ok(CallbackOutcome::Noop),
            }
        })
    }
}

fn require_contract_service(session: &Session) -> Result<(), LedgerError> {
    if session.ctx().origin() != Origin::ContractService {
        return Err(LedgerError::invalid_access(
            "contract callbacks are only accepted from the contract service",
        ));
    }
    Ok(())
}

/// Load the pending balance escrowed for `contract_id` and check it against the document
fn live_escrow(
    session: &mut Session,
    pending_balance_id: &str,
    contract_id: &str,
    sender: &Address,
    amount: &Amount,
) -> Result<PendingBalance, LedgerError> {
    let pending = LedgerEngine::new(session).get_pending(pending_balance_id)?;
    let mismatch = |message: &str| Err(LedgerError::pending_mismatch(pending_balance_id, message));

    if pending.pending_type != PendingBalanceType::Contract {
        return mismatch("not held by a contract");
    }
    if pending.rid != contract_id {
        return mismatch("held by another contract");
    }
    if pending.account != *sender {
        return mismatch("owner differs from the document sender");
    }
    if pending.amount != *amount {
        return mismatch("amount differs from the document amount");
    }
    Ok(pending)
}
