//! Operation catalogue
//!
//! [`Ledger`] is the entry point the host environment calls, one method per
//! operation. Each call:
//! 1. Validates its arguments before touching state
//! 2. Opens a [`Session`] for the transaction and runs the engines inside it
//! 3. Commits the session on success, or drops it (discarding every write) on error
//!
//! Operations that need more than one signer do not mutate balances directly. They
//! hand a [`ContractDocument`] to the contract
//! service and return [`Outcome::Escrowed`]; the service later calls
//! [`Ledger::contract_execute`] or [`Ledger::contract_cancel`].

mod accounts;
mod balances;
mod contracts;
mod fees;
mod payments;
mod tokens;
mod transfers;

pub use contracts::CallbackOutcome;
pub use payments::PayRequest;
pub use tokens::SupplyResult;
pub use transfers::TransferRequest;

use crate::config::LedgerConfig;
use crate::core::{AccountDirectory, ContractService, Session, TokenMetaService, TxContext};
use crate::store::WorldState;
use crate::types::{
    validate_token_code, Account, AccountType, Address, Balance, Contract, ContractDocument, HolderId,
    LedgerError, TxTime,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of an operation that may be deferred to the contract service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Applied within this transaction
    Applied(T),
    /// Waiting on the signers of the contract
    Escrowed(Contract),
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Escrowed(_) => None,
        }
    }

    pub fn contract(&self) -> Option<&Contract> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Escrowed(contract) => Some(contract),
        }
    }
}

/// Account together with its balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountWithBalance {
    pub account: Account,
    pub balance: Balance,
}

/// Ledger facade over a world-state store and the external collaborators
pub struct Ledger {
    store: Arc<dyn WorldState>,
    contracts: Arc<dyn ContractService>,
    token_meta: Arc<dyn TokenMetaService>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn WorldState>,
        contracts: Arc<dyn ContractService>,
        token_meta: Arc<dyn TokenMetaService>,
        config: LedgerConfig,
    ) -> Self {
        Ledger {
            store,
            contracts,
            token_meta,
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run `body` as one all-or-nothing transaction
    fn run<T>(
        &self,
        ctx: TxContext,
        operation: &'static str,
        body: impl FnOnce(&mut Session) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut session = Session::begin(self.store.clone(), ctx, self.config.clone(), operation);
        let span = session.span().clone();
        let _entered = span.enter();

        let outcome = body(&mut session).and_then(|value| session.commit().map(|()| value));
        match &outcome {
            Ok(_) => info!("committed"),
            Err(e) if e.is_responsible() => warn!(error = %e, "rejected"),
            Err(e) => warn!(error = ?e, "failed"),
        }
        outcome
    }

    /// Hand `document` to the contract service
    fn escrow(
        &self,
        session: &Session,
        document: ContractDocument,
        expiry_secs: Option<i64>,
        signers: &BTreeSet<HolderId>,
    ) -> Result<Contract, LedgerError> {
        self.check_signers(signers)?;
        let expiry = expiry_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(self.config.default_contract_expiry_secs);
        let contract = self
            .contracts
            .create_contract(session.ctx(), &document, expiry, signers)?;
        info!(contract = %contract.id, kind = document.kind(), signers = signers.len(), "escrowed");
        Ok(contract)
    }

    fn check_signers(&self, signers: &BTreeSet<HolderId>) -> Result<(), LedgerError> {
        if signers.len() > self.config.max_holders {
            return Err(LedgerError::TooManySigners {
                count: signers.len(),
                max: self.config.max_holders,
            });
        }
        Ok(())
    }

    /// Upper bound of a prune window
    ///
    /// Never later than the transaction time; a safe prune also stays the
    /// configured margin behind it.
    fn prune_until(&self, now: TxTime, safely: bool, end_time: Option<TxTime>) -> TxTime {
        let until = end_time.map_or(now, |end| end.min(now));
        if safely {
            until.min(now.minus_minutes(self.config.safety_margin_minutes))
        } else {
            until
        }
    }
}

/// Upper-case and validate a token code argument
pub(crate) fn token_code(code: &str) -> Result<String, LedgerError> {
    let code = code.trim().to_uppercase();
    validate_token_code(&code)?;
    Ok(code)
}

/// Resolve a scope argument: a token code names the invoker's personal account,
/// anything longer is parsed as an address
pub(crate) fn scope_address(session: &Session, scope: &str) -> Result<Address, LedgerError> {
    if scope.trim().len() <= 6 {
        let code = token_code(scope)?;
        Address::derive(&code, AccountType::Personal, session.ctx().invoker()?)
    } else {
        Address::parse(scope)
    }
}

/// Holders of every account in `addresses`, all of token `code`
pub(crate) fn holders_of(
    session: &mut Session,
    code: &str,
    addresses: &[String],
) -> Result<BTreeSet<HolderId>, LedgerError> {
    let mut holders = BTreeSet::new();
    let mut directory = AccountDirectory::new(session);
    for address in addresses {
        holders.extend(directory.signers_of(code, address)?);
    }
    Ok(holders)
}
