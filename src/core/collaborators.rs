//! External collaborator seams
//!
//! The ledger does not own multi-signature contracts or token issuance metadata.
//! Both are reached through traits so the host environment can plug in its own
//! services; the local implementations here back the replay tool and the tests.

use crate::core::context::TxContext;
use crate::types::{Contract, ContractDocument, HolderId, LedgerError, TokenMeta};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Multi-signature contract service
pub trait ContractService: Send + Sync {
    /// Create a contract that the `signers` must approve before `document` is
    /// finalized through the contract callback
    ///
    /// # Arguments
    ///
    /// * `ctx` - Transaction requesting the contract
    /// * `document` - Deferred operation
    /// * `expiry_secs` - Seconds after the transaction time until the contract expires
    /// * `signers` - Holder ids whose approval is required
    fn create_contract(
        &self,
        ctx: &TxContext,
        document: &ContractDocument,
        expiry_secs: i64,
        signers: &BTreeSet<HolderId>,
    ) -> Result<Contract, LedgerError>;
}

/// Source of token issuance metadata
pub trait TokenMetaService: Send + Sync {
    /// Metadata for `code`, `None` when the token is unknown to the service
    fn token_meta(&self, code: &str) -> Result<Option<TokenMeta>, LedgerError>;
}

/// In-process contract service that records every contract it creates
#[derive(Debug, Default)]
pub struct LocalContracts {
    contracts: Mutex<BTreeMap<String, Contract>>,
}

impl LocalContracts {
    pub fn new() -> Self {
        LocalContracts::default()
    }

    /// Contract created under `id`
    pub fn get(&self, id: &str) -> Option<Contract> {
        self.contracts.lock().ok()?.get(id).cloned()
    }

    /// Contract created by transaction `tx_id`
    pub fn created_by(&self, tx_id: &str) -> Option<Contract> {
        self.get(&Self::contract_id(tx_id))
    }

    pub fn len(&self) -> usize {
        self.contracts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contract_id(tx_id: &str) -> String {
        format!("contract-{}", tx_id)
    }
}

impl ContractService for LocalContracts {
    fn create_contract(
        &self,
        ctx: &TxContext,
        document: &ContractDocument,
        expiry_secs: i64,
        signers: &BTreeSet<HolderId>,
    ) -> Result<Contract, LedgerError> {
        let contract = Contract {
            id: Self::contract_id(ctx.tx_id()),
            document: document.clone(),
            signers: signers.clone(),
            created_time: ctx.timestamp(),
            expiry_time: ctx.timestamp().plus_seconds(expiry_secs),
        };
        let mut contracts = self
            .contracts
            .lock()
            .map_err(|_| LedgerError::collaborator("contract", "contract registry lock poisoned"))?;
        if contracts.contains_key(&contract.id) {
            return Err(LedgerError::collaborator(
                "contract",
                format!("contract {} already exists", contract.id),
            ));
        }
        contracts.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }
}

/// Token metadata from a fixed table, typically loaded from the replay config
#[derive(Debug, Clone, Default)]
pub struct StaticTokenMeta {
    tokens: BTreeMap<String, TokenMeta>,
}

impl StaticTokenMeta {
    pub fn new(tokens: BTreeMap<String, TokenMeta>) -> Self {
        StaticTokenMeta {
            tokens: tokens
                .into_iter()
                .map(|(code, meta)| (code.to_uppercase(), meta))
                .collect(),
        }
    }

    pub fn with_token(mut self, code: &str, meta: TokenMeta) -> Self {
        self.tokens.insert(code.to_uppercase(), meta);
        self
    }
}

impl TokenMetaService for StaticTokenMeta {
    fn token_meta(&self, code: &str) -> Result<Option<TokenMeta>, LedgerError> {
        Ok(self.tokens.get(code).cloned())
    }
}
