//! Escrow contract documents
//!
//! When an operation needs more than one signer, the ledger hands the contract
//! service a [`ContractDocument`] describing the deferred operation. The service
//! later calls back with the contract id and the same document to finalize or cancel
//! it. Documents are a closed tagged enum, so a foreign or malformed document fails
//! to decode instead of reaching any ledger code.

use crate::types::account::HolderId;
use crate::types::address::Address;
use crate::types::amount::Amount;
use crate::types::error::LedgerError;
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContractDocument {
    #[serde(rename = "account/create")]
    AccountCreate {
        token: String,
        holders: BTreeSet<HolderId>,
    },
    #[serde(rename = "account/holder/add")]
    AccountHolderAdd { address: Address, holder: HolderId },
    #[serde(rename = "account/holder/remove")]
    AccountHolderRemove { address: Address, holder: HolderId },
    #[serde(rename = "transfer")]
    Transfer {
        pending_balance_id: String,
        sender: Address,
        receiver: Address,
        amount: Amount,
        fee: Amount,
        #[serde(default)]
        memo: String,
        #[serde(default)]
        pending_time: Option<TxTime>,
    },
    #[serde(rename = "pay")]
    Pay {
        pending_balance_id: String,
        sender: Address,
        receiver: Address,
        amount: Amount,
        #[serde(default)]
        order_id: Option<String>,
        #[serde(default)]
        memo: String,
    },
    #[serde(rename = "token/create")]
    TokenCreate {
        token: String,
        holders: BTreeSet<HolderId>,
    },
    #[serde(rename = "token/mint")]
    TokenMint { token: String, amount: Amount },
    #[serde(rename = "token/burn")]
    TokenBurn { token: String, amount: Amount },
}

impl ContractDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            ContractDocument::AccountCreate { .. } => "account/create",
            ContractDocument::AccountHolderAdd { .. } => "account/holder/add",
            ContractDocument::AccountHolderRemove { .. } => "account/holder/remove",
            ContractDocument::Transfer { .. } => "transfer",
            ContractDocument::Pay { .. } => "pay",
            ContractDocument::TokenCreate { .. } => "token/create",
            ContractDocument::TokenMint { .. } => "token/mint",
            ContractDocument::TokenBurn { .. } => "token/burn",
        }
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a document received from the contract service
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` for unknown types or missing/mistyped fields.
    pub fn from_json(text: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(text).map_err(|e| LedgerError::InvalidDocument {
            message: e.to_string(),
        })
    }
}

/// Contract created by the contract service for a deferred operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub document: ContractDocument,
    pub signers: BTreeSet<HolderId>,
    pub created_time: TxTime,
    pub expiry_time: TxTime,
}
