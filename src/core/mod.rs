//! Core ledger logic
//!
//! This module contains the transaction-scoped engines. Each one borrows the
//! [`Session`] of the running transaction and reads and writes world state through
//! it:
//! - `context` - Transaction context and the buffered session over the store
//! - `accounts` - Account directory and holder relation
//! - `ledger` - Balances, balance logs and pending balances
//! - `fees` - Fee calculation, fee rows and fee pruning
//! - `payments` - Pay, refund and pay pruning
//! - `tokens` - Token issuance and supply
//! - `collaborators` - Contract service and token metadata seams

pub mod accounts;
pub mod collaborators;
pub mod context;
pub mod fees;
pub mod ledger;
pub mod payments;
pub mod tokens;

pub use accounts::AccountDirectory;
pub use collaborators::{ContractService, LocalContracts, StaticTokenMeta, TokenMetaService};
pub use context::{Origin, Session, TxContext};
pub use fees::FeeEngine;
pub use ledger::{EscrowTarget, LedgerEngine, Settlement};
pub use payments::PaymentEngine;
pub use tokens::TokenRegistry;
