//! Token Ledger Library
//! # Overview
//!
//! This library is the accounting core of a tokenized-value ledger: account balances,
//! transfers with fees, escrowed transfers released by time or by a multi-signer
//! contract, and merchant pays settled in batches with partial refunds.
//!
//! Every operation runs as one transaction with a deterministic timestamp. It either
//! commits all of its writes or none of them.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Address, Amount, Balance, Pay, Fee, etc.)
//! - [`store`] - World-state seam ([`store::WorldState`]) and the in-memory store
//! - [`core`] - Business logic components:
//!   - [`core::context`] - Transaction context and the per-transaction session
//!   - [`core::accounts`] - Personal and joint accounts and their holders
//!   - [`core::ledger`] - Balance mutations, balance logs and pending balances
//!   - [`core::fees`] - Fee computation, fee rows and fee pruning
//!   - [`core::payments`] - Pays, refunds and pay pruning
//!   - [`core::tokens`] - Token issuance and supply changes
//!   - [`core::collaborators`] - Contract and token-metadata service seams
//! - [`service`] - The operation catalogue ([`service::Ledger`]) and escrow callbacks
//! - [`io`] - Operation-script replay
//! - [`cli`] - CLI arguments parsing
//!
//! # Value Movement
//!
//! - **Transfer**: debit the sender by amount plus fee, credit the receiver
//! - **Pending transfer**: debit now, credit the receiver at a release time
//! - **Escrow**: debit now, credit on contract finalize or return on cancel
//! - **Pay**: debit the payer now, credit the merchant in a later prune
//! - **Refund**: credit the payer back, at most the pay amount in total
//! - **Fee prune**: sweep collected fees into the token's fee target
//!
//! # Balances
//!
//! Each account has one balance that never goes negative. Every change writes a
//! balance log row carrying the change and the resulting balance, so the history
//! of an account can be audited row by row.

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod service;
pub mod store;
pub mod types;

pub use config::{LedgerConfig, ReplayConfig};
pub use core::{LocalContracts, StaticTokenMeta, TxContext};
pub use service::{CallbackOutcome, Ledger, Outcome, PayRequest, TransferRequest};
pub use store::MemoryStore;
pub use types::{Address, Amount, LedgerError, TxTime};
