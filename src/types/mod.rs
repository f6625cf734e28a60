//! Types module
//!
//! Contains the ledger data model used throughout the application:
//! - `address`: checksummed account addresses
//! - `amount`: exact integer money amounts
//! - `account`: personal/joint accounts and holder rows
//! - `balance`: balances, balance logs and pending balances
//! - `fee`: fee policy, fee rows and fee sums
//! - `pay`: pay/refund rows and pay sums
//! - `token`: token state and issuance metadata
//! - `command`: typed escrow contract documents
//! - `query`: pagination parameters and envelopes
//! - `time`: deterministic transaction time
//! - `error`: error types for the ledger

pub mod account;
pub mod address;
pub mod amount;
pub mod balance;
pub mod command;
pub mod error;
pub mod fee;
pub mod pay;
pub mod query;
pub mod time;
pub mod token;

pub use account::{Account, AccountInfo, Holder, HolderId, JointAccount, PersonalAccount};
pub use address::{holder_id, AccountType, Address};
pub use amount::Amount;
pub use balance::{Balance, BalanceLog, BalanceLogType, PendingBalance, PendingBalanceType};
pub use command::{Contract, ContractDocument};
pub use error::LedgerError;
pub use fee::{parse_fee_rates, Fee, FeeKind, FeePolicy, FeeRate, FeeSum};
pub use pay::{Pay, PayResult, PaySum};
pub use query::{PageRequest, PendingSort, QueryMeta, QueryResult, SortOrder, TimeRange};
pub use time::TxTime;
pub use token::{validate_token_code, Token, TokenMeta};
