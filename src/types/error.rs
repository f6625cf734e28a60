//! Error types for the token ledger
//!
//! Every fallible ledger operation returns [`LedgerError`]. The variants fall into
//! three tiers:
//!
//! - **Validation errors**: malformed arguments, bad addresses, non-numeric amounts.
//!   They are raised before any state is read.
//! - **Domain errors**: missing accounts, insufficient balance, supply limits,
//!   authority and suspension checks, escrow and refund rules.
//! - **Collaborator errors**: the world-state store, the contract service or the
//!   token metadata service failed, or a record could not be (de)serialized.
//!
//! Validation and domain errors are *responsible*: their message is safe to return to
//! the caller verbatim. Collaborator errors are logged in detail and surfaced only as
//! the generic operation context.

use crate::store::StoreError;
use crate::types::amount::Amount;
use thiserror::Error;

/// Main error type for the token ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Address string or derivation input failed validation
    #[error("invalid account address: {reason}")]
    InvalidAddress {
        /// Which check failed (`length`, `hex`, `account type`, `token code`, `checksum`)
        reason: String,
    },

    /// Token code does not match `[A-Z0-9]{3,6}`
    #[error("invalid token code '{code}'")]
    InvalidTokenCode { code: String },

    /// Amount is not an integer decimal string or is out of range for the operation
    #[error("invalid amount '{value}'")]
    InvalidAmount { value: String },

    /// Any other malformed argument
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Fee policy text could not be parsed
    #[error("invalid fee policy: {message}")]
    InvalidFeePolicy { message: String },

    /// Escrow document could not be decoded or does not fit the contract
    #[error("invalid contract document: {message}")]
    InvalidDocument { message: String },

    /// Caller identity is missing or not allowed to invoke the operation
    #[error("invalid access: {message}")]
    InvalidAccess { message: String },

    /// Token has not been created yet
    #[error("token {code} is not issued")]
    TokenNotIssued { code: String },

    /// Token has already been created
    #[error("token {code} is already issued")]
    TokenAlreadyIssued { code: String },

    /// No account state stored under the address
    #[error("account {address} does not exist")]
    AccountNotFound { address: String },

    /// Account state already stored under the address
    #[error("account {address} already exists")]
    AccountExists { address: String },

    /// No pay row with the given id or order id
    #[error("pay {id} does not exist")]
    PayNotFound { id: String },

    /// No pending balance with the given id
    #[error("pending balance {id} does not exist")]
    PendingBalanceNotFound { id: String },

    /// Caller is not a holder of the account
    #[error("no authority over account {address}")]
    NotHolder { address: String },

    /// Account is suspended and cannot move value
    #[error("account {address} is suspended")]
    AccountSuspended { address: String },

    #[error("account {address} is already suspended")]
    AlreadySuspended { address: String },

    #[error("account {address} is not suspended")]
    NotSuspended { address: String },

    #[error("holder {holder} already holds account {address}")]
    HolderExists { address: String, holder: String },

    #[error("holder {holder} does not hold account {address}")]
    HolderNotFound { address: String, holder: String },

    /// Holder count would leave the allowed range
    #[error("holder limit for account {address}: {message}")]
    HolderLimit { address: String, message: String },

    /// More signers than a contract accepts
    #[error("too many signers: {count} exceeds {max}")]
    TooManySigners { count: usize, max: usize },

    /// Balance does not cover the requested debit
    #[error("not enough balance in {address}: available {available}, requested {requested}")]
    InsufficientBalance {
        address: String,
        available: Amount,
        requested: Amount,
    },

    /// Mint or burn cannot change the supply
    #[error("supply error for token {code}: {reason}")]
    Supply { code: String, reason: String },

    #[error("can't transfer to self ({address})")]
    SelfTransfer { address: String },

    #[error("different token accounts: {sender_token} and {receiver_token}")]
    TokenMismatch {
        sender_token: String,
        receiver_token: String,
    },

    /// Pending balance is still time-locked
    #[error("too early to withdraw pending balance {id}: locked until {release_time}")]
    TooEarlyWithdrawal { id: String, release_time: String },

    /// Pending balance does not match the escrow document that references it
    #[error("pending balance {id} does not match contract: {message}")]
    PendingBalanceMismatch { id: String, message: String },

    /// Refund would push the total refunded above the original pay amount
    #[error("refund of {requested} exceeds the refundable {remaining} of pay {pay_id}")]
    RefundExceedsOriginal {
        pay_id: String,
        requested: Amount,
        remaining: Amount,
    },

    /// Randomized joint address already has state; resubmit with a new transaction id
    #[error("failed to create a random address ({address}), resubmit the transaction")]
    AddressCollision { address: String },

    /// World-state store failure
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Record could not be encoded or decoded
    #[error("serialization failure: {message}")]
    Serialization { message: String },

    /// External collaborator service failure
    #[error("{service} service failure: {message}")]
    Collaborator { service: String, message: String },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Whether the message can be returned to the caller verbatim
    pub fn is_responsible(&self) -> bool {
        !matches!(
            self,
            LedgerError::Store(_)
                | LedgerError::Serialization { .. }
                | LedgerError::Collaborator { .. }
                | LedgerError::Config { .. }
        )
    }

    /// Whether the caller may resubmit the same request in a new transaction
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::AddressCollision { .. })
    }

    /// Render the caller-facing message
    ///
    /// Responsible errors are appended to the context as `context|error`; anything
    /// else is reduced to the context alone.
    ///
    /// # Arguments
    ///
    /// * `context` - Short description of the failed operation
    pub fn response_message(&self, context: &str) -> String {
        if self.is_responsible() {
            format!("{}|{}", context, self)
        } else {
            context.to_string()
        }
    }

    pub fn invalid_address(reason: &str) -> Self {
        LedgerError::InvalidAddress {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_token_code(code: &str) -> Self {
        LedgerError::InvalidTokenCode {
            code: code.to_string(),
        }
    }

    pub fn invalid_amount(value: &str) -> Self {
        LedgerError::InvalidAmount {
            value: value.to_string(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_access(message: impl Into<String>) -> Self {
        LedgerError::InvalidAccess {
            message: message.into(),
        }
    }

    pub fn token_not_issued(code: &str) -> Self {
        LedgerError::TokenNotIssued {
            code: code.to_string(),
        }
    }

    pub fn account_not_found(address: impl ToString) -> Self {
        LedgerError::AccountNotFound {
            address: address.to_string(),
        }
    }

    pub fn account_exists(address: impl ToString) -> Self {
        LedgerError::AccountExists {
            address: address.to_string(),
        }
    }

    pub fn not_holder(address: impl ToString) -> Self {
        LedgerError::NotHolder {
            address: address.to_string(),
        }
    }

    pub fn account_suspended(address: impl ToString) -> Self {
        LedgerError::AccountSuspended {
            address: address.to_string(),
        }
    }

    pub fn holder_limit(address: impl ToString, message: &str) -> Self {
        LedgerError::HolderLimit {
            address: address.to_string(),
            message: message.to_string(),
        }
    }

    pub fn insufficient_balance(
        address: impl ToString,
        available: Amount,
        requested: Amount,
    ) -> Self {
        LedgerError::InsufficientBalance {
            address: address.to_string(),
            available,
            requested,
        }
    }

    pub fn supply(code: &str, reason: &str) -> Self {
        LedgerError::Supply {
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn pending_mismatch(id: &str, message: &str) -> Self {
        LedgerError::PendingBalanceMismatch {
            id: id.to_string(),
            message: message.to_string(),
        }
    }

    pub fn collaborator(service: &str, message: impl Into<String>) -> Self {
        LedgerError::Collaborator {
            service: service.to_string(),
            message: message.into(),
        }
    }
}
