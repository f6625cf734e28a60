//! Transfer operation

use super::{holders_of, Ledger, Outcome};
use crate::core::{AccountDirectory, EscrowTarget, FeeEngine, LedgerEngine, TxContext};
use crate::types::{
    AccountType, Address, Amount, BalanceLog, ContractDocument, FeeKind, LedgerError, TxTime,
};

/// Arguments of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Sending account; the invoker's personal account of the receiver's token when absent
    pub sender: Option<String>,
    pub receiver: String,
    pub amount: Amount,
    pub memo: String,
    /// Credit the receiver only after this time
    pub pending_time: Option<TxTime>,
    /// Contract expiry in seconds for escrowed transfers
    pub expiry_secs: Option<i64>,
    /// Accounts whose holders must also sign
    pub extra_signers: Vec<String>,
}

impl TransferRequest {
    pub fn new(receiver: impl Into<String>, amount: Amount) -> Self {
        TransferRequest {
            sender: None,
            receiver: receiver.into(),
            amount,
            memo: String::new(),
            pending_time: None,
            expiry_secs: None,
            extra_signers: Vec::new(),
        }
    }
}

impl Ledger {
    /// Transfer value between two accounts of the same token
    ///
    /// The route depends on who must sign and when the receiver is credited:
    /// - more than one signer (a joint sender or extra signers): the amount and fee
    ///   are escrowed for a contract and the receiver is credited on finalize
    /// - a single signer and a future `pending_time`: the receiver gets a time-locked
    ///   pending balance
    /// - otherwise: the receiver is credited immediately
    ///
    /// # Returns
    ///
    /// The sender's log, or the escrow contract.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount`, `InvalidAddress`, `TokenMismatch`, `SelfTransfer` before any read
    /// * `NotHolder` unless the invoker holds the sender account
    /// * `AccountSuspended` for a suspended sender or receiver
    /// * `InsufficientBalance` if the sender cannot cover amount plus fee
    /// * `TooManySigners` for more signers than allowed
    pub fn transfer(&self, ctx: TxContext, request: TransferRequest) -> Result<Outcome<BalanceLog>, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::invalid_amount(&request.amount.to_string()));
        }
        let receiver = Address::parse(&request.receiver)?;
        let sender = request.sender.as_deref().map(Address::parse).transpose()?;
        if let Some(sender) = &sender {
            check_pair(sender, &receiver)?;
        }
        for address in &request.extra_signers {
            Address::parse(address)?;
        }

        self.run(ctx, "transfer", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let sender = match sender {
                Some(sender) => sender,
                None => {
                    let sender = Address::derive(receiver.code(), AccountType::Personal, &invoker)?;
                    check_pair(&sender, &receiver)?;
                    sender
                }
            };
            let memo = self.config.truncate_memo(&request.memo);

            let mut directory = AccountDirectory::new(session);
            let sender_account = directory.authorized(&sender, &invoker)?;
            directory.active(&receiver)?;

            let fee = FeeEngine::new(session).calc_fee(&sender, FeeKind::Transfer, &request.amount)?;
            let mut sender_balance = LedgerEngine::new(session).get_balance(&sender)?;

            let mut signers = sender_account.holders();
            signers.insert(invoker);
            signers.extend(holders_of(session, receiver.code(), &request.extra_signers)?);
            self.check_signers(&signers)?;

            if signers.len() > 1 {
                let document = ContractDocument::Transfer {
                    pending_balance_id: session.tx_id().to_string(),
                    sender: sender.clone(),
                    receiver: receiver.clone(),
                    amount: request.amount.clone(),
                    fee: fee.clone(),
                    memo: memo.clone(),
                    pending_time: request.pending_time,
                };
                let contract = self.escrow(session, document, request.expiry_secs, &signers)?;
                LedgerEngine::new(session).transfer_pending(
                    &mut sender_balance,
                    EscrowTarget::Contract(&contract),
                    request.amount,
                    fee,
                    &memo,
                )?;
                return Ok(Outcome::Escrowed(contract));
            }

            let now = session.now();
            let mut ledger = LedgerEngine::new(session);
            let log = match request.pending_time.filter(|release| *release > now) {
                Some(release_time) => {
                    let target = EscrowTarget::TimeLock {
                        receiver: &receiver,
                        release_time,
                    };
                    ledger
                        .transfer_pending(&mut sender_balance, target, request.amount, fee, &memo)?
                        .1
                }
                None => {
                    let mut receiver_balance = ledger.get_balance(&receiver)?;
                    ledger.transfer_instant(&mut sender_balance, &mut receiver_balance, request.amount, fee, &memo)?
                }
            };
            Ok(Outcome::Applied(log))
        })
    }
}

fn check_pair(sender: &Address, receiver: &Address) -> Result<(), LedgerError> {
    if sender.code() != receiver.code() {
        return Err(LedgerError::TokenMismatch {
            sender_token: sender.code().to_string(),
            receiver_token: receiver.code().to_string(),
        });
    }
    if sender == receiver {
        return Err(LedgerError::SelfTransfer {
            address: sender.to_string(),
        });
    }
    Ok(())
}
