//! Balance engine
//!
//! Every balance mutation in the ledger goes through `LedgerEngine`. Each one:
//! 1. Applies a checked delta to the balance (never below zero)
//! 2. Writes the balance back
//! 3. Appends exactly one balance log row describing the delta
//!
//! It also owns pending balances, the value that has been debited from a sender but
//! not yet credited anywhere: time-locked transfers and contract escrows.

use crate::core::context::Session;
use crate::core::fees::FeeEngine;
use crate::store::{keys, KeyRange};
use crate::types::{
    Address, Amount, Balance, BalanceLog, BalanceLogType, Contract, LedgerError, PageRequest,
    PendingBalance, PendingBalanceType, PendingSort, QueryResult, TimeRange, TxTime,
};
use tracing::debug;

/// Where a debited-but-not-credited amount waits
#[derive(Debug, Clone, Copy)]
pub enum EscrowTarget<'c> {
    /// Owed to `receiver` once `release_time` has passed
    TimeLock { receiver: &'c Address, release_time: TxTime },
    /// Held for a contract until it is finalized or cancelled
    Contract(&'c Contract),
}

/// What finalizing a pending balance produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The receiver was credited
    Credited(BalanceLog),
    /// The value moved into a new time-locked pending balance for the receiver
    Relocked(PendingBalance),
}

pub struct LedgerEngine<'a> {
    session: &'a mut Session,
}

impl<'a> LedgerEngine<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        LedgerEngine { session }
    }

    /// Write the zero balance of a new account
    pub fn create_balance(&mut self, address: &Address) -> Result<Balance, LedgerError> {
        let balance = Balance::new(address.clone(), self.session.now());
        self.put_balance(&balance)?;
        Ok(balance)
    }

    /// Load the balance of `address`
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` when the account has no balance record.
    pub fn get_balance(&mut self, address: &Address) -> Result<Balance, LedgerError> {
        self.session
            .get(&keys::balance(address))?
            .ok_or_else(|| LedgerError::account_not_found(address))
    }

    pub fn put_balance(&mut self, balance: &Balance) -> Result<(), LedgerError> {
        self.session.put(keys::balance(&balance.address), balance)
    }

    /// Append a balance log row
    pub fn put_log(&mut self, log: &BalanceLog) -> Result<(), LedgerError> {
        let seq = self.session.next_log_seq();
        let key = keys::balance_log(&log.address, &log.created_time, self.session.tx_id(), seq);
        self.session.put(key, log)
    }

    /// Apply `diff` to `balance`, store it and log it
    fn mutate(
        &mut self,
        balance: &mut Balance,
        log_type: BalanceLogType,
        rid: &str,
        diff: Amount,
        decorate: impl FnOnce(BalanceLog) -> BalanceLog,
    ) -> Result<BalanceLog, LedgerError> {
        balance.apply(&diff, self.session.now())?;
        self.put_balance(balance)?;
        let log = decorate(BalanceLog::new(balance, log_type, rid, diff));
        self.put_log(&log)?;
        debug!(
            parent: self.session.span(),
            address = %balance.address,
            kind = %log_type,
            diff = %log.diff,
            amount = %balance.amount,
            "balance updated"
        );
        Ok(log)
    }

    /// Mint (positive `diff`) or burn (negative `diff`) on the genesis balance
    ///
    /// # Errors
    ///
    /// * `Supply` for a zero delta
    /// * `InsufficientBalance` when a burn exceeds the balance
    pub fn supply(&mut self, balance: &mut Balance, code: &str, diff: Amount) -> Result<BalanceLog, LedgerError> {
        if diff.is_zero() {
            return Err(LedgerError::supply(code, "supply change must not be zero"));
        }
        let log_type = if diff.is_positive() {
            BalanceLogType::Mint
        } else {
            BalanceLogType::Burn
        };
        self.mutate(balance, log_type, code, diff, |log| log)
    }

    /// Credit the net result of a fee or pay prune
    ///
    /// `diff` may be negative when refunds outweigh pays; the balance must still not
    /// go below zero. The log carries the pruned id range.
    pub fn credit_prune(
        &mut self,
        balance: &mut Balance,
        log_type: BalanceLogType,
        rid: &str,
        diff: Amount,
        fee: Option<Amount>,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<BalanceLog, LedgerError> {
        self.mutate(balance, log_type, rid, diff, |log| {
            log.with_fee(fee).with_prune_range(start, end)
        })
    }

    /// Move `amount` from `sender` to `receiver` immediately
    ///
    /// The sender pays `amount + fee`; the fee is recorded against the token for a
    /// later fee prune.
    ///
    /// # Returns
    ///
    /// The sender's `Send` log. The receiver gets a matching `Receive` log.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` unless `amount > 0` and `fee >= 0`
    /// * `SelfTransfer` if both balances are the same account
    /// * `InsufficientBalance` if the sender holds less than `amount + fee`
    pub fn transfer_instant(
        &mut self,
        sender: &mut Balance,
        receiver: &mut Balance,
        amount: Amount,
        fee: Amount,
        memo: &str,
    ) -> Result<BalanceLog, LedgerError> {
        if sender.address == receiver.address {
            return Err(LedgerError::SelfTransfer {
                address: sender.address.to_string(),
            });
        }
        let total = debit_total(sender, &amount, &fee)?;

        let receiver_rid = receiver.address.to_string();
        let sender_rid = sender.address.to_string();
        self.mutate(receiver, BalanceLogType::Receive, &sender_rid, amount, |log| {
            log.with_memo(memo)
        })?;
        let log = self.mutate(sender, BalanceLogType::Send, &receiver_rid, -total, |log| {
            log.with_fee(Some(fee.clone())).with_memo(memo)
        })?;
        FeeEngine::new(&mut *self.session).record(&sender.address, fee)?;
        Ok(log)
    }

    /// Debit `sender` into a pending balance
    ///
    /// A time lock is owned by the receiver, keyed by the transaction id, and its
    /// fee is charged right away. A contract escrow is owned by the sender, keyed
    /// by the transaction id with the contract id as `rid`, and carries its fee
    /// until the contract settles.
    pub fn transfer_pending(
        &mut self,
        sender: &mut Balance,
        target: EscrowTarget<'_>,
        amount: Amount,
        fee: Amount,
        memo: &str,
    ) -> Result<(PendingBalance, BalanceLog), LedgerError> {
        let total = debit_total(sender, &amount, &fee)?;
        let now = self.session.now();

        let (pending, log) = match target {
            EscrowTarget::TimeLock { receiver, release_time } => {
                if *receiver == sender.address {
                    return Err(LedgerError::SelfTransfer {
                        address: sender.address.to_string(),
                    });
                }
                let pending = PendingBalance {
                    id: self.session.tx_id().to_string(),
                    pending_type: PendingBalanceType::Account,
                    account: receiver.clone(),
                    rid: sender.address.to_string(),
                    amount,
                    fee: None,
                    memo: memo.to_string(),
                    created_time: now,
                    pending_time: release_time,
                };
                let log = self.mutate(sender, BalanceLogType::Send, &receiver.to_string(), -total, |log| {
                    log.with_fee(Some(fee.clone())).with_memo(memo)
                })?;
                FeeEngine::new(&mut *self.session).record(&sender.address, fee)?;
                (pending, log)
            }
            EscrowTarget::Contract(contract) => {
                let pending = PendingBalance {
                    id: self.session.tx_id().to_string(),
                    pending_type: PendingBalanceType::Contract,
                    account: sender.address.clone(),
                    rid: contract.id.clone(),
                    amount,
                    fee: Some(fee.clone()).filter(|f| !f.is_zero()),
                    memo: memo.to_string(),
                    created_time: now,
                    pending_time: contract.expiry_time,
                };
                let log = self.mutate(sender, BalanceLogType::Deposit, &contract.id, -total, |log| {
                    log.with_fee(Some(fee)).with_memo(memo)
                })?;
                (pending, log)
            }
        };

        self.put_pending(&pending)?;
        Ok((pending, log))
    }

    /// Release a pending balance to `receiver`
    ///
    /// When `relock_until` lies in the future the value is wrapped into a new
    /// time-locked pending balance instead of being credited. Any fee carried by the
    /// pending balance is recorded, and the pending balance is deleted.
    pub fn finalize_pending(
        &mut self,
        pending: &PendingBalance,
        receiver: &mut Balance,
        relock_until: Option<TxTime>,
    ) -> Result<Settlement, LedgerError> {
        let now = self.session.now();
        let settlement = match relock_until.filter(|release| *release > now) {
            Some(release_time) => {
                let relocked = PendingBalance {
                    id: self.session.tx_id().to_string(),
                    pending_type: PendingBalanceType::Account,
                    account: receiver.address.clone(),
                    rid: pending.account.to_string(),
                    amount: pending.amount.clone(),
                    fee: None,
                    memo: pending.memo.clone(),
                    created_time: now,
                    pending_time: release_time,
                };
                self.put_pending(&relocked)?;
                Settlement::Relocked(relocked)
            }
            None => {
                let log = self.mutate(
                    receiver,
                    BalanceLogType::Receive,
                    &pending.account.to_string(),
                    pending.amount.clone(),
                    |log| log.with_memo(&pending.memo),
                )?;
                Settlement::Credited(log)
            }
        };

        if let Some(fee) = &pending.fee {
            FeeEngine::new(&mut *self.session).record(&pending.account, fee.clone())?;
        }
        self.delete_pending(pending);
        Ok(settlement)
    }

    /// Return a pending balance (amount plus fee) to its owner and delete it
    pub fn withdraw_pending(&mut self, pending: &PendingBalance) -> Result<BalanceLog, LedgerError> {
        let total = pending.total();
        let mut owner = self.get_balance(&pending.account)?;
        let log = self.mutate(&mut owner, BalanceLogType::Withdraw, &pending.id, total, |log| {
            log.with_memo(&pending.memo)
        })?;
        self.delete_pending(pending);
        Ok(log)
    }

    /// Load a pending balance
    ///
    /// # Errors
    ///
    /// Returns `PendingBalanceNotFound` for an unknown or already settled id.
    pub fn get_pending(&mut self, id: &str) -> Result<PendingBalance, LedgerError> {
        self.session
            .get(&keys::pending(id))?
            .ok_or_else(|| LedgerError::PendingBalanceNotFound { id: id.to_string() })
    }

    pub fn put_pending(&mut self, pending: &PendingBalance) -> Result<(), LedgerError> {
        self.session.put(keys::pending(&pending.id), pending)?;
        self.session.put(
            keys::pending_by_created(&pending.account, &pending.created_time, &pending.id),
            &pending.id,
        )?;
        self.session.put(
            keys::pending_by_release(&pending.account, &pending.pending_time, &pending.id),
            &pending.id,
        )
    }

    pub fn delete_pending(&mut self, pending: &PendingBalance) {
        self.session.delete(keys::pending(&pending.id));
        self.session
            .delete(keys::pending_by_created(&pending.account, &pending.created_time, &pending.id));
        self.session
            .delete(keys::pending_by_release(&pending.account, &pending.pending_time, &pending.id));
    }

    /// Page through the pending balances owned by `owner`
    pub fn list_pending(
        &mut self,
        owner: &Address,
        sort: PendingSort,
        page: &PageRequest,
    ) -> Result<QueryResult<PendingBalance>, LedgerError> {
        let prefix = match sort {
            PendingSort::CreatedTime => keys::pending_by_created_prefix(owner),
            PendingSort::PendingTime => keys::pending_by_release_prefix(owner),
        };
        let ids: QueryResult<String> = self.session.page(&KeyRange::prefix(&prefix), page, |_| true)?;

        let mut records = Vec::with_capacity(ids.records.len());
        for id in &ids.records {
            records.push(self.get_pending(id)?);
        }
        Ok(QueryResult::new(records, ids.meta.bookmark))
    }

    /// Page through the balance logs of `address`
    pub fn logs(
        &mut self,
        address: &Address,
        log_type: Option<BalanceLogType>,
        range: &TimeRange,
        page: &PageRequest,
    ) -> Result<QueryResult<BalanceLog>, LedgerError> {
        let window = KeyRange::time_window(&keys::balance_log_prefix(address), range);
        self.session
            .page(&window, page, |log: &BalanceLog| log_type.map_or(true, |t| log.log_type == t))
    }
}

/// Validate a debit of `amount + fee` from `sender`
fn debit_total(sender: &Balance, amount: &Amount, fee: &Amount) -> Result<Amount, LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::invalid_amount(&amount.to_string()));
    }
    if fee.is_negative() {
        return Err(LedgerError::invalid_amount(&fee.to_string()));
    }
    let total = amount + fee;
    if sender.amount < total {
        return Err(LedgerError::insufficient_balance(&sender.address, sender.amount.clone(), total));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{funded, session_at, H1, H2};
    use crate::store::MemoryStore;
    use crate::types::{AccountType, ContractDocument, SortOrder};
    use rstest::rstest;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn amt(value: i64) -> Amount {
        Amount::from_i64(value)
    }

    fn two_accounts(session: &mut Session) -> (Balance, Balance) {
        let a = funded(session, "ABC", H1, 100);
        let b = funded(session, "ABC", H2, 0);
        (a, b)
    }

    #[rstest]
    #[case::no_fee(30, 0, 70, 30)]
    #[case::with_fee(30, 3, 67, 30)]
    #[case::whole_balance(97, 3, 0, 97)]
    fn test_transfer_instant_conserves_value(
        #[case] amount: i64,
        #[case] fee: i64,
        #[case] sender_after: i64,
        #[case] receiver_after: i64,
    ) {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, mut b) = two_accounts(&mut session);

        let log = LedgerEngine::new(&mut session)
            .transfer_instant(&mut a, &mut b, amt(amount), amt(fee), "memo")
            .unwrap();

        assert_eq!(a.amount, amt(sender_after));
        assert_eq!(b.amount, amt(receiver_after));
        assert_eq!(log.log_type, BalanceLogType::Send);
        assert_eq!(log.diff, amt(-(amount + fee)));
        assert_eq!(log.amount, amt(sender_after));
    }

    #[rstest]
    #[case::zero_amount(0, 0)]
    #[case::negative_fee(10, -1)]
    fn test_transfer_rejects_invalid_amounts(#[case] amount: i64, #[case] fee: i64) {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, mut b) = two_accounts(&mut session);
        let err = LedgerEngine::new(&mut session)
            .transfer_instant(&mut a, &mut b, amt(amount), amt(fee), "")
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, mut b) = two_accounts(&mut session);
        let err = LedgerEngine::new(&mut session)
            .transfer_instant(&mut a, &mut b, amt(100), amt(1), "")
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(a.amount, amt(100));
    }

    #[test]
    fn test_time_lock_then_withdraw() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, b) = two_accounts(&mut session);
        let release = TxTime::from_unix(1_000, 0).unwrap();

        let mut engine = LedgerEngine::new(&mut session);
        let (pending, _) = engine
            .transfer_pending(
                &mut a,
                EscrowTarget::TimeLock {
                    receiver: &b.address,
                    release_time: release,
                },
                amt(40),
                amt(0),
                "later",
            )
            .unwrap();
        assert_eq!(a.amount, amt(60));
        assert_eq!(pending.account, b.address);
        assert_eq!(pending.pending_type, PendingBalanceType::Account);

        let log = engine.withdraw_pending(&pending).unwrap();
        assert_eq!(log.log_type, BalanceLogType::Withdraw);
        assert_eq!(log.amount, amt(40));
        assert!(matches!(
            engine.get_pending(&pending.id).unwrap_err(),
            LedgerError::PendingBalanceNotFound { .. }
        ));
    }

    #[test]
    fn test_contract_escrow_carries_fee_until_settled() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, mut b) = two_accounts(&mut session);
        let contract = Contract {
            id: "contract-tx1".to_string(),
            document: ContractDocument::TokenMint {
                token: "ABC".to_string(),
                amount: amt(1),
            },
            signers: BTreeSet::from([H1.to_string(), H2.to_string()]),
            created_time: TxTime::from_unix(100, 0).unwrap(),
            expiry_time: TxTime::from_unix(200, 0).unwrap(),
        };

        let mut engine = LedgerEngine::new(&mut session);
        let (pending, log) = engine
            .transfer_pending(&mut a, EscrowTarget::Contract(&contract), amt(30), amt(2), "")
            .unwrap();
        assert_eq!(log.log_type, BalanceLogType::Deposit);
        assert_eq!(a.amount, amt(68));
        assert_eq!(pending.rid, contract.id);
        assert_eq!(pending.fee, Some(amt(2)));

        let settlement = engine.finalize_pending(&pending, &mut b, None).unwrap();
        let Settlement::Credited(receive) = settlement else {
            panic!("expected a credit");
        };
        assert_eq!(receive.diff, amt(30));
        assert_eq!(b.amount, amt(30));
    }

    #[test]
    fn test_finalize_with_future_release_relocks() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let (mut a, mut b) = two_accounts(&mut session);
        let contract = Contract {
            id: "c".to_string(),
            document: ContractDocument::TokenBurn {
                token: "ABC".to_string(),
                amount: amt(1),
            },
            signers: BTreeSet::new(),
            created_time: TxTime::from_unix(100, 0).unwrap(),
            expiry_time: TxTime::from_unix(200, 0).unwrap(),
        };
        let mut engine = LedgerEngine::new(&mut session);
        let (pending, _) = engine
            .transfer_pending(&mut a, EscrowTarget::Contract(&contract), amt(10), amt(0), "")
            .unwrap();

        let release = TxTime::from_unix(5_000, 0).unwrap();
        let Settlement::Relocked(relocked) = engine.finalize_pending(&pending, &mut b, Some(release)).unwrap()
        else {
            panic!("expected a relock");
        };
        assert_eq!(relocked.account, b.address);
        assert_eq!(relocked.pending_time, release);
        assert_eq!(b.amount, amt(0));
    }

    #[test]
    fn test_supply_rejects_zero_and_logs_kind() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "tx1", 100, Some(H1));
        let mut genesis = funded(&mut session, "ABC", H1, 0);
        let mut engine = LedgerEngine::new(&mut session);

        assert!(matches!(
            engine.supply(&mut genesis, "ABC", Amount::ZERO).unwrap_err(),
            LedgerError::Supply { .. }
        ));
        let log = engine.supply(&mut genesis, "ABC", amt(50)).unwrap();
        assert_eq!(log.log_type, BalanceLogType::Mint);
        let log = engine.supply(&mut genesis, "ABC", amt(-20)).unwrap();
        assert_eq!(log.log_type, BalanceLogType::Burn);
        assert_eq!(genesis.amount, amt(30));
    }

    #[test]
    fn test_pending_list_by_release_time() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(&store, "seed", 100, Some(H1));
        let (_, b) = two_accounts(&mut session);
        session.commit().unwrap();

        for (tx, release) in [("t1", 900), ("t2", 300), ("t3", 600)] {
            let mut session = session_at(&store, tx, 110, Some(H1));
            let mut engine = LedgerEngine::new(&mut session);
            let a_address = crate::types::Address::derive("ABC", AccountType::Personal, H1).unwrap();
            let mut a = engine.get_balance(&a_address).unwrap();
            engine
                .transfer_pending(
                    &mut a,
                    EscrowTarget::TimeLock {
                        receiver: &b.address,
                        release_time: TxTime::from_unix(release, 0).unwrap(),
                    },
                    amt(5),
                    amt(0),
                    "",
                )
                .unwrap();
            session.commit().unwrap();
        }

        let mut session = session_at(&store, "q", 120, Some(H2));
        let listed = LedgerEngine::new(&mut session)
            .list_pending(&b.address, PendingSort::PendingTime, &PageRequest::new(None, 10, SortOrder::Asc))
            .unwrap();
        let ids: Vec<&str> = listed.records.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3", "t1"]);
    }
}
