//! Balance log and pending balance operations

use super::{scope_address, Ledger};
use crate::core::{AccountDirectory, LedgerEngine, TxContext};
use crate::types::{
    BalanceLog, BalanceLogType, LedgerError, PageRequest, PendingBalance, PendingBalanceType,
    PendingSort, QueryResult, TimeRange,
};

impl Ledger {
    /// Balance logs of an account, newest or oldest first, optionally of one type
    pub fn balance_logs(
        &self,
        ctx: TxContext,
        scope: &str,
        log_type: Option<BalanceLogType>,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<QueryResult<BalanceLog>, LedgerError> {
        self.run(ctx, "balance.logs", |session| {
            let address = scope_address(session, scope)?;
            AccountDirectory::new(session).get(&address)?;
            LedgerEngine::new(session).logs(&address, log_type, &range, &page)
        })
    }

    pub fn pending_get(&self, ctx: TxContext, id: &str) -> Result<PendingBalance, LedgerError> {
        self.run(ctx, "balance.pending.get", |session| LedgerEngine::new(session).get_pending(id))
    }

    /// Pending balances owned by an account, ordered by created or release time
    pub fn pending_list(
        &self,
        ctx: TxContext,
        scope: &str,
        sort: PendingSort,
        page: PageRequest,
    ) -> Result<QueryResult<PendingBalance>, LedgerError> {
        self.run(ctx, "balance.pending.list", |session| {
            let address = scope_address(session, scope)?;
            AccountDirectory::new(session).get(&address)?;
            LedgerEngine::new(session).list_pending(&address, sort, &page)
        })
    }

    /// Credit a released time-locked pending balance to its owner
    ///
    /// # Errors
    ///
    /// * `PendingBalanceNotFound` for an unknown or settled id
    /// * `InvalidArgument` for a contract escrow, which only its contract can settle
    /// * `NotHolder`/`AccountSuspended` unless the invoker holds the active owner account
    /// * `TooEarlyWithdrawal` before the release time
    pub fn pending_withdraw(&self, ctx: TxContext, id: &str) -> Result<BalanceLog, LedgerError> {
        self.run(ctx, "balance.pending.withdraw", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let pending = LedgerEngine::new(session).get_pending(id)?;
            if pending.pending_type != PendingBalanceType::Account {
                return Err(LedgerError::invalid_argument(format!(
                    "pending balance {} is held by contract {}",
                    pending.id, pending.rid
                )));
            }
            AccountDirectory::new(session).authorized(&pending.account, &invoker)?;
            if session.now() < pending.pending_time {
                return Err(LedgerError::TooEarlyWithdrawal {
                    id: pending.id.clone(),
                    release_time: pending.pending_time.to_string(),
                });
            }
            LedgerEngine::new(session).withdraw_pending(&pending)
        })
    }
}
