//! Fee operations

use super::{token_code, Ledger};
use crate::core::{AccountDirectory, FeeEngine, LedgerEngine, TokenRegistry, TxContext};
use crate::types::{BalanceLogType, Fee, FeeSum, LedgerError, PageRequest, QueryResult, TimeRange, TxTime};
use tracing::info;

impl Ledger {
    /// Sweep a batch of unpruned fees of token `code` into the fee target
    ///
    /// Only a holder of the genesis account may prune. The sum is credited to the
    /// fee policy's target and the token's cursor advances to the last row summed,
    /// in the same transaction. A token without a fee policy, or a window with no
    /// rows, yields an empty sum and writes nothing.
    pub fn fee_prune(
        &self,
        ctx: TxContext,
        code: &str,
        safely: bool,
        end_time: Option<TxTime>,
    ) -> Result<FeeSum, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "fee.prune", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let mut token = TokenRegistry::new(session).get(&code)?;
            AccountDirectory::new(session).authorized(&token.genesis_account, &invoker)?;
            let Some(target) = token.fee_policy.as_ref().map(|p| p.target_address.clone()) else {
                return Ok(FeeSum::default());
            };

            let until = self.prune_until(session.now(), safely, end_time);
            let sum = FeeEngine::new(session).prune(
                &code,
                token.last_pruned_fee_id.as_deref(),
                until,
                self.config.prune_batch_size,
            )?;
            if sum.count == 0 {
                return Ok(sum);
            }

            let mut ledger = LedgerEngine::new(session);
            let mut balance = ledger.get_balance(&target)?;
            ledger.credit_prune(
                &mut balance,
                BalanceLogType::PruneFee,
                &code,
                sum.sum.clone(),
                None,
                sum.start.clone(),
                sum.end.clone(),
            )?;
            token.last_pruned_fee_id = sum.end.clone();
            token.updated_time = session.now();
            TokenRegistry::new(session).put(&token)?;

            info!(token = %code, count = sum.count, sum = %sum.sum, has_more = sum.has_more, "fees pruned");
            Ok(sum)
        })
    }

    /// Fee rows of token `code`
    pub fn fee_list(
        &self,
        ctx: TxContext,
        code: &str,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<QueryResult<Fee>, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "fee.list", |session| {
            TokenRegistry::new(session).get(&code)?;
            FeeEngine::new(session).list(&code, &range, &page)
        })
    }
}
