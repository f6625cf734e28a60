//! Fee engine
//!
//! Fees are not credited to the fee target when charged. Each charge appends a fee
//! row under its token, ordered by time; a later fee prune sums a batch of rows
//! after the token's cursor and credits the total to the target in one step.

use crate::core::context::Session;
use crate::store::{keys, KeyRange};
use crate::types::{
    Address, Amount, Fee, FeeKind, FeeSum, LedgerError, PageRequest, QueryResult, SortOrder, TimeRange,
    Token, TxTime,
};
use tracing::debug;

pub struct FeeEngine<'a> {
    session: &'a mut Session,
}

impl<'a> FeeEngine<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        FeeEngine { session }
    }

    /// Fee owed by `payer` for an operation of `kind` moving `amount`
    ///
    /// # Errors
    ///
    /// Returns `TokenNotIssued` if the payer's token has no token record.
    pub fn calc_fee(&mut self, payer: &Address, kind: FeeKind, amount: &Amount) -> Result<Amount, LedgerError> {
        let token: Token = self
            .session
            .get(&keys::token(payer.code()))?
            .ok_or_else(|| LedgerError::token_not_issued(payer.code()))?;
        token.calc_fee(payer, kind, amount)
    }

    /// Append a fee row charged to `payer`
    ///
    /// # Returns
    ///
    /// The stored row, or `None` for a zero fee (nothing is written).
    pub fn record(&mut self, payer: &Address, amount: Amount) -> Result<Option<Fee>, LedgerError> {
        if amount.is_zero() {
            return Ok(None);
        }
        let now = self.session.now();
        let fee = Fee {
            token: payer.code().to_string(),
            fee_id: keys::ordered_id(&now, self.session.tx_id()),
            account: payer.clone(),
            amount,
            created_time: now,
        };
        self.session.put(keys::fee(&fee.token, &fee.fee_id), &fee)?;
        debug!(parent: self.session.span(), payer = %payer, amount = %fee.amount, "fee recorded");
        Ok(Some(fee))
    }

    /// Sum up to `max_batch` fee rows of token `code` after `cursor`, up to `until`
    ///
    /// Read-only: the caller credits the sum and advances the cursor to `end`.
    /// `has_more` is set when rows remain in the window beyond the batch.
    pub fn prune(
        &mut self,
        code: &str,
        cursor: Option<&str>,
        until: TxTime,
        max_batch: usize,
    ) -> Result<FeeSum, LedgerError> {
        let window = KeyRange::time_window(
            &keys::fee_prefix(code),
            &TimeRange {
                start: None,
                end: Some(until),
            },
        );
        let after = cursor.map(|id| keys::fee(code, id));
        let rows: Vec<(String, Fee)> = self
            .session
            .scan(&window, after.as_deref(), SortOrder::Asc, max_batch + 1)?;

        let mut sum = FeeSum {
            has_more: rows.len() > max_batch,
            ..FeeSum::default()
        };
        for (_, fee) in rows.into_iter().take(max_batch) {
            sum.sum += &fee.amount;
            sum.count += 1;
            if sum.start.is_none() {
                sum.start = Some(fee.fee_id.clone());
            }
            sum.end = Some(fee.fee_id);
        }
        Ok(sum)
    }

    /// Page through the fee rows of token `code`
    pub fn list(&mut self, code: &str, range: &TimeRange, page: &PageRequest) -> Result<QueryResult<Fee>, LedgerError> {
        let window = KeyRange::time_window(&keys::fee_prefix(code), range);
        self.session.page(&window, page, |_| true)
    }
}
