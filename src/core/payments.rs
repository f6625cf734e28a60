//! Payment engine
//!
//! A pay debits the payer immediately but does not credit the merchant: the amount
//! is recorded as a pay row under the merchant, and a later pay prune sums a batch
//! of rows (pays positive, refunds negative) and credits `sum - fee` in one step.
//!
//! Two lookup indexes are kept next to the rows: pay id to merchant, and order id to
//! the first pay that used it.

use crate::core::context::Session;
use crate::core::ledger::LedgerEngine;
use crate::store::{keys, KeyRange};
use crate::types::{
    Address, Amount, Balance, BalanceLog, BalanceLogType, LedgerError, PageRequest, Pay, PayResult,
    PaySum, PendingBalance, QueryResult, SortOrder, TimeRange, TxTime,
};
use tracing::debug;

pub struct PaymentEngine<'a> {
    session: &'a mut Session,
}

impl<'a> PaymentEngine<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        PaymentEngine { session }
    }

    /// Debit `amount` from `sender` and record a pay to `merchant`
    ///
    /// The payer is charged `amount` only. `fee` is the merchant-side fee deducted
    /// when the pay is pruned.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` unless `amount > 0`
    /// * `SelfTransfer` if the payer is the merchant
    /// * `InsufficientBalance` if the payer holds less than `amount`
    pub fn pay(
        &mut self,
        sender: &mut Balance,
        merchant: &Address,
        amount: Amount,
        fee: Amount,
        order_id: Option<&str>,
        memo: &str,
    ) -> Result<PayResult, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        if sender.address == *merchant {
            return Err(LedgerError::SelfTransfer {
                address: merchant.to_string(),
            });
        }
        if sender.amount < amount {
            return Err(LedgerError::insufficient_balance(&sender.address, sender.amount.clone(), amount));
        }

        let now = self.session.now();
        let pay = Pay {
            pay_id: keys::ordered_id(&now, self.session.tx_id()),
            address: merchant.clone(),
            amount: amount.clone(),
            fee,
            total_refund: Amount::ZERO,
            rid: sender.address.to_string(),
            parent_id: None,
            order_id: order_id.map(str::to_string),
            memo: memo.to_string(),
            created_time: now,
        };
        self.put_new_pay(&pay)?;

        let debit = -amount;
        sender.apply(&debit, now)?;
        let mut ledger = LedgerEngine::new(&mut *self.session);
        ledger.put_balance(sender)?;
        let balance_log = BalanceLog::new(sender, BalanceLogType::Pay, merchant.to_string(), debit)
            .with_memo(memo)
            .with_pay_id(&pay.pay_id);
        ledger.put_log(&balance_log)?;

        debug!(parent: self.session.span(), merchant = %merchant, pay_id = %pay.pay_id, "pay recorded");
        Ok(PayResult { pay, balance_log })
    }

    /// Record the pay of an escrowed amount and delete its pending balance
    ///
    /// The payer was already debited when the escrow was created.
    pub fn settle_pending(
        &mut self,
        pending: &PendingBalance,
        merchant: &Address,
        fee: Amount,
        order_id: Option<&str>,
        memo: &str,
    ) -> Result<Pay, LedgerError> {
        if pending.account == *merchant {
            return Err(LedgerError::SelfTransfer {
                address: merchant.to_string(),
            });
        }
        let now = self.session.now();
        let pay = Pay {
            pay_id: keys::ordered_id(&now, self.session.tx_id()),
            address: merchant.clone(),
            amount: pending.amount.clone(),
            fee,
            total_refund: Amount::ZERO,
            rid: pending.account.to_string(),
            parent_id: None,
            order_id: order_id.map(str::to_string),
            memo: memo.to_string(),
            created_time: now,
        };
        self.put_new_pay(&pay)?;
        LedgerEngine::new(&mut *self.session).delete_pending(pending);
        Ok(pay)
    }

    /// Refund part or all of `parent` to `receiver`
    ///
    /// Writes a refund row with negative amount and fee, raises the parent's
    /// `total_refund` and credits the receiver. The refunded fee is the parent's
    /// whole fee for a full refund and `floor(amount * fee / parent.amount)`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if `parent` is itself a refund
    /// * `InvalidAmount` unless `amount > 0`
    /// * `RefundExceedsOriginal` if refunds would exceed the pay amount
    pub fn refund(
        &mut self,
        parent: &mut Pay,
        receiver: &mut Balance,
        amount: Amount,
        memo: &str,
    ) -> Result<BalanceLog, LedgerError> {
        if parent.is_refund() {
            return Err(LedgerError::invalid_argument(format!(
                "pay {} is a refund and cannot be refunded",
                parent.pay_id
            )));
        }
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        let total_refund = &parent.total_refund + &amount;
        if total_refund > parent.amount {
            return Err(LedgerError::RefundExceedsOriginal {
                pay_id: parent.pay_id.clone(),
                requested: amount,
                remaining: parent.refundable(),
            });
        }

        let fee = if amount == parent.amount {
            parent.fee.clone()
        } else {
            parent
                .fee
                .mul_ratio(&amount, &parent.amount)
                .ok_or_else(|| LedgerError::invalid_amount(&parent.amount.to_string()))?
        };

        let now = self.session.now();
        let refund = Pay {
            pay_id: keys::ordered_id(&now, self.session.tx_id()),
            address: parent.address.clone(),
            amount: -&amount,
            fee: -fee,
            total_refund: Amount::ZERO,
            rid: receiver.address.to_string(),
            parent_id: Some(parent.pay_id.clone()),
            order_id: None,
            memo: memo.to_string(),
            created_time: now,
        };
        self.put_new_pay(&refund)?;

        parent.total_refund = total_refund;
        self.session.put(keys::pay(&parent.address, &parent.pay_id), &*parent)?;

        receiver.apply(&amount, now)?;
        let mut ledger = LedgerEngine::new(&mut *self.session);
        ledger.put_balance(receiver)?;
        let log = BalanceLog::new(receiver, BalanceLogType::Refund, parent.address.to_string(), amount)
            .with_memo(memo)
            .with_pay_id(&refund.pay_id);
        ledger.put_log(&log)?;
        Ok(log)
    }

    /// Sum up to `max_batch` pay rows of `merchant` after `cursor`, up to `until`
    ///
    /// Read-only, like the fee prune.
    pub fn prune(
        &mut self,
        merchant: &Address,
        cursor: Option<&str>,
        until: TxTime,
        max_batch: usize,
    ) -> Result<PaySum, LedgerError> {
        let window = KeyRange::time_window(
            &keys::pay_prefix(merchant),
            &TimeRange {
                start: None,
                end: Some(until),
            },
        );
        let after = cursor.map(|id| keys::pay(merchant, id));
        let rows: Vec<(String, Pay)> = self
            .session
            .scan(&window, after.as_deref(), SortOrder::Asc, max_batch + 1)?;

        let mut sum = PaySum {
            has_more: rows.len() > max_batch,
            ..PaySum::default()
        };
        for (_, pay) in rows.into_iter().take(max_batch) {
            sum.sum += &pay.amount;
            sum.fee += &pay.fee;
            sum.count += 1;
            if sum.start.is_none() {
                sum.start = Some(pay.pay_id.clone());
            }
            sum.end = Some(pay.pay_id);
        }
        Ok(sum)
    }

    /// Load a pay by id
    ///
    /// # Errors
    ///
    /// Returns `PayNotFound` for an unknown id.
    pub fn get(&mut self, pay_id: &str) -> Result<Pay, LedgerError> {
        let not_found = || LedgerError::PayNotFound { id: pay_id.to_string() };
        let merchant: Address = self.session.get(&keys::pay_id_index(pay_id))?.ok_or_else(not_found)?;
        self.session
            .get(&keys::pay(&merchant, pay_id))?
            .ok_or_else(not_found)
    }

    /// Load the first pay recorded with `order_id`
    pub fn get_by_order_id(&mut self, order_id: &str) -> Result<Pay, LedgerError> {
        let pay_id: String = self
            .session
            .get(&keys::pay_order_index(order_id))?
            .ok_or_else(|| LedgerError::PayNotFound {
                id: format!("order {}", order_id),
            })?;
        self.get(&pay_id)
    }

    /// Page through the pay and refund rows of `merchant`
    pub fn list(
        &mut self,
        merchant: &Address,
        range: &TimeRange,
        page: &PageRequest,
    ) -> Result<QueryResult<Pay>, LedgerError> {
        let window = KeyRange::time_window(&keys::pay_prefix(merchant), range);
        self.session.page(&window, page, |_| true)
    }

    fn put_new_pay(&mut self, pay: &Pay) -> Result<(), LedgerError> {
        self.session.put(keys::pay(&pay.address, &pay.pay_id), pay)?;
        self.session.put(keys::pay_id_index(&pay.pay_id), &pay.address)?;
        if let Some(order_id) = pay.order_id.as_deref() {
            let index = keys::pay_order_index(order_id);
            if !self.session.exists(&index)? {
                self.session.put(index, &pay.pay_id)?;
            }
        }
        Ok(())
    }
}
