//! Pay, refund and pay-prune operations

use super::{scope_address, Ledger, Outcome};
use crate::core::{AccountDirectory, EscrowTarget, FeeEngine, LedgerEngine, PaymentEngine, TxContext};
use crate::types::{
    AccountType, Address, Amount, BalanceLog, BalanceLogType, ContractDocument, FeeKind, LedgerError,
    PageRequest, Pay, PayResult, PaySum, QueryResult, TimeRange, TxTime,
};
use tracing::info;

/// Arguments of a pay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayRequest {
    /// Paying account; the invoker's personal account of the merchant's token when absent
    pub sender: Option<String>,
    pub merchant: String,
    pub amount: Amount,
    pub order_id: Option<String>,
    pub memo: String,
    /// Contract expiry in seconds for escrowed pays
    pub expiry_secs: Option<i64>,
}

impl PayRequest {
    pub fn new(merchant: impl Into<String>, amount: Amount) -> Self {
        PayRequest {
            sender: None,
            merchant: merchant.into(),
            amount,
            order_id: None,
            memo: String::new(),
            expiry_secs: None,
        }
    }
}

impl Ledger {
    /// Pay a merchant
    ///
    /// The payer is debited now; the merchant is credited by a later pay prune,
    /// net of the merchant fee computed here. A joint payer escrows the amount and
    /// the pay row is written on finalize.
    pub fn pay(&self, ctx: TxContext, request: PayRequest) -> Result<Outcome<PayResult>, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::invalid_amount(&request.amount.to_string()));
        }
        let merchant = Address::parse(&request.merchant)?;
        let sender = request.sender.as_deref().map(Address::parse).transpose()?;
        let order_id = request.order_id.as_deref().filter(|id| !id.trim().is_empty());

        self.run(ctx, "pay", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let sender = match sender {
                Some(sender) => sender,
                None => Address::derive(merchant.code(), AccountType::Personal, &invoker)?,
            };
            if sender.code() != merchant.code() {
                return Err(LedgerError::TokenMismatch {
                    sender_token: sender.code().to_string(),
                    receiver_token: merchant.code().to_string(),
                });
            }
            let memo = self.config.truncate_memo(&request.memo);

            let mut directory = AccountDirectory::new(session);
            let sender_account = directory.authorized(&sender, &invoker)?;
            directory.active(&merchant)?;
            let mut sender_balance = LedgerEngine::new(session).get_balance(&sender)?;

            let mut signers = sender_account.holders();
            signers.insert(invoker);
            self.check_signers(&signers)?;

            if signers.len() > 1 {
                if sender == merchant {
                    return Err(LedgerError::SelfTransfer {
                        address: merchant.to_string(),
                    });
                }
                let document = ContractDocument::Pay {
                    pending_balance_id: session.tx_id().to_string(),
                    sender: sender.clone(),
                    receiver: merchant.clone(),
                    amount: request.amount.clone(),
                    order_id: order_id.map(str::to_string),
                    memo: memo.clone(),
                };
                let contract = self.escrow(session, document, request.expiry_secs, &signers)?;
                LedgerEngine::new(session).transfer_pending(
                    &mut sender_balance,
                    EscrowTarget::Contract(&contract),
                    request.amount,
                    Amount::ZERO,
                    &memo,
                )?;
                return Ok(Outcome::Escrowed(contract));
            }

            let fee = FeeEngine::new(session).calc_fee(&merchant, FeeKind::Pay, &request.amount)?;
            let result = PaymentEngine::new(session).pay(
                &mut sender_balance,
                &merchant,
                request.amount,
                fee,
                order_id,
                &memo,
            )?;
            Ok(Outcome::Applied(result))
        })
    }

    /// Refund part or all of a pay to its payer
    ///
    /// Only a holder of the merchant account may refund.
    pub fn pay_refund(
        &self,
        ctx: TxContext,
        parent_pay_id: &str,
        amount: Amount,
        memo: &str,
    ) -> Result<BalanceLog, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        self.run(ctx, "pay.refund", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let memo = self.config.truncate_memo(memo);
            let mut parent = PaymentEngine::new(session).get(parent_pay_id)?;
            AccountDirectory::new(session).authorized(&parent.address, &invoker)?;

            let payer = Address::parse(&parent.rid)?;
            AccountDirectory::new(session).active(&payer)?;
            let mut receiver = LedgerEngine::new(session).get_balance(&payer)?;
            PaymentEngine::new(session).refund(&mut parent, &mut receiver, amount, &memo)
        })
    }

    /// Credit the net of a batch of unpruned pays to the merchant account
    ///
    /// Sums pays and refunds after the account's cursor, credits `sum - fee`,
    /// records the fee portion as a fee charged to the merchant and advances the
    /// cursor. Nothing is written when no rows are found.
    pub fn pay_prune(
        &self,
        ctx: TxContext,
        scope: &str,
        safely: bool,
        end_time: Option<TxTime>,
    ) -> Result<PaySum, LedgerError> {
        self.run(ctx, "pay.prune", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let merchant = scope_address(session, scope)?;
            AccountDirectory::new(session).authorized(&merchant, &invoker)?;
            let until = self.prune_until(session.now(), safely, end_time);

            let mut balance = LedgerEngine::new(session).get_balance(&merchant)?;
            let sum = PaymentEngine::new(session).prune(
                &merchant,
                balance.last_pruned_pay_id.as_deref(),
                until,
                self.config.prune_batch_size,
            )?;
            if sum.count == 0 {
                return Ok(sum);
            }

            let net = &sum.sum - &sum.fee;
            balance.last_pruned_pay_id = sum.end.clone();
            LedgerEngine::new(session).credit_prune(
                &mut balance,
                BalanceLogType::PrunePay,
                merchant.code(),
                net.clone(),
                Some(sum.fee.clone()),
                sum.start.clone(),
                sum.end.clone(),
            )?;
            FeeEngine::new(session).record(&merchant, sum.fee.clone())?;

            info!(merchant = %merchant, count = sum.count, net = %net, has_more = sum.has_more, "pays pruned");
            Ok(sum)
        })
    }

    /// Pay by pay id, or by order id when no pay id is given
    pub fn pay_get(&self, ctx: TxContext, pay_id: Option<&str>, order_id: Option<&str>) -> Result<Pay, LedgerError> {
        let pay_id = pay_id.filter(|id| !id.is_empty());
        let order_id = order_id.filter(|id| !id.is_empty());
        if pay_id.is_none() && order_id.is_none() {
            return Err(LedgerError::invalid_argument("a pay id or an order id is required"));
        }
        self.run(ctx, "pay.get", |session| {
            let mut payments = PaymentEngine::new(session);
            match (pay_id, order_id) {
                (Some(id), _) => payments.get(id),
                (None, Some(order)) => payments.get_by_order_id(order),
                (None, None) => Err(LedgerError::invalid_argument("a pay id or an order id is required")),
            }
        })
    }

    /// Pay and refund rows of a merchant account
    pub fn pay_list(
        &self,
        ctx: TxContext,
        scope: &str,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<QueryResult<Pay>, LedgerError> {
        self.run(ctx, "pay.list", |session| {
            let merchant = scope_address(session, scope)?;
            AccountDirectory::new(session).get(&merchant)?;
            PaymentEngine::new(session).list(&merchant, &range, &page)
        })
    }
}
