//! Map script rows onto ledger operations
//!
//! Arguments are positional. Empty trailing arguments take their defaults. Times are
//! unix seconds, paging arguments come last as `fetchSize, bookmark, asc|desc`.
//!
//! | op | arguments |
//! |----|-----------|
//! | `account/create` | code, co-holder addresses... |
//! | `account/get` | code or address |
//! | `account/list` | code?, paging |
//! | `account/holder/add` | joint address, target address |
//! | `account/holder/remove` | joint address, target address |
//! | `account/suspend`, `account/unsuspend` | code |
//! | `balance/logs` | code or address, type?, start?, end?, paging |
//! | `balance/pending/get` | id |
//! | `balance/pending/list` | code or address, created_time\|pending_time?, paging |
//! | `balance/pending/withdraw` | id |
//! | `token/create` | code, co-holder addresses... |
//! | `token/get`, `token/update` | code |
//! | `token/mint`, `token/burn` | code, amount |
//! | `transfer` | receiver, amount, memo?, pendingTime?, sender?, expirySecs?, extra signers... |
//! | `pay` | merchant, amount, orderId?, memo?, sender?, expirySecs? |
//! | `pay/refund` | payId, amount, memo? |
//! | `pay/prune` | code or address, safely?, end? |
//! | `pay/get` | payId?, orderId? |
//! | `pay/list` | code or address, start?, end?, paging |
//! | `fee/prune` | code, safely?, end? |
//! | `fee/list` | code, start?, end?, paging |
//! | `contract/execute`, `contract/cancel` | contract id |

use super::script::ScriptRecord;
use crate::core::{LocalContracts, TxContext};
use crate::service::{Ledger, PayRequest, TransferRequest};
use crate::types::{Amount, BalanceLogType, LedgerError, PageRequest, PendingSort, SortOrder, TimeRange, TxTime};
use serde::Serialize;
use serde_json::Value;

/// Run one script row against `ledger`
///
/// # Returns
///
/// The operation result as JSON.
///
/// # Errors
///
/// Returns the ledger error of the operation, or `InvalidArgument` for an unknown
/// op, a missing argument or a malformed one.
pub fn dispatch(ledger: &Ledger, contracts: &LocalContracts, record: &ScriptRecord) -> Result<Value, LedgerError> {
    let args = Args(&record.args);
    let mut ctx = TxContext::new(record.tx_id.clone(), record.timestamp);
    if let Some(invoker) = &record.invoker {
        ctx = ctx.with_invoker(invoker.clone());
    }

    match record.op.as_str() {
        "account/create" => json(ledger.account_create(ctx, args.required(0, "code")?, args.rest(1))?),
        "account/get" => json(ledger.account_get(ctx, args.required(0, "scope")?)?),
        "account/list" => json(ledger.account_list(ctx, args.optional(0), args.page(1)?)?),
        "account/holder/add" => json(ledger.account_holder_add(
            ctx,
            args.required(0, "joint address")?,
            args.required(1, "target address")?,
        )?),
        "account/holder/remove" => json(ledger.account_holder_remove(
            ctx,
            args.required(0, "joint address")?,
            args.required(1, "target address")?,
        )?),
        "account/suspend" => json(ledger.account_suspend(ctx, args.required(0, "code")?)?),
        "account/unsuspend" => json(ledger.account_unsuspend(ctx, args.required(0, "code")?)?),

        "balance/logs" => {
            let log_type = args.optional(1).map(str::parse::<BalanceLogType>).transpose()?;
            json(ledger.balance_logs(ctx, args.required(0, "scope")?, log_type, args.range(2)?, args.page(4)?)?)
        }
        "balance/pending/get" => json(ledger.pending_get(ctx, args.required(0, "id")?)?),
        "balance/pending/list" => {
            let sort = args.optional(1).unwrap_or_default().parse::<PendingSort>()?;
            json(ledger.pending_list(ctx, args.required(0, "scope")?, sort, args.page(2)?)?)
        }
        "balance/pending/withdraw" => json(ledger.pending_withdraw(ctx, args.required(0, "id")?)?),

        "token/create" => json(ledger.token_create(ctx, args.required(0, "code")?, args.rest(1))?),
        "token/get" => json(ledger.token_get(ctx, args.required(0, "code")?)?),
        "token/update" => json(ledger.token_update(ctx, args.required(0, "code")?)?),
        "token/mint" => json(ledger.token_mint(ctx, args.required(0, "code")?, args.amount(1)?)?),
        "token/burn" => json(ledger.token_burn(ctx, args.required(0, "code")?, args.amount(1)?)?),

        "transfer" => {
            let request = TransferRequest {
                sender: args.optional(4).map(str::to_string),
                memo: args.optional(2).unwrap_or_default().to_string(),
                pending_time: args.time(3)?,
                expiry_secs: args.integer(5)?,
                extra_signers: args.rest(6).to_vec(),
                ..TransferRequest::new(args.required(0, "receiver")?, args.amount(1)?)
            };
            json(ledger.transfer(ctx, request)?)
        }
        "pay" => {
            let request = PayRequest {
                order_id: args.optional(2).map(str::to_string),
                memo: args.optional(3).unwrap_or_default().to_string(),
                sender: args.optional(4).map(str::to_string),
                expiry_secs: args.integer(5)?,
                ..PayRequest::new(args.required(0, "merchant")?, args.amount(1)?)
            };
            json(ledger.pay(ctx, request)?)
        }
        "pay/refund" => json(ledger.pay_refund(
            ctx,
            args.required(0, "pay id")?,
            args.amount(1)?,
            args.optional(2).unwrap_or_default(),
        )?),
        "pay/prune" => json(ledger.pay_prune(ctx, args.required(0, "scope")?, args.flag(1)?, args.time(2)?)?),
        "pay/get" => json(ledger.pay_get(ctx, args.optional(0), args.optional(1))?),
        "pay/list" => json(ledger.pay_list(ctx, args.required(0, "scope")?, args.range(1)?, args.page(3)?)?),

        "fee/prune" => json(ledger.fee_prune(ctx, args.required(0, "code")?, args.flag(1)?, args.time(2)?)?),
        "fee/list" => json(ledger.fee_list(ctx, args.required(0, "code")?, args.range(1)?, args.page(3)?)?),

        "contract/execute" | "contract/cancel" => {
            let id = args.required(0, "contract id")?;
            let contract = contracts
                .get(id)
                .ok_or_else(|| LedgerError::invalid_argument(format!("unknown contract {}", id)))?;
            let document = contract.document.to_json()?;
            let ctx = ctx.from_contract_service();
            if record.op == "contract/execute" {
                json(ledger.contract_execute(ctx, id, &document)?)
            } else {
                json(ledger.contract_cancel(ctx, id, &document)?)
            }
        }

        other => Err(LedgerError::invalid_argument(format!("unknown operation '{}'", other))),
    }
}

fn json<T: Serialize>(value: T) -> Result<Value, LedgerError> {
    Ok(serde_json::to_value(value)?)
}

/// Positional arguments of a row
struct Args<'a>(&'a [String]);

impl<'a> Args<'a> {
    fn optional(&self, index: usize) -> Option<&'a str> {
        self.0.get(index).map(String::as_str).filter(|value| !value.is_empty())
    }

    fn required(&self, index: usize, name: &str) -> Result<&'a str, LedgerError> {
        self.optional(index)
            .ok_or_else(|| LedgerError::invalid_argument(format!("missing argument {}", name)))
    }

    /// Non-empty arguments from `index` on
    fn rest(&self, index: usize) -> &'a [String] {
        let rest = self.0.get(index..).unwrap_or_default();
        let end = rest.iter().rposition(|value| !value.is_empty()).map_or(0, |last| last + 1);
        &rest[..end]
    }

    fn amount(&self, index: usize) -> Result<Amount, LedgerError> {
        Amount::parse(self.required(index, "amount")?)
    }

    fn integer(&self, index: usize) -> Result<Option<i64>, LedgerError> {
        self.optional(index)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| LedgerError::invalid_argument(format!("'{}' is not an integer", value)))
            })
            .transpose()
    }

    fn time(&self, index: usize) -> Result<Option<TxTime>, LedgerError> {
        self.integer(index)?
            .map(|seconds| {
                TxTime::from_unix(seconds, 0)
                    .ok_or_else(|| LedgerError::invalid_argument(format!("time out of range: {}", seconds)))
            })
            .transpose()
    }

    fn flag(&self, index: usize) -> Result<bool, LedgerError> {
        match self.optional(index).map(str::to_lowercase).as_deref() {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(LedgerError::invalid_argument(format!("'{}' is not true or false", other))),
        }
    }

    /// Time range starting at `index`: start, end
    fn range(&self, index: usize) -> Result<TimeRange, LedgerError> {
        Ok(TimeRange {
            start: self.time(index)?,
            end: self.time(index + 1)?,
        })
    }

    /// Paging starting at `index`: fetch size, bookmark, order
    fn page(&self, index: usize) -> Result<PageRequest, LedgerError> {
        let fetch_size = self
            .optional(index)
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|_| LedgerError::invalid_argument(format!("invalid fetch size '{}'", value)))
            })
            .transpose()?
            .unwrap_or_default();
        let order = self.optional(index + 2).unwrap_or_default().parse::<SortOrder>()?;
        Ok(PageRequest::new(self.optional(index + 1).map(str::to_string), fetch_size, order))
    }
}
