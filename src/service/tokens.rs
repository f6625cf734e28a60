//! Token operations

use super::{holders_of, token_code, Ledger, Outcome};
use crate::core::{AccountDirectory, LedgerEngine, Session, TokenRegistry, TxContext};
use crate::types::{Amount, BalanceLog, ContractDocument, LedgerError, Token, TokenMeta};
use serde::Serialize;

/// Token after a supply change, with the genesis balance log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyResult {
    pub token: Token,
    pub balance_log: BalanceLog,
}

/// Direction of a supply change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SupplyChange {
    Mint,
    Burn,
}

impl Ledger {
    /// Issue token `code` from the metadata service's issuance metadata
    ///
    /// The invoker and the holders of the `co_holders` accounts become the holders of
    /// the genesis joint account. With co-holders the issuance is escrowed.
    pub fn token_create(
        &self,
        ctx: TxContext,
        code: &str,
        co_holders: &[String],
    ) -> Result<Outcome<Token>, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "token.create", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let meta = self.issuance_meta(&code)?;
            if TokenRegistry::new(session).exists(&code)? {
                return Err(LedgerError::TokenAlreadyIssued { code: code.clone() });
            }

            let mut holders = holders_of(session, &code, co_holders)?;
            holders.insert(invoker);
            self.check_signers(&holders)?;
            if holders.len() > 1 {
                let document = ContractDocument::TokenCreate {
                    token: code.clone(),
                    holders: holders.clone(),
                };
                return Ok(Outcome::Escrowed(self.escrow(session, document, None, &holders)?));
            }

            let (token, _) = TokenRegistry::new(session).create(&code, &meta, &holders)?;
            Ok(Outcome::Applied(token))
        })
    }

    pub fn token_get(&self, ctx: TxContext, code: &str) -> Result<Token, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "token.get", |session| TokenRegistry::new(session).get(&code))
    }

    /// Mint into the genesis account, escrowed when it has several holders
    pub fn token_mint(&self, ctx: TxContext, code: &str, amount: Amount) -> Result<Outcome<SupplyResult>, LedgerError> {
        self.change_supply(ctx, code, amount, SupplyChange::Mint)
    }

    /// Burn from the genesis account, escrowed when it has several holders
    pub fn token_burn(&self, ctx: TxContext, code: &str, amount: Amount) -> Result<Outcome<SupplyResult>, LedgerError> {
        self.change_supply(ctx, code, amount, SupplyChange::Burn)
    }

    /// Refresh decimals, max supply and fee rates from the metadata service
    ///
    /// Only a holder of the genesis account may update.
    pub fn token_update(&self, ctx: TxContext, code: &str) -> Result<Token, LedgerError> {
        let code = token_code(code)?;
        self.run(ctx, "token.update", |session| {
            let invoker = session.ctx().invoker()?.clone();
            let meta = self.issuance_meta(&code)?;
            let mut token = TokenRegistry::new(session).get(&code)?;
            AccountDirectory::new(session).authorized(&token.genesis_account, &invoker)?;
            TokenRegistry::new(session).update(&mut token, &meta)?;
            Ok(token)
        })
    }

    fn change_supply(
        &self,
        ctx: TxContext,
        code: &str,
        amount: Amount,
        change: SupplyChange,
    ) -> Result<Outcome<SupplyResult>, LedgerError> {
        let code = token_code(code)?;
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(&amount.to_string()));
        }
        let operation = match change {
            SupplyChange::Mint => "token.mint",
            SupplyChange::Burn => "token.burn",
        };

        self.run(ctx, operation, |session| {
            let invoker = session.ctx().invoker()?.clone();
            let token = TokenRegistry::new(session).get(&code)?;
            let genesis = AccountDirectory::new(session).authorized(&token.genesis_account, &invoker)?;

            let signers = genesis.holders();
            if signers.len() > 1 {
                let document = match change {
                    SupplyChange::Mint => ContractDocument::TokenMint {
                        token: code.clone(),
                        amount,
                    },
                    SupplyChange::Burn => ContractDocument::TokenBurn {
                        token: code.clone(),
                        amount,
                    },
                };
                return Ok(Outcome::Escrowed(self.escrow(session, document, None, &signers)?));
            }
            Ok(Outcome::Applied(apply_supply_change(session, token, amount, change)?))
        })
    }

    /// Issuance metadata for `code`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the metadata service does not know the token.
    pub(crate) fn issuance_meta(&self, code: &str) -> Result<TokenMeta, LedgerError> {
        self.token_meta
            .token_meta(code)?
            .ok_or_else(|| LedgerError::invalid_argument(format!("no issuance metadata for token {}", code)))
    }
}

/// Mint or burn on the genesis balance of `token`
pub(crate) fn apply_supply_change(
    session: &mut Session,
    mut token: Token,
    amount: Amount,
    change: SupplyChange,
) -> Result<SupplyResult, LedgerError> {
    let mut genesis = LedgerEngine::new(session).get_balance(&token.genesis_account)?;
    let mut registry = TokenRegistry::new(session);
    let balance_log = match change {
        SupplyChange::Mint => registry.mint(&mut token, &mut genesis, amount)?,
        SupplyChange::Burn => registry.burn(&mut token, &mut genesis, amount)?,
    };
    Ok(SupplyResult { token, balance_log })
}
