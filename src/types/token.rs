//! Token state and issuance metadata

use crate::types::address::Address;
use crate::types::amount::Amount;
use crate::types::error::LedgerError;
use crate::types::fee::{parse_fee_rates, FeeKind, FeePolicy};
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};

/// Highest number of decimals a token may declare
pub const MAX_TOKEN_DECIMAL: u32 = 18;

/// Check a token code against `[A-Z0-9]{3,6}`
pub fn validate_token_code(code: &str) -> Result<(), LedgerError> {
    let valid_len = (3..=6).contains(&code.len());
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(LedgerError::invalid_token_code(code))
    }
}

/// Issued token
///
/// `supply` stays within `0..=max_supply`. `last_pruned_fee_id` is the fee-prune
/// cursor; fees with an id at or before it have been swept to the fee target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub code: String,
    pub decimal: u32,
    pub max_supply: Amount,
    pub supply: Amount,
    pub genesis_account: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_policy: Option<FeePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pruned_fee_id: Option<String>,
    pub created_time: TxTime,
    pub updated_time: TxTime,
}

impl Token {
    /// Fee owed by `payer` for an operation of `kind` moving `amount`
    ///
    /// Zero when the token has no policy, the policy does not price `kind`, or the
    /// payer is the fee target or the genesis account.
    pub fn calc_fee(&self, payer: &Address, kind: FeeKind, amount: &Amount) -> Result<Amount, LedgerError> {
        let Some(policy) = &self.fee_policy else {
            return Ok(Amount::ZERO);
        };
        let Some(rate) = policy.rates.get(&kind) else {
            return Ok(Amount::ZERO);
        };
        if *payer == self.genesis_account || *payer == policy.target_address {
            return Ok(Amount::ZERO);
        }
        rate.apply(amount)
    }
}

/// Issuance metadata supplied by the token metadata service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    #[serde(default)]
    pub decimal: u32,
    pub max_supply: Amount,
    #[serde(default)]
    pub initial_supply: Amount,
    /// Fee rate text, `kind=rate[,max];...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// Fee target; the genesis account when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_address: Option<String>,
}

impl TokenMeta {
    /// Check ranges and parse the fee text
    ///
    /// # Returns
    ///
    /// The parsed fee policy, if the metadata names one. A policy without a target
    /// address uses `default_target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for out-of-range decimal or supply values and
    /// `InvalidFeePolicy`/`InvalidAddress` for a malformed fee section.
    pub fn validate(&self, code: &str, default_target: &Address) -> Result<Option<FeePolicy>, LedgerError> {
        if self.decimal > MAX_TOKEN_DECIMAL {
            return Err(LedgerError::invalid_argument(format!(
                "decimal {} must be between 0 and {}",
                self.decimal, MAX_TOKEN_DECIMAL
            )));
        }
        if self.max_supply.is_negative() {
            return Err(LedgerError::invalid_argument("max supply must not be negative"));
        }
        if self.initial_supply.is_negative() || self.initial_supply > self.max_supply {
            return Err(LedgerError::invalid_argument(format!(
                "initial supply {} must be between 0 and max supply {}",
                self.initial_supply, self.max_supply
            )));
        }

        let Some(fee) = self.fee.as_deref().filter(|f| !f.trim().is_empty()) else {
            return Ok(None);
        };
        let target = match self.target_address.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(text) => {
                let address = Address::parse(text)?;
                if address.code() != code {
                    return Err(LedgerError::InvalidFeePolicy {
                        message: format!("target {} belongs to another token", address),
                    });
                }
                address
            }
            None => default_target.clone(),
        };
        Ok(Some(FeePolicy {
            target_address: target,
            rates: parse_fee_rates(fee)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::address::AccountType;
    use crate::types::fee::FeeRate;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    #[case::three("ABC", true)]
    #[case::six("KRW123", true)]
    #[case::digits("123", true)]
    #[case::two("AB", false)]
    #[case::seven("ABCDEFG", false)]
    #[case::lower("abc", false)]
    #[case::symbol("AB-C", false)]
    fn test_validate_token_code(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(validate_token_code(code).is_ok(), valid);
    }

    fn address(kind: AccountType, seed: &str) -> Address {
        Address::derive("ABC", kind, seed).unwrap()
    }

    fn token_with_rate(rate: &str) -> Token {
        let genesis = address(AccountType::Joint, "genesis");
        let target = address(AccountType::Personal, "target");
        let mut rates = BTreeMap::new();
        rates.insert(FeeKind::Transfer, FeeRate::new(rate, Amount::ZERO).unwrap());
        let now = TxTime::from_unix(1_700_000_000, 0).unwrap();
        Token {
            code: "ABC".to_string(),
            decimal: 0,
            max_supply: Amount::from_i64(1000),
            supply: Amount::from_i64(100),
            genesis_account: genesis,
            fee_policy: Some(FeePolicy {
                target_address: target,
                rates,
            }),
            last_pruned_fee_id: None,
            created_time: now,
            updated_time: now,
        }
    }

    #[rstest]
    #[case::one_percent("0.01", 30, 0)]
    #[case::ten_percent("0.1", 30, 3)]
    fn test_calc_fee(#[case] rate: &str, #[case] amount: i64, #[case] expected: i64) {
        let token = token_with_rate(rate);
        let payer = address(AccountType::Personal, "payer");
        let fee = token
            .calc_fee(&payer, FeeKind::Transfer, &Amount::from_i64(amount))
            .unwrap();
        assert_eq!(fee, Amount::from_i64(expected));
    }

    #[rstest]
    #[case::small(10)]
    #[case::large(1_000_000_000)]
    fn test_fee_exemptions(#[case] amount: i64) {
        let token = token_with_rate("0.5");
        let amount = Amount::from_i64(amount);
        let target = token.fee_policy.as_ref().unwrap().target_address.clone();
        assert_eq!(token.calc_fee(&target, FeeKind::Transfer, &amount).unwrap(), Amount::ZERO);
        assert_eq!(
            token.calc_fee(&token.genesis_account, FeeKind::Transfer, &amount).unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn test_unpriced_kind_is_free() {
        let token = token_with_rate("0.5");
        let payer = address(AccountType::Personal, "payer");
        assert_eq!(
            token.calc_fee(&payer, FeeKind::Pay, &Amount::from_i64(100)).unwrap(),
            Amount::ZERO
        );
    }

    #[rstest]
    #[case::decimal_too_large(19, 100, 0)]
    #[case::initial_above_max(0, 100, 101)]
    #[case::negative_max(0, -1, 0)]
    fn test_meta_validation_rejects(#[case] decimal: u32, #[case] max: i64, #[case] initial: i64) {
        let meta = TokenMeta {
            decimal,
            max_supply: Amount::from_i64(max),
            initial_supply: Amount::from_i64(initial),
            fee: None,
            target_address: None,
        };
        let genesis = address(AccountType::Joint, "genesis");
        assert!(matches!(
            meta.validate("ABC", &genesis),
            Err(LedgerError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_meta_fee_defaults_to_genesis_target() {
        let meta = TokenMeta {
            decimal: 2,
            max_supply: Amount::from_i64(1000),
            initial_supply: Amount::from_i64(100),
            fee: Some("transfer=0.1".to_string()),
            target_address: None,
        };
        let genesis = address(AccountType::Joint, "genesis");
        let policy = meta.validate("ABC", &genesis).unwrap().unwrap();
        assert_eq!(policy.target_address, genesis);
        assert!(policy.rates.contains_key(&FeeKind::Transfer));
    }
}
