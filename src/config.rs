//! Ledger configuration
//!
//! [`LedgerConfig`] carries the limits the engines enforce. It can be built from
//! defaults, from a TOML document, or adjusted from CLI flags. [`ReplayConfig`] adds
//! the token metadata the replay binary serves to `token.create`.

use crate::types::{LedgerError, TokenMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Store fetch ceiling per range call; prune batches stay strictly below it
pub const MAX_STORE_FETCH: usize = 1000;

/// Engine limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Rows summed per prune call
    pub prune_batch_size: usize,
    /// Page size when a query does not ask for one
    pub default_fetch_size: usize,
    /// Largest page a query may ask for
    pub max_fetch_size: usize,
    /// Memos are truncated to this many bytes
    pub memo_max_length: usize,
    /// Most holders a joint account or contract may have
    pub max_holders: usize,
    /// Prune end-time clamp applied when the caller asks for a safe prune
    pub safety_margin_minutes: i64,
    /// Expiry passed to the contract service when a request gives none
    pub default_contract_expiry_secs: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            prune_batch_size: 900,
            default_fetch_size: 20,
            max_fetch_size: 200,
            memo_max_length: 1024,
            max_holders: 128,
            safety_margin_minutes: 10,
            default_contract_expiry_secs: 86_400,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig = toml::from_str(text).map_err(|e| LedgerError::Config {
            message: e.to_string(),
        })?;
        Ok(config.normalized())
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, LedgerError> {
        Self::from_toml_str(&read_config_file(path)?)
    }

    /// Replace out-of-range values by their defaults
    ///
    /// Zero sizes fall back to the default and the prune batch is kept below
    /// [`MAX_STORE_FETCH`]. Each replacement is logged.
    pub fn normalized(self) -> Self {
        let default = LedgerConfig::default();

        let prune_batch_size = if self.prune_batch_size == 0 || self.prune_batch_size >= MAX_STORE_FETCH {
            warn!(
                value = self.prune_batch_size,
                fallback = default.prune_batch_size,
                "invalid prune_batch_size, using default"
            );
            default.prune_batch_size
        } else {
            self.prune_batch_size
        };

        let max_fetch_size = if self.max_fetch_size == 0 || self.max_fetch_size > MAX_STORE_FETCH {
            warn!(value = self.max_fetch_size, "invalid max_fetch_size, using default");
            default.max_fetch_size
        } else {
            self.max_fetch_size
        };

        let default_fetch_size = if self.default_fetch_size == 0 {
            default.default_fetch_size.min(max_fetch_size)
        } else {
            self.default_fetch_size.min(max_fetch_size)
        };

        LedgerConfig {
            prune_batch_size,
            default_fetch_size,
            max_fetch_size,
            memo_max_length: if self.memo_max_length == 0 {
                default.memo_max_length
            } else {
                self.memo_max_length
            },
            max_holders: if self.max_holders < 2 {
                default.max_holders
            } else {
                self.max_holders
            },
            safety_margin_minutes: self.safety_margin_minutes.clamp(0, 24 * 60),
            default_contract_expiry_secs: if self.default_contract_expiry_secs <= 0 {
                default.default_contract_expiry_secs
            } else {
                self.default_contract_expiry_secs
            },
        }
    }

    /// Page size for a request: the default for zero, capped at the maximum
    pub fn fetch_size(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_fetch_size
        } else {
            requested.min(self.max_fetch_size)
        }
    }

    /// Truncate a memo to the configured byte length on a char boundary
    pub fn truncate_memo(&self, memo: &str) -> String {
        if memo.len() <= self.memo_max_length {
            return memo.to_string();
        }
        let mut end = self.memo_max_length;
        while !memo.is_char_boundary(end) {
            end -= 1;
        }
        memo[..end].to_string()
    }
}

/// Configuration file of the replay binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub ledger: LedgerConfig,
    /// Issuance metadata per token code
    pub tokens: BTreeMap<String, TokenMeta>,
}

impl ReplayConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, LedgerError> {
        let mut config: ReplayConfig = toml::from_str(text).map_err(|e| LedgerError::Config {
            message: e.to_string(),
        })?;
        config.ledger = config.ledger.normalized();
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, LedgerError> {
        Self::from_toml_str(&read_config_file(path)?)
    }
}

fn read_config_file(path: &Path) -> Result<String, LedgerError> {
    std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
        message: format!("failed to read '{}': {}", path.display(), e),
    })
}
