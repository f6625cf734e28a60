//! Account address codec
//!
//! An address is scoped to one token and one account type. Its 24-byte hash is a
//! 20-byte id followed by a 4-byte checksum over `code ‖ type ‖ id`. The wire form
//! is the token code, the type as two hex digits, then the hash as upper-case hex:
//!
//! ```text
//! ABC 01 6F1E...(40 hex id)...9A2C(8 hex checksum)
//! ```
//!
//! Parsing validates every part; an [`Address`] value is always well formed.

use crate::types::error::LedgerError;
use crate::types::token::validate_token_code;
use blake2::digest::consts::{U20, U4};
use blake2::{Blake2b, Digest};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

type IdHasher = Blake2b<U20>;
type ChecksumHasher = Blake2b<U4>;

const ID_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const HASH_LEN: usize = ID_LEN + CHECKSUM_LEN;

/// Hex characters after the token code: one type byte plus the hash
pub const ADDRESS_TAIL_LEN: usize = 2 * (1 + HASH_LEN);

/// Account variant encoded in the address type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Personal,
    Joint,
}

impl AccountType {
    pub fn as_byte(self) -> u8 {
        match self {
            AccountType::Personal => 1,
            AccountType::Joint => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(AccountType::Personal),
            2 => Some(AccountType::Joint),
            _ => None,
        }
    }
}

/// Checksummed, typed, token-scoped account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    code: String,
    account_type: AccountType,
    hash: [u8; HASH_LEN],
}

impl Address {
    /// Derive an address from a token code, type and identifier
    ///
    /// A 40-hex-digit identifier is used as the id directly. Any other identifier is
    /// hashed to a 20-byte id, which is how randomized joint addresses are seeded from
    /// the transaction id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the token code is malformed.
    pub fn derive(code: &str, account_type: AccountType, identifier: &str) -> Result<Self, LedgerError> {
        let code = code.to_ascii_uppercase();
        validate_token_code(&code).map_err(|_| LedgerError::invalid_address("token code"))?;

        let id = id_bytes(identifier);
        let mut hash = [0u8; HASH_LEN];
        hash[..ID_LEN].copy_from_slice(&id);
        hash[ID_LEN..].copy_from_slice(&checksum(&code, account_type, &id));

        Ok(Address {
            code,
            account_type,
            hash,
        })
    }

    /// Parse and validate an address string
    ///
    /// Input is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` with the failing check as its reason: `length`,
    /// `hex`, `account type`, `token code` or `checksum`.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let upper = input.trim().to_ascii_uppercase();
        if upper.len() < ADDRESS_TAIL_LEN {
            return Err(LedgerError::invalid_address("length"));
        }
        let split = upper.len() - ADDRESS_TAIL_LEN;
        if !upper.is_char_boundary(split) {
            return Err(LedgerError::invalid_address("hex"));
        }
        let (code, tail) = upper.split_at(split);
        let bytes = hex::decode(tail).map_err(|_| LedgerError::invalid_address("hex"))?;

        let account_type = AccountType::from_byte(bytes[0])
            .ok_or_else(|| LedgerError::invalid_address("account type"))?;
        validate_token_code(code).map_err(|_| LedgerError::invalid_address("token code"))?;

        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&bytes[1..]);
        if checksum(code, account_type, &hash[..ID_LEN]) != hash[ID_LEN..] {
            return Err(LedgerError::invalid_address("checksum"));
        }

        Ok(Address {
            code: code.to_string(),
            account_type,
            hash,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn is_personal(&self) -> bool {
        self.account_type == AccountType::Personal
    }

    /// Lower-case hex of the 20-byte id
    ///
    /// For personal accounts this is the holder id of the single holder.
    pub fn id_hex(&self) -> String {
        hex::encode(&self.hash[..ID_LEN])
    }
}

/// Holder id of an identity: a 40-hex-digit identity as lowercase hex, anything
/// else hashed the way [`Address::derive`] hashes identifiers
///
/// The personal account of an identity is therefore the one whose `id_hex()` is
/// its holder id.
pub fn holder_id(identity: &str) -> String {
    hex::encode(id_bytes(identity))
}

fn id_bytes(identifier: &str) -> [u8; ID_LEN] {
    let mut id = [0u8; ID_LEN];
    if identifier.len() == 2 * ID_LEN {
        if let Ok(decoded) = hex::decode(identifier) {
            id.copy_from_slice(&decoded);
            return id;
        }
    }
    let digest = IdHasher::digest(identifier.as_bytes());
    id.copy_from_slice(digest.as_slice());
    id
}

fn checksum(code: &str, account_type: AccountType, id: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = ChecksumHasher::new();
    hasher.update(code.as_bytes());
    hasher.update([account_type.as_byte()]);
    hasher.update(id);
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(digest.as_slice());
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:02X}{}",
            self.code,
            self.account_type.as_byte(),
            hex::encode_upper(self.hash)
        )
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::parse(&text).map_err(de::Error::custom)
    }
}
