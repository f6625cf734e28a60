//! World-state store seam
//!
//! The ledger persists every record in an ordered key/value store owned by the
//! surrounding execution environment. This module defines the trait the engines call
//! and an in-memory implementation used by the replay tool and the tests.
//!
//! - [`WorldState`] - point reads, ordered range scans, atomic commit
//! - [`keys`] - key layout, including the composite keys that act as secondary indexes
//! - [`MemoryStore`] - `BTreeMap` implementation with version-checked commits

pub mod keys;
pub mod memory;

use crate::types::SortOrder;
use std::collections::BTreeMap;
use std::ops::Bound;
use thiserror::Error;

pub use keys::KeyRange;
pub use memory::MemoryStore;

/// Failures reported by the store collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A key read by the transaction changed before commit
    #[error("read of {key} was invalidated by a concurrent commit")]
    Conflict { key: String },

    /// The backend could not serve the request
    #[error("store backend failure: {message}")]
    Backend { message: String },
}

/// Stored value with the version of the commit that wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub version: u64,
    pub value: Vec<u8>,
}

/// Versions observed by a transaction's point reads (`None` = key was absent)
pub type ReadSet = BTreeMap<String, Option<u64>>;

/// Buffered writes of a transaction (`None` = delete)
pub type WriteSet = BTreeMap<String, Option<Vec<u8>>>;

/// Ordered key/value world state
///
/// Implementations serialize commits. A commit must fail with
/// [`StoreError::Conflict`] when any key in the read set no longer has the version
/// the transaction observed, and must apply either all writes or none.
pub trait WorldState: Send + Sync {
    /// Read one key
    fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError>;

    /// Scan keys between `start` and `end` in `order`, returning at most `limit` entries
    fn range(
        &self,
        start: Bound<&str>,
        end: Bound<&str>,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(String, Versioned)>, StoreError>;

    /// Validate the read set and apply the write set atomically
    fn commit(&self, reads: &ReadSet, writes: WriteSet) -> Result<(), StoreError>;
}
