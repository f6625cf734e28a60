//! In-memory world state
//!
//! Keeps every key in a `BTreeMap` with the version of the commit that last wrote it.
//! Commits are serialized by a mutex and rejected when a read version went stale.

use crate::store::{ReadSet, StoreError, Versioned, WorldState, WriteSet};
use crate::types::SortOrder;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Versioned>,
    version: u64,
}

/// `BTreeMap`-backed [`WorldState`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Backend {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

// BTreeMap::range panics on inverted bounds; treat them as an empty scan.
fn is_empty_range(start: Bound<&str>, end: Bound<&str>) -> bool {
    match (start, end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s), Bound::Excluded(e))
        | (Bound::Excluded(s), Bound::Included(e))
        | (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
        _ => false,
    }
}

impl WorldState for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn range(
        &self,
        start: Bound<&str>,
        end: Bound<&str>,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(String, Versioned)>, StoreError> {
        if limit == 0 || is_empty_range(start, end) {
            return Ok(Vec::new());
        }
        let inner = self.lock()?;
        let entries = inner.entries.range::<str, _>((start, end));
        let collected: Vec<(String, Versioned)> = match order {
            SortOrder::Asc => entries
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            SortOrder::Desc => entries
                .rev()
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(collected)
    }

    fn commit(&self, reads: &ReadSet, writes: WriteSet) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for (key, observed) in reads {
            let current = inner.entries.get(key).map(|v| v.version);
            if current != *observed {
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        inner.version += 1;
        let version = inner.version;
        for (key, value) in writes {
            match value {
                Some(value) => {
                    inner.entries.insert(key, Versioned { version, value });
                }
                None => {
                    inner.entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}
