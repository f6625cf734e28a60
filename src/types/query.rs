//! Pagination and query parameters

use crate::types::error::LedgerError;
use crate::types::time::TxTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(LedgerError::invalid_argument(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Which timestamp orders a pending-balance listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingSort {
    #[default]
    CreatedTime,
    PendingTime,
}

impl FromStr for PendingSort {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "created_time" => Ok(PendingSort::CreatedTime),
            "pending_time" => Ok(PendingSort::PendingTime),
            other => Err(LedgerError::invalid_argument(format!("unknown pending sort '{}'", other))),
        }
    }
}

/// Page request: continue after `bookmark`, return at most `fetch_size` records
///
/// A zero `fetch_size` takes the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub bookmark: Option<String>,
    #[serde(default)]
    pub fetch_size: usize,
    #[serde(default)]
    pub order: SortOrder,
}

impl PageRequest {
    pub fn new(bookmark: Option<String>, fetch_size: usize, order: SortOrder) -> Self {
        PageRequest {
            bookmark: bookmark.filter(|b| !b.is_empty()),
            fetch_size,
            order,
        }
    }
}

/// Inclusive time window; open ends are unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<TxTime>,
    pub end: Option<TxTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMeta {
    pub fetched_records_count: usize,
    pub bookmark: String,
}

/// Pagination envelope returned by every list operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub meta: QueryMeta,
    pub records: Vec<T>,
}

impl<T> QueryResult<T> {
    pub fn new(records: Vec<T>, bookmark: String) -> Self {
        QueryResult {
            meta: QueryMeta {
                fetched_records_count: records.len(),
                bookmark,
            },
            records,
        }
    }
}
