//! Execution context and transactional session
//!
//! Every operation runs inside one [`Session`]: the [`TxContext`] of the transaction
//! (id, deterministic time, invoker, origin) plus a write buffer over the world
//! state. Point reads see the session's own writes and record the version they
//! observed; range scans see committed state only. Nothing reaches the store until
//! [`Session::commit`]; a session dropped after an error discards all of its writes.

use crate::config::LedgerConfig;
use crate::store::{KeyRange, ReadSet, WorldState, WriteSet};
use crate::types::{holder_id, HolderId, LedgerError, PageRequest, QueryResult, SortOrder, TxTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, info_span, Span};

/// Who submitted the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A holder acting through the operation catalogue
    Holder,
    /// The contract service delivering a finalize or cancel callback
    ContractService,
}

/// Identity and time of one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    tx_id: String,
    timestamp: TxTime,
    invoker: Option<HolderId>,
    origin: Origin,
}

impl TxContext {
    pub fn new(tx_id: impl Into<String>, timestamp: TxTime) -> Self {
        TxContext {
            tx_id: tx_id.into(),
            timestamp,
            invoker: None,
            origin: Origin::Holder,
        }
    }

    /// Attach the invoker identity, normalized to its holder id
    pub fn with_invoker(mut self, identity: impl AsRef<str>) -> Self {
        self.invoker = Some(holder_id(identity.as_ref()));
        self
    }

    pub fn from_contract_service(mut self) -> Self {
        self.origin = Origin::ContractService;
        self
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn timestamp(&self) -> TxTime {
        self.timestamp
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Invoker holder id
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccess` when the transaction carries no identity.
    pub fn invoker(&self) -> Result<&HolderId, LedgerError> {
        self.invoker
            .as_ref()
            .ok_or_else(|| LedgerError::invalid_access("transaction has no invoker identity"))
    }
}

/// One transaction's view of the world state
pub struct Session {
    ctx: TxContext,
    config: LedgerConfig,
    store: Arc<dyn WorldState>,
    reads: ReadSet,
    writes: WriteSet,
    log_seq: u32,
    span: Span,
}

impl Session {
    /// Open a session for `operation`
    pub fn begin(
        store: Arc<dyn WorldState>,
        ctx: TxContext,
        config: LedgerConfig,
        operation: &'static str,
    ) -> Self {
        let span = info_span!("tx", tx_id = %ctx.tx_id, op = operation);
        Session {
            ctx,
            config,
            store,
            reads: ReadSet::new(),
            writes: WriteSet::new(),
            log_seq: 0,
            span,
        }
    }

    pub fn ctx(&self) -> &TxContext {
        &self.ctx
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn now(&self) -> TxTime {
        self.ctx.timestamp
    }

    pub fn tx_id(&self) -> &str {
        &self.ctx.tx_id
    }

    /// Sequence number distinguishing several log rows written by one transaction
    pub fn next_log_seq(&mut self) -> u32 {
        self.log_seq += 1;
        self.log_seq
    }

    fn get_raw(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let entry = self.store.get(key)?;
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| entry.as_ref().map(|v| v.version));
        Ok(entry.map(|v| v.value))
    }

    /// Read and decode one record
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, LedgerError> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&mut self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Buffer a record write
    pub fn put<T: Serialize>(&mut self, key: String, value: &T) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(value)?;
        debug!(parent: &self.span, key = %key, "put");
        self.writes.insert(key, Some(bytes));
        Ok(())
    }

    /// Buffer a record deletion
    pub fn delete(&mut self, key: String) {
        debug!(parent: &self.span, key = %key, "delete");
        self.writes.insert(key, None);
    }

    /// Scan committed records in `range`, continuing strictly after `after`
    ///
    /// For descending scans `after` bounds the range from above.
    pub fn scan<T: DeserializeOwned>(
        &mut self,
        range: &KeyRange,
        after: Option<&str>,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(String, T)>, LedgerError> {
        let (start, end) = match (order, after) {
            (SortOrder::Asc, Some(key)) if key >= range.start.as_str() => {
                (Bound::Excluded(key), Bound::Excluded(range.end.as_str()))
            }
            (SortOrder::Desc, Some(key)) if key < range.end.as_str() => {
                (Bound::Included(range.start.as_str()), Bound::Excluded(key))
            }
            _ => (
                Bound::Included(range.start.as_str()),
                Bound::Excluded(range.end.as_str()),
            ),
        };

        self.store
            .range(start, end, order, limit)?
            .into_iter()
            .map(|(key, entry)| -> Result<(String, T), LedgerError> {
                Ok((key, serde_json::from_slice(&entry.value)?))
            })
            .collect()
    }

    /// Serve one page of a query
    ///
    /// Records rejected by `keep` are skipped without counting toward the page size.
    /// The returned bookmark is the key of the last record scanned; passing it back
    /// continues the listing.
    pub fn page<T, F>(
        &mut self,
        range: &KeyRange,
        page: &PageRequest,
        mut keep: F,
    ) -> Result<QueryResult<T>, LedgerError>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let fetch_size = self.config.fetch_size(page.fetch_size);
        let mut records = Vec::new();
        let mut cursor = page.bookmark.clone();

        loop {
            let batch: Vec<(String, T)> = self.scan(range, cursor.as_deref(), page.order, fetch_size)?;
            let exhausted = batch.len() < fetch_size;
            for (key, record) in batch {
                cursor = Some(key);
                if keep(&record) {
                    records.push(record);
                    if records.len() == fetch_size {
                        break;
                    }
                }
            }
            if exhausted || records.len() == fetch_size {
                break;
            }
        }

        Ok(QueryResult::new(records, cursor.unwrap_or_default()))
    }

    /// Apply the buffered writes to the store
    ///
    /// # Errors
    ///
    /// Returns `Store(Conflict)` if a point read was invalidated by another commit;
    /// nothing is written in that case.
    pub fn commit(self) -> Result<(), LedgerError> {
        debug!(parent: &self.span, writes = self.writes.len(), reads = self.reads.len(), "commit");
        self.store.commit(&self.reads, self.writes)?;
        Ok(())
    }
}
