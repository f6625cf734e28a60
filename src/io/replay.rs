//! Script replay against an in-memory ledger

use super::dispatch::dispatch;
use super::script::{ScriptReader, ScriptRecord};
use crate::config::ReplayConfig;
use crate::core::{LocalContracts, StaticTokenMeta};
use crate::service::Ledger;
use crate::store::MemoryStore;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Counts of a finished replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    /// Rows that could not be parsed
    pub skipped: usize,
}

/// Result line written for each operation
#[derive(Debug, Serialize)]
struct ResultLine<'a> {
    line: u64,
    tx: &'a str,
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Ledger over a fresh [`MemoryStore`] with local collaborators
pub struct Replay {
    ledger: Ledger,
    contracts: Arc<LocalContracts>,
}

impl Replay {
    pub fn in_memory(config: ReplayConfig) -> Self {
        let contracts = Arc::new(LocalContracts::new());
        let ledger = Ledger::new(
            Arc::new(MemoryStore::new()),
            contracts.clone(),
            Arc::new(StaticTokenMeta::new(config.tokens)),
            config.ledger,
        );
        Replay { ledger, contracts }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn contracts(&self) -> &LocalContracts {
        &self.contracts
    }

    /// Replay the script file at `path`
    ///
    /// # Errors
    ///
    /// Returns a message if the file cannot be opened or the output cannot be written.
    /// Rejected operations and malformed rows are reported in the output instead.
    pub fn run_file(&self, path: &Path, output: &mut dyn Write) -> Result<ReplaySummary, String> {
        self.run(ScriptReader::open(path)?, output)
    }

    /// Replay a script read from `input`
    pub fn run_reader<R: Read>(&self, input: R, output: &mut dyn Write) -> Result<ReplaySummary, String> {
        self.run(ScriptReader::from_reader(input), output)
    }

    fn run<R: Read>(&self, reader: ScriptReader<R>, output: &mut dyn Write) -> Result<ReplaySummary, String> {
        let mut summary = ReplaySummary::default();

        for row in reader {
            let record = match row {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping script row");
                    summary.skipped += 1;
                    continue;
                }
            };

            let line = self.execute(&record);
            if line.ok.is_some() {
                summary.applied += 1;
            } else {
                summary.rejected += 1;
            }
            let text = serde_json::to_string(&line).map_err(|e| format!("Failed to encode result: {}", e))?;
            writeln!(output, "{}", text).map_err(|e| format!("Failed to write output: {}", e))?;
        }

        output.flush().map_err(|e| format!("Failed to write output: {}", e))?;
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            skipped = summary.skipped,
            "replay finished"
        );
        Ok(summary)
    }

    fn execute<'r>(&self, record: &'r ScriptRecord) -> ResultLine<'r> {
        let (ok, error) = match dispatch(&self.ledger, &self.contracts, record) {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.response_message(&record.op))),
        };
        ResultLine {
            line: record.line,
            tx: &record.tx_id,
            op: &record.op,
            ok,
            error,
        }
    }
}
