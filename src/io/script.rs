//! Operation script reader
//!
//! An operation script is a header-less CSV file with one ledger operation per row:
//!
//! ```text
//! # op, txId, unixSeconds, invoker, args...
//! token/create,tx-1,1700000000,alice,ABC
//! transfer,tx-2,1700000060,alice,ABC02...,25,rent
//! ```
//!
//! Rows starting with `#` are comments. Fields are trimmed and rows may have any
//! number of trailing arguments. An empty invoker field means the transaction has
//! no invoker.
//!
//! [`ScriptReader`] streams rows one at a time. Errors on a single row are yielded
//! with the row's line number and do not stop the iteration.

use crate::types::TxTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns before the operation arguments
const FIXED_COLUMNS: usize = 4;

/// One operation of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    /// Line of the row in the script, starting at 1
    pub line: u64,
    pub op: String,
    pub tx_id: String,
    pub timestamp: TxTime,
    pub invoker: Option<String>,
    pub args: Vec<String>,
}

/// Streaming reader over the rows of an operation script
#[derive(Debug)]
pub struct ScriptReader<R> {
    reader: csv::Reader<R>,
}

impl ScriptReader<File> {
    /// Open a script file
    ///
    /// # Errors
    ///
    /// Returns a message naming the path if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, String> {
        let file =
            File::open(path).map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> ScriptReader<R> {
    pub fn from_reader(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .buffer_capacity(8 * 1024)
            .from_reader(input);
        ScriptReader { reader }
    }
}

impl<R: Read> Iterator for ScriptReader<R> {
    type Item = Result<ScriptRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut row = StringRecord::new();
        match self.reader.read_record(&mut row) {
            Ok(false) => None,
            Ok(true) => {
                let line = row.position().map_or(0, |p| p.line());
                Some(parse_row(&row, line).map_err(|e| format!("Line {}: {}", line, e)))
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                Some(Err(format!("Line {}: CSV parse error: {}", line, e)))
            }
        }
    }
}

fn parse_row(row: &StringRecord, line: u64) -> Result<ScriptRecord, String> {
    if row.len() < FIXED_COLUMNS {
        return Err(format!(
            "expected at least {} fields (op, txId, unixSeconds, invoker), got {}",
            FIXED_COLUMNS,
            row.len()
        ));
    }

    let op = row[0].to_lowercase();
    if op.is_empty() {
        return Err("missing operation".to_string());
    }
    let tx_id = row[1].to_string();
    if tx_id.is_empty() {
        return Err("missing transaction id".to_string());
    }
    let seconds: i64 = row[2]
        .parse()
        .map_err(|_| format!("invalid unix seconds '{}'", &row[2]))?;
    let timestamp = TxTime::from_unix(seconds, 0).ok_or_else(|| format!("unix seconds out of range: {}", seconds))?;
    let invoker = Some(row[3].to_string()).filter(|invoker| !invoker.is_empty());

    Ok(ScriptRecord {
        line,
        op,
        tx_id,
        timestamp,
        invoker,
        args: row.iter().skip(FIXED_COLUMNS).map(str::to_string).collect(),
    })
}
