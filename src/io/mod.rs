//! I/O module
//!
//! Handles operation-script parsing and replay output.
//!
//! # Components
//!
//! - `script` - streaming reader over CSV operation scripts
//! - `dispatch` - maps script rows onto [`crate::service::Ledger`] operations
//! - `replay` - runs a script against an in-memory ledger and writes JSON result lines

pub mod dispatch;
pub mod replay;
pub mod script;

pub use dispatch::dispatch;
pub use replay::{Replay, ReplaySummary};
pub use script::{ScriptReader, ScriptRecord};
