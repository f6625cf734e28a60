//! Token ledger replay CLI
//!
//! Replays a CSV operation script against an in-memory ledger.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ops.csv > results.jsonl
//! cargo run -- --config ledger.toml ops.csv > results.jsonl
//! cargo run -- --log-format json --log-level debug ops.csv > results.jsonl
//! ```
//!
//! Each operation produces one JSON line on stdout with either an `ok` result or
//! an `error` message. Diagnostics go to stderr through `tracing`.
//!
//! # Exit Codes
//!
//! - 0: Success, including scripts with rejected operations
//! - 1: Error (bad configuration, script not readable, output not writable)

use std::process;
use token_ledger::cli;
use token_ledger::io::Replay;
use token_ledger::logging;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init_logging(args.log_format, &args.log_level) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let config = match args.to_replay_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let replay = Replay::in_memory(config);
    let mut output = std::io::stdout().lock();
    if let Err(e) = replay.run_file(&args.script, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
