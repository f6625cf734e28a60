//! Structured logging setup for the replay binary
//!
//! The library only emits `tracing` events and spans; installing a subscriber is the
//! binary's job. `RUST_LOG` overrides the level passed on the command line.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for diagnostics written to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Human,
    Json,
}

/// Install the global subscriber
///
/// Returns an error message if a subscriber is already installed.
pub fn init_logging(format: LogFormat, level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };
    result.map_err(|e| format!("Failed to initialise logging: {}", e))
}
