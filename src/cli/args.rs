use crate::config::ReplayConfig;
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Replay ledger operation scripts
#[derive(Parser, Debug)]
#[command(name = "token-ledger")]
#[command(about = "Replay ledger operation scripts against an in-memory ledger", long_about = None)]
pub struct CliArgs {
    /// Operation script path
    #[arg(value_name = "SCRIPT", help = "Path to the CSV operation script")]
    pub script: PathBuf,

    /// TOML configuration file
    #[arg(
        long = "config",
        value_name = "FILE",
        help = "TOML file with [ledger] limits and [tokens.<CODE>] issuance metadata"
    )]
    pub config: Option<PathBuf>,

    /// Rows summed per prune call
    #[arg(
        long = "prune-batch-size",
        value_name = "SIZE",
        help = "Rows summed per prune call (default: 900, must stay below 1000)"
    )]
    pub prune_batch_size: Option<usize>,

    /// Diagnostics format on stderr
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "human")]
    pub log_format: LogFormat,

    /// Diagnostics level, overridden by RUST_LOG
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    /// Build the replay configuration from the config file and CLI overrides
    ///
    /// # Errors
    ///
    /// Returns a message if the config file cannot be read or parsed.
    pub fn to_replay_config(&self) -> Result<ReplayConfig, String> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::from_toml_file(path).map_err(|e| e.to_string())?,
            None => ReplayConfig::default(),
        };
        if let Some(size) = self.prune_batch_size {
            config.ledger.prune_batch_size = size;
        }
        config.ledger = config.ledger.normalized();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    #[case::defaults(&["program", "ops.csv"], LogFormat::Human, "info")]
    #[case::json(&["program", "--log-format", "json", "ops.csv"], LogFormat::Json, "info")]
    #[case::level(&["program", "--log-level", "debug", "ops.csv"], LogFormat::Human, "debug")]
    fn test_logging_options(#[case] args: &[&str], #[case] format: LogFormat, #[case] level: &str) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.log_format, format);
        assert_eq!(parsed.log_level, level);
        assert_eq!(parsed.script, PathBuf::from("ops.csv"));
    }

    #[rstest]
    #[case::default(&["program", "ops.csv"], 900)]
    #[case::custom(&["program", "--prune-batch-size", "50", "ops.csv"], 50)]
    #[case::zero_falls_back(&["program", "--prune-batch-size", "0", "ops.csv"], 900)]
    #[case::too_large_falls_back(&["program", "--prune-batch-size", "5000", "ops.csv"], 900)]
    fn test_prune_batch_override(#[case] args: &[&str], #[case] expected: usize) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_replay_config().unwrap();
        assert_eq!(config.ledger.prune_batch_size, expected);
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(b"[ledger]\nprune_batch_size = 100\nmax_holders = 10\n")
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        let path = file.path().to_str().unwrap();

        let parsed = CliArgs::try_parse_from(["program", "--config", path, "--prune-batch-size", "20", "ops.csv"]).unwrap();
        let config = parsed.to_replay_config().unwrap();

        assert_eq!(config.ledger.prune_batch_size, 20);
        assert_eq!(config.ledger.max_holders, 10);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let parsed = CliArgs::try_parse_from(["program", "--config", "missing.toml", "ops.csv"]).unwrap();
        let error = parsed.to_replay_config().unwrap_err();
        assert!(error.contains("missing.toml"));
    }

    #[rstest]
    #[case::missing_script(&["program"])]
    #[case::invalid_format(&["program", "--log-format", "xml", "ops.csv"])]
    #[case::invalid_batch(&["program", "--prune-batch-size", "many", "ops.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
