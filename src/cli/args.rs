use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::address::NetworkType;
use crate::config::{TracerConfig, RECENT_TX_COUNT};

/// Trace bitcoin transactions input by input and output by output.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Network to trace on (bitcoin, testnet, signet, regtest)
    #[arg(long, env = "BITCRAWLER_NETWORK", default_value = "bitcoin")]
    pub network: NetworkType,

    /// Esplora API base URL; defaults to blockstream.info for the chosen network
    #[arg(long, env = "BITCRAWLER_API_URL")]
    pub api_url: Option<String>,

    /// Minimum milliseconds between two API requests
    #[arg(long, env = "BITCRAWLER_REQUEST_DELAY_MS", default_value_t = 500)]
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "BITCRAWLER_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Attempts per request before giving up on a network error
    #[arg(long, env = "BITCRAWLER_ATTEMPTS", default_value_t = 3)]
    pub attempts: u32,

    /// How many of an address's recent transactions to list
    #[arg(long, env = "BITCRAWLER_RECENT_TXS", default_value_t = RECENT_TX_COUNT)]
    pub recent_txs: usize,

    /// Directory chain dumps are written to
    #[arg(long, env = "BITCRAWLER_DUMP_DIR", default_value = ".")]
    pub dump_dir: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "BITCRAWLER_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Resume a previously dumped chain at startup
    #[arg(long)]
    pub load: Option<PathBuf>,
}

impl CliArgs {
    pub fn to_config(&self) -> TracerConfig {
        TracerConfig {
            network: self.network,
            api_url: self.api_url.clone(),
            request_delay: Duration::from_millis(self.request_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.attempts,
            recent_tx_count: self.recent_txs,
            dump_dir: self.dump_dir.clone(),
            ..TracerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = CliArgs::try_parse_from(["bitcrawler"]).unwrap();
        let config = args.to_config();
        let defaults = TracerConfig::default();
        assert_eq!(config.network, defaults.network);
        assert_eq!(config.request_delay, defaults.request_delay);
        assert_eq!(config.timeout, defaults.timeout);
        assert_eq!(config.max_attempts, defaults.max_attempts);
        assert_eq!(config.recent_tx_count, defaults.recent_tx_count);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "bitcrawler",
            "--network",
            "testnet",
            "--api-url",
            "http://localhost:3000",
            "--attempts",
            "5",
            "--dump-dir",
            "/tmp/dumps",
            "--load",
            "chain.json",
        ])
        .unwrap();
        let config = args.to_config();
        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.dump_dir, PathBuf::from("/tmp/dumps"));
        assert_eq!(args.load, Some(PathBuf::from("chain.json")));
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        assert!(CliArgs::try_parse_from(["bitcrawler", "--network", "dogecoin"]).is_err());
    }
}
