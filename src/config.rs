use std::path::PathBuf;
use std::time::Duration;

use bitcoin::Network;

use crate::address::NetworkType;

/// Number of address transactions listed for selection.
pub const RECENT_TX_COUNT: usize = 5;

/// Runtime settings for a tracing session.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub network: NetworkType,
    /// Esplora base URL; the network's public endpoint when `None`
    pub api_url: Option<String>,
    /// Minimum spacing between two requests to the ledger source
    pub request_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts per request, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on each further retry
    pub backoff_base: Duration,
    pub recent_tx_count: usize,
    /// Directory chain dumps are written to
    pub dump_dir: PathBuf,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            network: NetworkType::Bitcoin,
            api_url: None,
            request_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            recent_tx_count: RECENT_TX_COUNT,
            dump_dir: PathBuf::from("."),
        }
    }
}

impl TracerConfig {
    pub fn bitcoin_network(&self) -> Network {
        self.network.into()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_api_url())
            .trim_end_matches('/')
            .to_string()
    }
}
