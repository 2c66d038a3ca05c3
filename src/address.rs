use std::str::FromStr;

use bitcoin::{Address, Network};
use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

// bitcoin::Network has no serde impls without the crate's "serde" feature,
// so snapshots go through this lowercase mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl NetworkType {
    /// Default Esplora endpoint for this network.
    pub fn default_api_url(self) -> &'static str {
        match self {
            NetworkType::Bitcoin => "https://blockstream.info/api",
            NetworkType::Testnet => "https://blockstream.info/testnet/api",
            NetworkType::Signet => "https://blockstream.info/signet/api",
            NetworkType::Regtest => "http://127.0.0.1:3002",
        }
    }
}

impl From<Network> for NetworkType {
    fn from(network: Network) -> Self {
        match network {
            Network::Bitcoin => NetworkType::Bitcoin,
            Network::Testnet => NetworkType::Testnet,
            Network::Signet => NetworkType::Signet,
            Network::Regtest => NetworkType::Regtest,
            _ => NetworkType::Testnet, // newer test networks share testnet address rules
        }
    }
}

impl From<NetworkType> for Network {
    fn from(network: NetworkType) -> Self {
        match network {
            NetworkType::Bitcoin => Network::Bitcoin,
            NetworkType::Testnet => Network::Testnet,
            NetworkType::Signet => Network::Signet,
            NetworkType::Regtest => Network::Regtest,
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(NetworkType::Bitcoin),
            "testnet" => Ok(NetworkType::Testnet),
            "signet" => Ok(NetworkType::Signet),
            "regtest" => Ok(NetworkType::Regtest),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NetworkType::Bitcoin => "bitcoin",
            NetworkType::Testnet => "testnet",
            NetworkType::Signet => "signet",
            NetworkType::Regtest => "regtest",
        };
        write!(f, "{name}")
    }
}

/// `#[serde(with = "network_serde")]` for `bitcoin::Network` fields.
pub(crate) mod network_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(network: &Network, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        NetworkType::from(*network).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Network, D::Error>
    where
        D: Deserializer<'de>,
    {
        let network_type = NetworkType::deserialize(deserializer)?;
        Ok(Network::from(network_type))
    }
}

/// One entry of an address's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTx {
    pub txid: String,
    pub confirmed: bool,
}

/// Point-in-time view of an address. Balances move, so these are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub address: String,
    /// Confirmed balance in satoshis
    pub balance: u64,
    /// Net effect of mempool transactions on the balance, in satoshis
    pub unconfirmed_delta: i64,
    /// Number of confirmed transactions touching the address
    pub tx_count: u64,
    /// Most recent first, as the ledger source orders them
    pub transactions: Vec<AddressTx>,
}

impl AddressSummary {
    /// 1-based selection from the transaction list.
    pub fn transaction(&self, n: usize) -> Option<&AddressTx> {
        n.checked_sub(1).and_then(|i| self.transactions.get(i))
    }
}

/// Checks that `address` is a well-formed address for `network`.
pub fn validate_address(address: &str, network: Network) -> TraceResult<()> {
    Address::from_str(address)
        .map_err(|e| TraceError::InvalidQuery(format!("'{address}' is not an address: {e}")))?
        .require_network(network)
        .map_err(|_| {
            TraceError::InvalidQuery(format!(
                "'{address}' is not a {} address",
                NetworkType::from(network)
            ))
        })?;
    Ok(())
}
