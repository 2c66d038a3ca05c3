//! The traced path: an append-only sequence of visited transactions, each
//! remembered together with the edge that led to it.
//!
//! A chain can be written out as a [`ChainSnapshot`] and rebuilt from one
//! without talking to the ledger again, since every entry carries the full
//! normalized transaction detail.

use std::fs;
use std::path::{Path, PathBuf};

use bitcoin::Network;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::network_serde;
use crate::error::{TraceError, TraceResult};
use crate::transaction::Transaction;

/// Current on-disk snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// The edge used to step from one chain entry to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub direction: Direction,
    /// 1-based, matching display numbering
    pub index: usize,
}

impl Edge {
    pub fn input(index: usize) -> Self {
        Edge {
            direction: Direction::Input,
            index,
        }
    }

    pub fn output(index: usize) -> Self {
        Edge {
            direction: Direction::Output,
            index,
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.direction, self.index)
    }
}

/// Where a chain started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainOrigin {
    /// The operator entered the first transaction id directly
    TransactionQuery,
    /// The first transaction was picked from this address's history
    Address { address: String },
}

impl std::fmt::Display for ChainOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainOrigin::TransactionQuery => write!(f, "initial query"),
            ChainOrigin::Address { address } => write!(f, "from address {address}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub transaction: Transaction,
    /// Edge of the previous entry that leads here; `None` for the first entry
    pub edge: Option<Edge>,
}

/// Ordered record of the transactions visited during a trace.
///
/// Consecutive entries are always connected by the recorded edge: output N of
/// entry `i` is spent by entry `i + 1`, or input N of entry `i` consumes an
/// output of entry `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStore {
    network: Network,
    origin: Option<ChainOrigin>,
    entries: Vec<ChainEntry>,
}

impl ChainStore {
    pub fn new(network: Network) -> Self {
        ChainStore {
            network,
            origin: None,
            entries: Vec::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn origin(&self) -> Option<&ChainOrigin> {
        self.origin.as_ref()
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the first node of the chain.
    pub fn start(&mut self, transaction: Transaction, origin: ChainOrigin) -> TraceResult<()> {
        if !self.entries.is_empty() {
            return Err(TraceError::InvalidEdge(
                "chain already has a starting node".to_string(),
            ));
        }
        info!(txid = %transaction.txid, %origin, "starting chain");
        self.origin = Some(origin);
        self.entries.push(ChainEntry {
            transaction,
            edge: None,
        });
        Ok(())
    }

    /// Appends `transaction`, reached from the current node through `edge`.
    pub fn append(&mut self, transaction: Transaction, edge: Edge) -> TraceResult<()> {
        let current = self.entries.last().ok_or_else(|| {
            TraceError::InvalidEdge("chain has no starting node to append to".to_string())
        })?;
        check_edge(&current.transaction, edge, &transaction.txid).map_err(TraceError::InvalidEdge)?;

        info!(
            from = %current.transaction.txid,
            to = %transaction.txid,
            %edge,
            length = self.entries.len() + 1,
            "chain extended"
        );
        self.entries.push(ChainEntry {
            transaction,
            edge: Some(edge),
        });
        Ok(())
    }

    /// The last node of the chain.
    pub fn current(&self) -> TraceResult<&Transaction> {
        self.entries
            .last()
            .map(|entry| &entry.transaction)
            .ok_or(TraceError::EmptyChain)
    }

    pub fn to_snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            version: SNAPSHOT_VERSION,
            network: self.network,
            origin: self.origin.clone(),
            entries: self
                .entries
                .iter()
                .map(|entry| SnapshotEntry {
                    txid: entry.transaction.txid.clone(),
                    edge: entry.edge,
                    transaction: entry.transaction.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a chain, rejecting any snapshot whose entries do not form a
    /// connected path.
    pub fn from_snapshot(snapshot: ChainSnapshot) -> TraceResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(TraceError::CorruptSnapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        if snapshot.origin.is_some() == snapshot.entries.is_empty() {
            return Err(TraceError::CorruptSnapshot(
                "origin must be present exactly when the chain has entries".to_string(),
            ));
        }

        let mut entries: Vec<ChainEntry> = Vec::with_capacity(snapshot.entries.len());
        for (position, entry) in snapshot.entries.into_iter().enumerate() {
            if entry.txid != entry.transaction.txid {
                return Err(TraceError::CorruptSnapshot(format!(
                    "entry {} is labelled {} but holds transaction {}",
                    position + 1,
                    entry.txid,
                    entry.transaction.txid
                )));
            }
            match (entries.last(), entry.edge) {
                (None, None) => {}
                (None, Some(edge)) => {
                    return Err(TraceError::CorruptSnapshot(format!(
                        "first entry records an incoming edge ({edge})"
                    )));
                }
                (Some(_), None) => {
                    return Err(TraceError::CorruptSnapshot(format!(
                        "entry {} has no incoming edge",
                        position + 1
                    )));
                }
                (Some(previous), Some(edge)) => {
                    check_edge(&previous.transaction, edge, &entry.txid).map_err(|reason| {
                        TraceError::CorruptSnapshot(format!("entry {}: {reason}", position + 1))
                    })?;
                }
            }
            entries.push(ChainEntry {
                transaction: entry.transaction,
                edge: entry.edge,
            });
        }

        Ok(ChainStore {
            network: snapshot.network,
            origin: snapshot.origin,
            entries,
        })
    }

    /// Writes the chain as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> TraceResult<()> {
        let json = serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| TraceError::Io(std::io::Error::other(e)))?;
        fs::write(path, json)?;
        debug!(path = %path.display(), entries = self.len(), "snapshot written");
        Ok(())
    }

    /// Writes the chain to `chain_dump_<unix-seconds>.json` inside `dir`,
    /// never overwriting an earlier dump. An empty chain is written as a
    /// snapshot without entries.
    pub fn dump_to_dir(&self, dir: &Path) -> TraceResult<PathBuf> {
        let stamp = chrono::Utc::now().timestamp();
        let mut path = dir.join(format!("chain_dump_{stamp}.json"));
        let mut suffix = 1;
        while path.exists() {
            path = dir.join(format!("chain_dump_{stamp}_{suffix}.json"));
            suffix += 1;
        }
        self.save_to_file(&path)?;
        info!(path = %path.display(), entries = self.len(), "chain dumped");
        Ok(path)
    }

    /// Reads a snapshot file. A missing or unreadable file is an I/O error;
    /// anything that is not a valid snapshot is `CorruptSnapshot`.
    pub fn load_from_file(path: &Path) -> TraceResult<Self> {
        let json = fs::read_to_string(path)?;
        let snapshot: ChainSnapshot = serde_json::from_str(&json)
            .map_err(|e| TraceError::CorruptSnapshot(format!("{}: {e}", path.display())))?;
        Self::from_snapshot(snapshot)
    }
}

/// Checks that following `edge` out of `from` arrives at `to_txid`.
fn check_edge(from: &Transaction, edge: Edge, to_txid: &str) -> Result<(), String> {
    let count = from.edge_count(edge.direction);
    if edge.index == 0 || edge.index > count {
        return Err(format!(
            "{edge} does not exist on {} ({count} {}s)",
            from.txid, edge.direction
        ));
    }
    match from.edge_target(edge.direction, edge.index) {
        Some(target) if target == to_txid => Ok(()),
        Some(target) => Err(format!(
            "{edge} of {} leads to {target}, not {to_txid}",
            from.txid
        )),
        None => Err(format!("{edge} of {} leads nowhere", from.txid)),
    }
}

/// Serializable form of a [`ChainStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub version: u32,
    #[serde(with = "network_serde")]
    pub network: Network,
    #[serde(default)]
    pub origin: Option<ChainOrigin>,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub txid: String,
    pub edge: Option<Edge>,
    pub transaction: Transaction,
}
