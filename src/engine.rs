//! The traversal engine. Resolves input/output edges of the current node,
//! fetches the next transaction (from its cache when possible) and grows the
//! chain.

use std::collections::HashMap;

use bitcoin::Network;
use tracing::debug;

use crate::address::AddressSummary;
use crate::chain::{ChainOrigin, ChainStore, Direction, Edge};
use crate::error::{TraceError, TraceResult};
use crate::source::LedgerSource;
use crate::transaction::Transaction;

pub struct Tracer<S> {
    source: S,
    network: Network,
    recent_tx_count: usize,
    /// Confirmed transactions only; unconfirmed ones can still change.
    cache: HashMap<String, Transaction>,
    chain: ChainStore,
}

impl<S: LedgerSource> Tracer<S> {
    pub fn new(source: S, network: Network, recent_tx_count: usize) -> Self {
        Tracer {
            source,
            network,
            recent_tx_count,
            cache: HashMap::new(),
            chain: ChainStore::new(network),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn chain(&self) -> &ChainStore {
        &self.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn current(&self) -> TraceResult<&Transaction> {
        self.chain.current()
    }

    fn cached(&self, txid: &str) -> Option<&Transaction> {
        self.cache.get(txid)
    }

    /// Looks an address up. Address data is never cached.
    pub async fn lookup_address(&self, address: &str) -> TraceResult<AddressSummary> {
        self.source
            .fetch_address(address, self.recent_tx_count)
            .await
    }

    /// Discards the current chain and begins a new one at `txid`.
    ///
    /// On failure the previous chain is left as it was.
    pub async fn start(&mut self, txid: &str, origin: ChainOrigin) -> TraceResult<&Transaction> {
        let transaction = self.fetch(txid).await?;
        let mut chain = ChainStore::new(self.network);
        chain.start(transaction, origin)?;
        self.chain = chain;
        self.chain.current()
    }

    /// Follows output `n` (1-based) of the current node to its spending transaction.
    pub async fn follow_output(&mut self, n: usize) -> TraceResult<&Transaction> {
        let current = self.chain.current()?;
        let count = current.outputs.len();
        let output = current.output(n).ok_or(TraceError::IndexOutOfRange {
            direction: Direction::Output,
            index: n,
            count,
        })?;
        let next_txid = output
            .spent_by
            .as_ref()
            .map(|spent| spent.txid.clone())
            .ok_or(TraceError::UnspentOutput(n))?;

        self.advance(&next_txid, Edge::output(n)).await
    }

    /// Follows input `n` (1-based) of the current node back to the transaction
    /// that created the consumed output.
    pub async fn follow_input(&mut self, n: usize) -> TraceResult<&Transaction> {
        let current = self.chain.current()?;
        let count = current.inputs.len();
        let input = current.input(n).ok_or(TraceError::IndexOutOfRange {
            direction: Direction::Input,
            index: n,
            count,
        })?;
        let next_txid = input
            .previous_output
            .as_ref()
            .map(|prev| prev.txid.clone())
            .ok_or(TraceError::CoinbaseInput(n))?;

        self.advance(&next_txid, Edge::input(n)).await
    }

    /// Replaces the chain with a loaded one. Only the node it resumes at seeds
    /// the cache; earlier nodes are refetched when revisited, since their
    /// outputs may have been spent after the dump.
    pub fn resume(&mut self, chain: ChainStore) {
        if let Ok(current) = chain.current() {
            if current.is_confirmed() {
                self.cache
                    .entry(current.txid.clone())
                    .or_insert_with(|| current.clone());
            }
        }
        self.chain = chain;
    }

    /// Drops the chain. The cache survives for the rest of the session.
    pub fn reset(&mut self) {
        self.chain = ChainStore::new(self.network);
    }

    async fn advance(&mut self, txid: &str, edge: Edge) -> TraceResult<&Transaction> {
        let transaction = self.fetch(txid).await?;
        self.chain.append(transaction, edge)?;
        self.chain.current()
    }

    async fn fetch(&mut self, txid: &str) -> TraceResult<Transaction> {
        if let Some(transaction) = self.cached(txid) {
            debug!(%txid, "cache hit");
            return Ok(transaction.clone());
        }

        let transaction = self.source.fetch_transaction(txid).await?;
        if transaction.is_confirmed() {
            self.cache.insert(txid.to_string(), transaction.clone());
        } else {
            debug!(%txid, "unconfirmed, not caching");
        }
        Ok(transaction)
    }
}
