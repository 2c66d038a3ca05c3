use async_trait::async_trait;
use bitcrawler::error::LookupKind;
use bitcrawler::transaction::{OutPointRef, SpentBy};
use bitcrawler::{
    AddressSummary, AddressTx, LedgerSource, Session, TraceError, TraceResult, TracerConfig,
    Transaction, TxInput, TxOutput, TxStatus,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// The genesis coinbase address, valid on mainnet.
pub const GENESIS_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

/// In-memory ledger that counts lookups and can be switched offline, or
/// stalled so transaction lookups never complete.
pub struct MockLedger {
    transactions: HashMap<String, Transaction>,
    addresses: HashMap<String, AddressSummary>,
    calls: AtomicUsize,
    offline: AtomicBool,
    stalled: AtomicBool,
}

impl MockLedger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        MockLedger {
            transactions: transactions
                .into_iter()
                .map(|tx| (tx.txid.clone(), tx))
                .collect(),
            addresses: HashMap::new(),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
        }
    }

    pub fn with_address(mut self, summary: AddressSummary) -> Self {
        self.addresses.insert(summary.address.clone(), summary);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    fn check_online(&self) -> TraceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(TraceError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn fetch_transaction(&self, txid: &str) -> TraceResult<Transaction> {
        self.check_online()?;
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| TraceError::not_found(LookupKind::Transaction, txid))
    }

    async fn fetch_address(&self, address: &str, limit: usize) -> TraceResult<AddressSummary> {
        self.check_online()?;
        let mut summary = self
            .addresses
            .get(address)
            .cloned()
            .ok_or_else(|| TraceError::not_found(LookupKind::Address, address))?;
        summary.transactions.truncate(limit);
        Ok(summary)
    }
}

/// Common test utilities for the tracer tests
pub struct TestUtils;

impl TestUtils {
    /// A 64 character txid made of one repeated hex digit
    pub fn txid(digit: char) -> String {
        std::iter::repeat(digit).take(64).collect()
    }

    /// Creates a confirmed test transaction. `parents` are the txids its inputs
    /// consume, `spenders` the spending txid of each output (`None` = unspent).
    pub fn create_test_transaction(
        txid: &str,
        parents: &[&str],
        spenders: &[Option<&str>],
    ) -> Transaction {
        Transaction {
            txid: txid.to_string(),
            status: TxStatus {
                confirmed: true,
                block_height: Some(1000),
                block_hash: Some("test_block_hash".to_string()),
                block_time: Some(1234567890),
            },
            fee: Some(100),
            inputs: parents
                .iter()
                .map(|parent| TxInput {
                    previous_output: Some(OutPointRef {
                        txid: parent.to_string(),
                        vout: 0,
                    }),
                    address: Some("input_address".to_string()),
                    amount: Some(5000),
                })
                .collect(),
            outputs: spenders
                .iter()
                .map(|spender| TxOutput {
                    address: Some("output_address".to_string()),
                    amount: 2450,
                    spent_by: spender.map(|txid| SpentBy {
                        txid: txid.to_string(),
                        input_index: Some(0),
                    }),
                })
                .collect(),
        }
    }

    /// Ledger with the path `root -> a -> b`: `a` has two outputs, the first
    /// spent by `b`, the second unspent.
    pub fn create_test_ledger() -> MockLedger {
        let root = Self::txid('0');
        let a = Self::txid('a');
        let b = Self::txid('b');

        MockLedger::new(vec![
            Self::create_test_transaction(&root, &[], &[Some(&a)]),
            Self::create_test_transaction(&a, &[&root], &[Some(&b), None]),
            Self::create_test_transaction(&b, &[&a], &[None]),
        ])
        .with_address(AddressSummary {
            address: GENESIS_ADDRESS.to_string(),
            balance: 5_000_000_000,
            unconfirmed_delta: 0,
            tx_count: 2,
            transactions: vec![
                AddressTx {
                    txid: b.clone(),
                    confirmed: true,
                },
                AddressTx {
                    txid: a.clone(),
                    confirmed: true,
                },
            ],
        })
    }

    pub fn create_test_config(dump_dir: &Path) -> TracerConfig {
        TracerConfig {
            dump_dir: dump_dir.to_path_buf(),
            ..TracerConfig::default()
        }
    }

    pub fn create_test_session(dump_dir: &Path) -> Session<MockLedger> {
        Session::with_config(Self::create_test_ledger(), &Self::create_test_config(dump_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txid_helper() {
        let txid = TestUtils::txid('a');
        assert_eq!(txid.len(), 64);
        assert!(txid.chars().all(|c| c == 'a'));
    }

    #[tokio::test]
    async fn test_mock_ledger() {
        let ledger = TestUtils::create_test_ledger();
        let a = ledger.fetch_transaction(&TestUtils::txid('a')).await.unwrap();
        assert_eq!(a.outputs.len(), 2);
        assert_eq!(ledger.calls(), 1);

        ledger.set_offline(true);
        let result = ledger.fetch_transaction(&TestUtils::txid('a')).await;
        assert!(matches!(result, Err(TraceError::Network(_))));

        ledger.set_offline(false);
        let missing = ledger.fetch_transaction(&TestUtils::txid('f')).await;
        assert!(matches!(missing, Err(TraceError::NotFound { .. })));

        let summary = ledger.fetch_address(GENESIS_ADDRESS, 1).await.unwrap();
        assert_eq!(summary.transactions.len(), 1);

        ledger.set_stalled(true);
        let txid = TestUtils::txid('a');
        let lookup = ledger.fetch_transaction(&txid);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), lookup).await;
        assert!(timed_out.is_err());
    }
}
