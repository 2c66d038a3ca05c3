use std::str::FromStr;

use bitcoin::Txid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::Direction;
use crate::error::{TraceError, TraceResult};

/// Checks that `txid` is 64 hex characters.
pub fn validate_txid(txid: &str) -> TraceResult<()> {
    if txid.len() != 64 {
        return Err(TraceError::InvalidQuery(format!(
            "'{txid}' is not a transaction id (expected 64 hex characters)"
        )));
    }
    Txid::from_str(&txid.to_ascii_lowercase())
        .map(|_| ())
        .map_err(|e| TraceError::InvalidQuery(format!("'{txid}' is not a transaction id: {e}")))
}

/// Confirmation status of a transaction as reported by the ledger source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    /// Whether the transaction has been included in a block
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    /// Unix timestamp of the including block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

impl TxStatus {
    pub fn unconfirmed() -> Self {
        TxStatus {
            confirmed: false,
            block_height: None,
            block_hash: None,
            block_time: None,
        }
    }
}

/// The (txid, vout) pair an input consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPointRef {
    pub txid: String,
    pub vout: u32,
}

/// A transaction input, i.e. a backward edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The output this input consumes; `None` for a coinbase input
    pub previous_output: Option<OutPointRef>,
    /// Address that owned the consumed output, when the source knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Value of the consumed output in satoshis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        self.previous_output.is_none()
    }
}

/// The transaction (and input position) that consumed an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentBy {
    pub txid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_index: Option<u32>,
}

/// A transaction output, i.e. a forward edge once spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Destination address; `None` for scripts without an address form (OP_RETURN etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Amount in satoshis
    pub amount: u64,
    /// Spending transaction, `None` while unspent
    #[serde(default)]
    pub spent_by: Option<SpentBy>,
}

impl TxOutput {
    pub fn is_spent(&self) -> bool {
        self.spent_by.is_some()
    }
}

/// A normalized ledger transaction with its input and output edges.
///
/// Input and output order is exactly the order the ledger source reported;
/// nothing in the crate reorders them, so display numbering (1-based) is
/// stable across fetches and snapshot reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    pub status: TxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn is_confirmed(&self) -> bool {
        self.status.confirmed
    }

    /// 1-based input lookup.
    pub fn input(&self, n: usize) -> Option<&TxInput> {
        n.checked_sub(1).and_then(|i| self.inputs.get(i))
    }

    /// 1-based output lookup.
    pub fn output(&self, n: usize) -> Option<&TxOutput> {
        n.checked_sub(1).and_then(|i| self.outputs.get(i))
    }

    pub fn edge_count(&self, direction: Direction) -> usize {
        match direction {
            Direction::Input => self.inputs.len(),
            Direction::Output => self.outputs.len(),
        }
    }

    /// Txid reached by following edge `n` in `direction`, if that edge leads anywhere.
    pub fn edge_target(&self, direction: Direction, n: usize) -> Option<&str> {
        match direction {
            Direction::Input => self
                .input(n)
                .and_then(|input| input.previous_output.as_ref())
                .map(|prev| prev.txid.as_str()),
            Direction::Output => self
                .output(n)
                .and_then(|output| output.spent_by.as_ref())
                .map(|spent| spent.txid.as_str()),
        }
    }

    /// Sum of output amounts.
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// Sum of input amounts, `None` when any input amount is unknown (coinbase).
    pub fn total_input(&self) -> Option<u64> {
        self.inputs.iter().map(|i| i.amount).sum()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.status
            .block_time
            .and_then(|t| i64::try_from(t).ok())
            .and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            txid: "abc123".to_string(),
            status: TxStatus {
                confirmed: true,
                block_height: Some(800_000),
                block_hash: Some("blockhash".to_string()),
                block_time: Some(1_690_168_629),
            },
            fee: Some(500),
            inputs: vec![
                TxInput {
                    previous_output: Some(OutPointRef {
                        txid: "prev1".to_string(),
                        vout: 0,
                    }),
                    address: Some("addr_in".to_string()),
                    amount: Some(10_500),
                },
                TxInput {
                    previous_output: None,
                    address: None,
                    amount: None,
                },
            ],
            outputs: vec![
                TxOutput {
                    address: Some("addr_a".to_string()),
                    amount: 6_000,
                    spent_by: Some(SpentBy {
                        txid: "def456".to_string(),
                        input_index: Some(0),
                    }),
                },
                TxOutput {
                    address: Some("addr_b".to_string()),
                    amount: 4_000,
                    spent_by: None,
                },
            ],
        }
    }

    #[test]
    fn test_one_based_lookup() {
        let tx = sample_transaction();
        assert!(tx.output(0).is_none());
        assert_eq!(tx.output(1).map(|o| o.amount), Some(6_000));
        assert_eq!(tx.output(2).map(|o| o.amount), Some(4_000));
        assert!(tx.output(3).is_none());
        assert!(tx.input(0).is_none());
        assert!(tx.input(2).is_some_and(TxInput::is_coinbase));
    }

    #[test]
    fn test_edge_target() {
        let tx = sample_transaction();
        assert_eq!(tx.edge_target(Direction::Output, 1), Some("def456"));
        assert_eq!(tx.edge_target(Direction::Output, 2), None);
        assert_eq!(tx.edge_target(Direction::Input, 1), Some("prev1"));
        assert_eq!(tx.edge_target(Direction::Input, 2), None);
        assert_eq!(tx.edge_count(Direction::Input), 2);
    }

    #[test]
    fn test_totals_use_integer_satoshis() {
        let tx = sample_transaction();
        assert_eq!(tx.total_output(), 10_000);
        // coinbase input has no known amount
        assert_eq!(tx.total_input(), None);
    }

    #[test]
    fn test_validate_txid() {
        let genesis = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
        assert!(validate_txid(genesis).is_ok());
        assert!(validate_txid(&genesis.to_uppercase()).is_ok());
        assert!(matches!(validate_txid("abc123"), Err(TraceError::InvalidQuery(_))));
        assert!(validate_txid(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_timestamp() {
        let tx = sample_transaction();
        let ts = tx.timestamp().unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2023-07-24");

        let mut unconfirmed = tx.clone();
        unconfirmed.status = TxStatus::unconfirmed();
        assert!(unconfirmed.timestamp().is_none());
        assert!(!unconfirmed.is_confirmed());
    }
}
