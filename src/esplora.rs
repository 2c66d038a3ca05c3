//! Raw response shapes of the Esplora REST API and their normalization into
//! the crate's transaction and address model.

use serde::Deserialize;

use crate::address::{AddressSummary, AddressTx};
use crate::error::{TraceError, TraceResult};
use crate::transaction::{OutPointRef, SpentBy, Transaction, TxInput, TxOutput, TxStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u32>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_time: Option<u64>,
}

impl From<EsploraStatus> for TxStatus {
    fn from(status: EsploraStatus) -> Self {
        TxStatus {
            confirmed: status.confirmed,
            block_height: status.block_height,
            block_hash: status.block_hash,
            block_time: status.block_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraPrevout {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraVin {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub prevout: Option<EsploraPrevout>,
    #[serde(default)]
    pub is_coinbase: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraVout {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

/// `GET /tx/{txid}`
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraTx {
    pub txid: String,
    pub vin: Vec<EsploraVin>,
    pub vout: Vec<EsploraVout>,
    pub status: EsploraStatus,
    #[serde(default)]
    pub fee: Option<u64>,
}

/// One element of `GET /tx/{txid}/outspends`.
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraOutspend {
    pub spent: bool,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vin: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraStats {
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
    pub tx_count: u64,
}

/// `GET /address/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraAddress {
    pub address: String,
    pub chain_stats: EsploraStats,
    pub mempool_stats: EsploraStats,
}

/// The fields we keep from each element of `GET /address/{address}/txs`.
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraAddressTx {
    pub txid: String,
    pub status: EsploraStatus,
}

/// Merges a transaction with its outspends list.
pub fn normalize_transaction(
    raw: EsploraTx,
    outspends: Vec<EsploraOutspend>,
) -> TraceResult<Transaction> {
    if outspends.len() != raw.vout.len() {
        return Err(TraceError::MalformedResponse(format!(
            "{} has {} outputs but {} outspend entries",
            raw.txid,
            raw.vout.len(),
            outspends.len()
        )));
    }

    let inputs = raw
        .vin
        .into_iter()
        .map(|vin| {
            let (address, amount) = match vin.prevout {
                Some(prevout) => (prevout.scriptpubkey_address, Some(prevout.value)),
                None => (None, None),
            };
            TxInput {
                previous_output: (!vin.is_coinbase).then(|| OutPointRef {
                    txid: vin.txid,
                    vout: vin.vout,
                }),
                address,
                amount,
            }
        })
        .collect();

    let mut outputs = Vec::with_capacity(raw.vout.len());
    for (position, (vout, outspend)) in raw.vout.into_iter().zip(outspends).enumerate() {
        let spent_by = match (outspend.spent, outspend.txid) {
            (false, _) => None,
            (true, Some(txid)) => Some(SpentBy {
                txid,
                input_index: outspend.vin,
            }),
            (true, None) => {
                return Err(TraceError::MalformedResponse(format!(
                    "output {} of {} is marked spent without a spending txid",
                    position + 1,
                    raw.txid
                )));
            }
        };
        outputs.push(TxOutput {
            address: vout.scriptpubkey_address,
            amount: vout.value,
            spent_by,
        });
    }

    Ok(Transaction {
        txid: raw.txid,
        status: raw.status.into(),
        fee: raw.fee,
        inputs,
        outputs,
    })
}

pub fn normalize_address(
    raw: EsploraAddress,
    txs: Vec<EsploraAddressTx>,
    limit: usize,
) -> AddressSummary {
    let chain = raw.chain_stats;
    let mempool = raw.mempool_stats;
    let signed = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);

    AddressSummary {
        address: raw.address,
        balance: chain.funded_txo_sum.saturating_sub(chain.spent_txo_sum),
        unconfirmed_delta: signed(mempool.funded_txo_sum) - signed(mempool.spent_txo_sum),
        tx_count: chain.tx_count,
        transactions: txs
            .into_iter()
            .take(limit)
            .map(|tx| AddressTx {
                txid: tx.txid,
                confirmed: tx.status.confirmed,
            })
            .collect(),
    }
}
