//! The ledger data source: an opaque, possibly failing lookup service for
//! addresses and transactions.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::address::AddressSummary;
use crate::config::TracerConfig;
use crate::error::{LookupKind, TraceError, TraceResult};
use crate::esplora::{
    normalize_address, normalize_transaction, EsploraAddress, EsploraAddressTx, EsploraOutspend,
    EsploraTx,
};
use crate::transaction::Transaction;

/// Lookup service the tracer pulls ledger data from.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Full detail of one transaction, outputs annotated with their spenders.
    async fn fetch_transaction(&self, txid: &str) -> TraceResult<Transaction>;

    /// Balance and the `limit` most recent transactions of an address.
    async fn fetch_address(&self, address: &str, limit: usize) -> TraceResult<AddressSummary>;
}

/// [`LedgerSource`] backed by an Esplora REST API (blockstream.info and friends).
pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
    request_delay: Duration,
    max_attempts: u32,
    backoff_base: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl EsploraClient {
    pub fn new(config: &TracerConfig) -> TraceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bitcrawler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TraceError::Network(format!("failed to build http client: {e}")))?;

        Ok(EsploraClient {
            client,
            base_url: config.base_url(),
            request_delay: config.request_delay,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            last_request: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETs `path` and decodes the JSON body, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        kind: LookupKind,
        id: &str,
    ) -> TraceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 1;
        loop {
            match self.get_once(&url, kind, id).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.backoff_base, attempt);
                    warn!(%url, attempt, error = %e, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        kind: LookupKind,
        id: &str,
    ) -> TraceResult<T> {
        self.pace().await;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TraceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            // esplora answers 400 for ids it cannot parse, which is just as absent
            return Err(TraceError::not_found(kind, id));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(TraceError::Network(format!("{url} returned {status}")));
        }
        if !status.is_success() {
            return Err(TraceError::MalformedResponse(format!(
                "{url} returned unexpected status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TraceError::Network(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| TraceError::MalformedResponse(format!("{url}: {e}")))
    }

    /// Keeps at least `request_delay` between consecutive requests.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl LedgerSource for EsploraClient {
    async fn fetch_transaction(&self, txid: &str) -> TraceResult<Transaction> {
        let raw: EsploraTx = self
            .get_json(&format!("/tx/{txid}"), LookupKind::Transaction, txid)
            .await?;
        if !raw.txid.eq_ignore_ascii_case(txid) {
            return Err(TraceError::MalformedResponse(format!(
                "asked for {txid}, received {}",
                raw.txid
            )));
        }
        let outspends: Vec<EsploraOutspend> = self
            .get_json(&format!("/tx/{txid}/outspends"), LookupKind::Transaction, txid)
            .await?;
        normalize_transaction(raw, outspends)
    }

    async fn fetch_address(&self, address: &str, limit: usize) -> TraceResult<AddressSummary> {
        let raw: EsploraAddress = self
            .get_json(&format!("/address/{address}"), LookupKind::Address, address)
            .await?;
        let txs: Vec<EsploraAddressTx> = self
            .get_json(&format!("/address/{address}/txs"), LookupKind::Address, address)
            .await?;
        Ok(normalize_address(raw, txs, limit))
    }
}

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
    base.saturating_mul(factor)
}
