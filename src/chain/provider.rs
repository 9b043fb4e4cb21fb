//! Ledger REST client with multi-node read failover

use super::types::{
    AccountAddress, AccountInfo, AccountResource, GasEstimate, NodeError, SubmittedTransaction,
    TransactionInfo, TransactionStatus, TransactionSummary, TxHash,
};
use super::ChainClient;
use crate::config::ChainConfig;
use crate::error::{TradelogError, TradelogResult};
use crate::tx::SignedTransaction;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

const SIGNED_TXN_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";

/// Largest page the node serves for account transactions
const TRANSACTIONS_PAGE_LIMIT: usize = 100;

/// REST wrapper over one or more fullnode base URLs
///
/// Reads fail over to the next URL on transport errors and 5xx responses.
/// Submissions go to the active URL only; the network rejects a replayed
/// sequence number anyway, but there is no point in racing two nodes.
pub struct RestChainClient {
    /// Chain configuration
    config: ChainConfig,
    /// Base URLs without trailing slash
    node_urls: Vec<String>,
    /// Current active node index
    current_node: AtomicUsize,
    http: reqwest::Client,
}

impl RestChainClient {
    /// Create a new chain client
    pub fn new(config: ChainConfig) -> TradelogResult<Self> {
        let node_urls: Vec<String> = config
            .node_urls
            .iter()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .collect();

        if node_urls.is_empty() {
            return Err(TradelogError::Config("No chain node URLs configured".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TradelogError::Config(format!("Failed to build HTTP client: {}", e)))?;

        debug!(
            "Chain client for chain {} using {} node(s)",
            config.chain_id,
            node_urls.len()
        );

        Ok(Self {
            config,
            node_urls,
            current_node: AtomicUsize::new(0),
            http,
        })
    }

    /// Get the active node URL
    pub fn active_url(&self) -> &str {
        let idx = self.current_node.load(Ordering::Relaxed);
        &self.node_urls[idx % self.node_urls.len()]
    }

    /// Switch to next available node
    pub fn failover(&self) {
        let current = self.current_node.load(Ordering::Relaxed);
        let next = (current + 1) % self.node_urls.len();
        self.current_node.store(next, Ordering::Relaxed);
        if self.node_urls.len() > 1 {
            warn!("Chain {} failover to node {}", self.config.chain_id, next);
        }
    }

    /// GET with failover; the returned response may still carry a 4xx status
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, String> {
        let mut last_error = String::from("no node attempted");

        for _ in 0..self.node_urls.len() {
            let url = format!("{}{}", self.active_url(), path);
            match self.http.get(&url).query(query).send().await {
                Ok(resp) if resp.status().is_server_error() => {
                    warn!("GET {} returned {}", url, resp.status());
                    last_error = format!("{} returned {}", url, resp.status());
                    self.failover();
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!("GET {} failed: {}", url, e);
                    last_error = e.to_string();
                    self.failover();
                }
            }
        }

        Err(format!("All nodes failed: {}", last_error))
    }

    fn upstream(message: impl Into<String>) -> TradelogError {
        TradelogError::upstream("chain", message)
    }
}

/// Extract the node's error message from a non-2xx response
async fn node_error_message(resp: Response) -> String {
    let status = resp.status();
    match resp.text().await {
        Ok(body) => match serde_json::from_str::<NodeError>(&body) {
            Ok(err) => match err.error_code {
                Some(code) => format!("{} ({}): {}", status, code, err.message),
                None => format!("{}: {}", status, err.message),
            },
            Err(_) if body.is_empty() => status.to_string(),
            Err(_) => format!("{}: {}", status, body),
        },
        Err(e) => format!("{}: {}", status, e),
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, String> {
    resp.json::<T>()
        .await
        .map_err(|e| format!("Malformed node response: {}", e))
}

#[async_trait]
impl ChainClient for RestChainClient {
    async fn get_account(&self, address: AccountAddress) -> TradelogResult<AccountInfo> {
        let lookup_error = |message: String| TradelogError::AccountLookup {
            address: address.to_hex(),
            message,
        };

        let resp = self
            .get(&format!("/accounts/{}", address), &[])
            .await
            .map_err(lookup_error)?;

        if !resp.status().is_success() {
            return Err(lookup_error(node_error_message(resp).await));
        }

        decode(resp).await.map_err(lookup_error)
    }

    async fn get_account_resources(
        &self,
        address: AccountAddress,
    ) -> TradelogResult<Vec<AccountResource>> {
        let resp = self
            .get(&format!("/accounts/{}/resources", address), &[])
            .await
            .map_err(Self::upstream)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(TradelogError::AccountLookup {
                address: address.to_hex(),
                message: node_error_message(resp).await,
            });
        }
        if !resp.status().is_success() {
            return Err(Self::upstream(node_error_message(resp).await));
        }

        decode(resp).await.map_err(Self::upstream)
    }

    async fn get_account_transactions(
        &self,
        address: AccountAddress,
    ) -> TradelogResult<Vec<TransactionSummary>> {
        let path = format!("/accounts/{}/transactions", address);
        let mut all = Vec::new();
        let mut start: u64 = 0;

        loop {
            let query = [
                ("start", start.to_string()),
                ("limit", TRANSACTIONS_PAGE_LIMIT.to_string()),
            ];
            let resp = self.get(&path, &query).await.map_err(Self::upstream)?;

            if resp.status() == StatusCode::NOT_FOUND {
                return Err(TradelogError::AccountLookup {
                    address: address.to_hex(),
                    message: node_error_message(resp).await,
                });
            }
            if !resp.status().is_success() {
                return Err(Self::upstream(node_error_message(resp).await));
            }

            let page: Vec<TransactionSummary> = decode(resp).await.map_err(Self::upstream)?;
            let fetched = page.len();
            all.extend(page);

            if fetched < TRANSACTIONS_PAGE_LIMIT {
                break;
            }
            start += fetched as u64;
        }

        debug!("Fetched {} transactions for {}", all.len(), address);
        Ok(all)
    }

    async fn submit_transaction(&self, txn: &SignedTransaction) -> TradelogResult<TxHash> {
        let url = format!("{}/transactions", self.active_url());

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, SIGNED_TXN_CONTENT_TYPE)
            .body(txn.to_bcs()?)
            .send()
            .await
            .map_err(|e| {
                error!("Transaction submission to {} failed: {}", url, e);
                TradelogError::Submission(e.to_string())
            })?;

        if !resp.status().is_success() {
            let message = node_error_message(resp).await;
            warn!(
                "Node rejected transaction (sender {}, sequence {}): {}",
                txn.raw().sender(),
                txn.raw().sequence_number(),
                message
            );
            return Err(TradelogError::Submission(message));
        }

        let submitted: SubmittedTransaction =
            decode(resp).await.map_err(TradelogError::Submission)?;
        Ok(TxHash::new(submitted.hash))
    }

    async fn get_transaction_by_hash(&self, hash: &TxHash) -> TradelogResult<TransactionStatus> {
        let resp = self
            .get(&format!("/transactions/by_hash/{}", hash), &[])
            .await
            .map_err(Self::upstream)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(TransactionStatus::NotFound);
        }
        if !resp.status().is_success() {
            return Err(Self::upstream(node_error_message(resp).await));
        }

        let info: TransactionInfo = decode(resp).await.map_err(Self::upstream)?;
        Ok(info.status())
    }

    async fn estimate_gas_price(&self) -> TradelogResult<u64> {
        let resp = self
            .get("/estimate_gas_price", &[])
            .await
            .map_err(Self::upstream)?;

        if !resp.status().is_success() {
            return Err(Self::upstream(node_error_message(resp).await));
        }

        let estimate: GasEstimate = decode(resp).await.map_err(Self::upstream)?;
        Ok(estimate.gas_estimate)
    }

    async fn health_check(&self) -> bool {
        match self.get("/", &[]).await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                error!(
                    "Health check failed for chain {}: {}",
                    self.config.chain_id,
                    resp.status()
                );
                false
            }
            Err(e) => {
                error!("Health check failed for chain {}: {}", self.config.chain_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    #[test]
    fn test_rejects_empty_node_list() {
        let mut config = test_settings().chain;
        config.node_urls = vec![String::new()];
        assert!(matches!(
            RestChainClient::new(config),
            Err(TradelogError::Config(_))
        ));
    }

    #[test]
    fn test_failover_rotates_nodes() {
        let mut config = test_settings().chain;
        config.node_urls = vec![
            "http://node-a/v1/".to_string(),
            "http://node-b/v1".to_string(),
        ];
        let client = RestChainClient::new(config).unwrap();

        assert_eq!(client.active_url(), "http://node-a/v1");
        client.failover();
        assert_eq!(client.active_url(), "http://node-b/v1");
        client.failover();
        assert_eq!(client.active_url(), "http://node-a/v1");
    }
}
