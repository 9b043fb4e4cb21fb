//! Confirmation tracking for submitted transactions
//!
//! The ledger finalizes on commit, so a transaction is confirmed as soon as
//! the node reports it committed. Waiting is bounded by a wall-clock timeout;
//! dropping the future stops polling.

use super::types::{TransactionStatus, TxHash};
use super::ChainClient;
use crate::config::SubmissionConfig;
use crate::error::{TradelogError, TradelogResult};

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Polls a transaction by hash until it commits or the timeout elapses
#[derive(Debug, Clone, Copy)]
pub struct FinalityWaiter {
    poll_interval: Duration,
    timeout: Duration,
}

impl FinalityWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_secs(config.confirmation_timeout_secs),
        )
    }

    /// Wait for a successful commit
    ///
    /// Transient lookup failures keep the loop polling. A commit whose VM
    /// status is not success is a `Submission` error; running out of time
    /// is `ConfirmationTimeout`.
    pub async fn wait(&self, client: &dyn ChainClient, hash: &TxHash) -> TradelogResult<()> {
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, self.poll(client, hash)).await {
            Ok(result) => result,
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!("Transaction {} not committed after {}ms", hash, waited_ms);
                Err(TradelogError::ConfirmationTimeout {
                    tx_hash: hash.to_string(),
                    waited_ms,
                })
            }
        }
    }

    async fn poll(&self, client: &dyn ChainClient, hash: &TxHash) -> TradelogResult<()> {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            match client.get_transaction_by_hash(hash).await {
                Ok(TransactionStatus::Committed { success: true, .. }) => {
                    info!("Transaction {} committed after {} poll(s)", hash, attempts);
                    return Ok(());
                }
                Ok(TransactionStatus::Committed {
                    success: false,
                    vm_status,
                }) => {
                    warn!("Transaction {} aborted: {}", hash, vm_status);
                    return Err(TradelogError::Submission(format!(
                        "Transaction {} failed on chain: {}",
                        hash, vm_status
                    )));
                }
                Ok(TransactionStatus::Pending) | Ok(TransactionStatus::NotFound) => {
                    debug!("Transaction {} not yet committed", hash);
                }
                Err(e) if e.is_retryable() => {
                    debug!("Lookup of {} failed, will retry: {}", hash, e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
