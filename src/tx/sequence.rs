//! Sequence-number handling for reliable transaction submission
//!
//! Handles:
//! - Per-account serialization of the fetch/build/sign/submit/confirm cycle
//! - Fresh sequence lookups (never cached across submissions)

use crate::chain::{AccountAddress, ChainClient};
use crate::error::TradelogResult;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Serializes submissions per sender address
#[derive(Default)]
pub struct SequenceManager {
    locks: DashMap<AccountAddress, Arc<Mutex<()>>>,
}

impl SequenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the submission lock for an account
    ///
    /// Held until the returned guard drops. Accounts are independent.
    pub async fn lock(&self, address: AccountAddress) -> OwnedMutexGuard<()> {
        // Clone the Arc out so no DashMap shard guard lives across the await
        let lock = self
            .locks
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }

    /// Current on-chain sequence number, fetched on every call
    pub async fn fetch(
        &self,
        client: &dyn ChainClient,
        address: AccountAddress,
    ) -> TradelogResult<u64> {
        let account = client.get_account(address).await?;
        debug!(
            "Fetched sequence number {} for {}",
            account.sequence_number, address
        );
        Ok(account.sequence_number)
    }

    /// Number of accounts that have submitted through this manager
    pub fn tracked_accounts(&self) -> usize {
        self.locks.len()
    }
}
