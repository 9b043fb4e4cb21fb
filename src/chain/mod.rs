//! Chain module - ledger REST access and confirmation tracking
//!
//! This module provides:
//! - The `ChainClient` seam used by the submission workflow and queries
//! - A REST implementation with read failover across node URLs
//! - Confirmation polling bounded by a timeout

pub mod finality;
pub mod provider;
pub mod types;

pub use finality::FinalityWaiter;
pub use provider::RestChainClient;
pub use types::{
    AccountAddress, AccountInfo, AccountResource, TransactionStatus, TransactionSummary, TxHash,
};

use crate::error::TradelogResult;
use crate::tx::SignedTransaction;

use async_trait::async_trait;

/// Remote ledger operations needed by the relayer
///
/// Implementations are stateless wrappers around the node API; every call is
/// a fresh round trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sequence number and authentication key; `AccountLookup` if unknown
    async fn get_account(&self, address: AccountAddress) -> TradelogResult<AccountInfo>;

    async fn get_account_resources(
        &self,
        address: AccountAddress,
    ) -> TradelogResult<Vec<AccountResource>>;

    /// Every committed transaction sent by the account
    async fn get_account_transactions(
        &self,
        address: AccountAddress,
    ) -> TradelogResult<Vec<TransactionSummary>>;

    async fn submit_transaction(&self, txn: &SignedTransaction) -> TradelogResult<TxHash>;

    async fn get_transaction_by_hash(&self, hash: &TxHash) -> TradelogResult<TransactionStatus>;

    /// Current gas unit price suggested by the node
    async fn estimate_gas_price(&self) -> TradelogResult<u64>;

    async fn health_check(&self) -> bool;
}
