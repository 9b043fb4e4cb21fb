//! Paginated transaction history

use crate::chain::{AccountAddress, ChainClient, TransactionSummary};
use crate::error::{TradelogError, TradelogResult};

use serde::Serialize;
use std::sync::Arc;

/// An account's transactions, newest first
#[derive(Debug, Clone)]
pub struct TransactionHistory {
    transactions: Vec<TransactionSummary>,
    page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub hash: String,
    pub success: bool,
    /// Microseconds since the epoch
    pub timestamp: u64,
    /// RFC 3339 rendering of `timestamp`
    pub time: Option<String>,
}

impl From<&TransactionSummary> for HistoryEntry {
    fn from(txn: &TransactionSummary) -> Self {
        Self {
            hash: txn.hash.clone(),
            success: txn.success,
            timestamp: txn.timestamp,
            time: txn.time().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_transactions: usize,
    pub transactions: Vec<HistoryEntry>,
}

impl TransactionHistory {
    pub fn new(mut transactions: Vec<TransactionSummary>, page_size: usize) -> Self {
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            transactions,
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        self.transactions.len().div_ceil(self.page_size)
    }

    /// 1-based page; an empty history has only an empty page 1
    pub fn page(&self, page: usize) -> TradelogResult<HistoryPage> {
        let total_pages = self.total_pages();
        let last_page = total_pages.max(1);

        if page == 0 || page > last_page {
            return Err(TradelogError::InvalidInput(format!(
                "Page {} out of range 1..={}",
                page, last_page
            )));
        }

        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.transactions.len());
        let transactions = self.transactions[start.min(end)..end]
            .iter()
            .map(HistoryEntry::from)
            .collect();

        Ok(HistoryPage {
            page,
            page_size: self.page_size,
            total_pages,
            total_transactions: self.transactions.len(),
            transactions,
        })
    }
}

pub struct HistoryQuery {
    client: Arc<dyn ChainClient>,
    page_size: usize,
}

impl HistoryQuery {
    pub fn new(client: Arc<dyn ChainClient>, page_size: usize) -> Self {
        Self { client, page_size }
    }

    pub async fn history(&self, address: AccountAddress) -> TradelogResult<TransactionHistory> {
        let transactions = self.client.get_account_transactions(address).await?;
        Ok(TransactionHistory::new(transactions, self.page_size))
    }

    pub async fn page(&self, address: AccountAddress, page: usize) -> TradelogResult<HistoryPage> {
        self.history(address).await?.page(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use rstest::rstest;

    fn txns(n: usize) -> Vec<TransactionSummary> {
        (0..n)
            .map(|i| TransactionSummary {
                hash: format!("0x{:02x}", i),
                success: i % 3 != 0,
                timestamp: 1_700_000_000_000_000 + i as u64 * 1_000_000,
            })
            .collect()
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(5, 1, 5)]
    #[case(6, 2, 1)]
    #[case(12, 3, 2)]
    #[case(15, 3, 5)]
    fn test_last_page_holds_remainder(
        #[case] n: usize,
        #[case] pages: usize,
        #[case] last_len: usize,
    ) {
        let history = TransactionHistory::new(txns(n), 5);
        assert_eq!(history.total_pages(), pages);

        let last = history.page(pages).unwrap();
        assert_eq!(last.transactions.len(), last_len);
        assert_eq!(last.total_transactions, n);
    }

    #[rstest]
    #[case(7, 0)]
    #[case(7, 3)]
    #[case(0, 2)]
    fn test_out_of_range_pages_rejected(#[case] n: usize, #[case] page: usize) {
        let history = TransactionHistory::new(txns(n), 5);
        assert!(matches!(
            history.page(page),
            Err(TradelogError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_history_first_page() {
        let history = TransactionHistory::new(Vec::new(), 5);
        let page = history.page(1).unwrap();
        assert_eq!(page.total_pages, 0);
        assert!(page.transactions.is_empty());
    }

    #[test]
    fn test_sorted_newest_first() {
        let mut input = txns(7);
        input.swap(0, 4);
        let history = TransactionHistory::new(input, 5);

        let first = history.page(1).unwrap();
        let stamps: Vec<u64> = first.transactions.iter().map(|t| t.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(first.transactions[0].hash, "0x06");
        assert!(first.transactions[0].time.is_some());
    }

    #[tokio::test]
    async fn test_query_fetches_from_chain() {
        let mut client = MockChainClient::new();
        client
            .expect_get_account_transactions()
            .times(1)
            .returning(|_| Ok(txns(11)));

        let query = HistoryQuery::new(Arc::new(client), 5);
        let page = query
            .page(AccountAddress::from_hex("0x1").unwrap(), 3)
            .await
            .unwrap();
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.transactions[0].hash, "0x00");
    }
}
