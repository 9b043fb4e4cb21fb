//! Read-only account reporting: coin balance and transaction history

mod balance;
mod history;

pub use balance::{BalanceQuery, CoinBalance, COIN_DECIMALS};
pub use history::{HistoryEntry, HistoryPage, HistoryQuery, TransactionHistory};
