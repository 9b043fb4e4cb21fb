//! Aptos trade-log relayer
//!
//! Records trade actions on chain through a Move entry function, reports
//! account balances and history, and proxies market data for the dashboard.

pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod predict;
pub mod query;
pub mod trading;
pub mod tx;
pub mod wallet;

pub use config::Settings;
pub use error::{TradelogError, TradelogResult};
