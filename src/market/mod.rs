//! Third-party market data: CoinGecko prices and CryptoPanic news

pub mod coingecko;
pub mod convert;
pub mod news;

pub use coingecko::{CoinGeckoClient, MarketsQuery};
pub use convert::{convert, ConversionQuote, ConvertParams, ConvertRequest};
pub use news::{CryptoPanicClient, NewsQuery};

use crate::error::{TradelogError, TradelogResult};
use crate::metrics;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// USD spot price lookup by ticker symbol
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `Ok(None)` when the symbol is unknown
    async fn usd_price(&self, symbol: &str) -> TradelogResult<Option<Decimal>>;
}

pub(crate) fn http_client(timeout_secs: u64) -> TradelogResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TradelogError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send a GET and decode the JSON body, mapping every failure to `UpstreamApi`
///
/// URLs are stripped from error text since some carry credentials.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    service: &str,
    request: reqwest::RequestBuilder,
) -> TradelogResult<T> {
    let result = send_for_json::<T>(request).await;

    match result {
        Ok(value) => {
            debug!("{} request succeeded", service);
            metrics::record_upstream(service, true);
            Ok(value)
        }
        Err(message) => {
            warn!("{} request failed: {}", service, message);
            metrics::record_upstream(service, false);
            Err(TradelogError::upstream(service, message))
        }
    }
}

async fn send_for_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, String> {
    let resp = request
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e.without_url()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("{} {}", status, body.chars().take(200).collect::<String>()));
    }

    resp.json::<T>()
        .await
        .map_err(|e| format!("malformed response: {}", e.without_url()))
}
