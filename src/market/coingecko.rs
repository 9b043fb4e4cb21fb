//! CoinGecko REST client

use super::{fetch_json, http_client, PriceSource};
use crate::config::MarketConfig;
use crate::error::TradelogResult;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

const SERVICE: &str = "coingecko";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const VS_CURRENCY: &str = "usd";

/// Paging for `/coins/markets`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MarketsQuery {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_per_page() -> u32 {
    100
}

fn default_page() -> u32 {
    1
}

impl Default for MarketsQuery {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

/// Entry of `/coins/list`
#[derive(Debug, Clone, Deserialize)]
struct CoinListing {
    id: String,
    symbol: String,
}

pub struct CoinGeckoClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl CoinGeckoClient {
    pub fn new(config: &MarketConfig) -> TradelogResult<Self> {
        Ok(Self {
            base_url: config.coingecko_url.trim_end_matches('/').to_string(),
            api_key: config
                .coingecko_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            http: http_client(config.request_timeout_secs)?,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Market overview ordered by market cap, passed through untouched
    pub async fn markets(&self, query: MarketsQuery) -> TradelogResult<Value> {
        let request = self.get("/coins/markets").query(&[
            ("vs_currency", VS_CURRENCY.to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
            ("sparkline", "false".to_string()),
        ]);
        fetch_json(SERVICE, request).await
    }

    /// USD spot prices keyed by coin id; unknown ids are simply absent
    pub async fn simple_prices(&self, ids: &[&str]) -> TradelogResult<HashMap<String, Decimal>> {
        let request = self.get("/simple/price").query(&[
            ("ids", ids.join(",")),
            ("vs_currencies", VS_CURRENCY.to_string()),
        ]);
        let body: HashMap<String, HashMap<String, Value>> = fetch_json(SERVICE, request).await?;

        let prices = body
            .into_iter()
            .filter_map(|(id, quotes)| {
                let price = quotes.get(VS_CURRENCY).and_then(price_from_json)?;
                Some((id, price))
            })
            .collect();
        Ok(prices)
    }

    /// First coin id whose ticker symbol matches, case-insensitively
    pub async fn coin_id_for_symbol(&self, symbol: &str) -> TradelogResult<Option<String>> {
        let listings: Vec<CoinListing> = fetch_json(SERVICE, self.get("/coins/list")).await?;
        let symbol = symbol.trim().to_lowercase();

        Ok(listings
            .into_iter()
            .find(|coin| coin.symbol.to_lowercase() == symbol)
            .map(|coin| coin.id))
    }

    pub async fn price_for_symbol(&self, symbol: &str) -> TradelogResult<Option<Decimal>> {
        let Some(id) = self.coin_id_for_symbol(symbol).await? else {
            debug!("No CoinGecko id for symbol {}", symbol);
            return Ok(None);
        };

        let mut prices = self.simple_prices(&[id.as_str()]).await?;
        Ok(prices.remove(&id))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn usd_price(&self, symbol: &str) -> TradelogResult<Option<Decimal>> {
        self.price_for_symbol(symbol).await
    }
}

/// Prices arrive as JSON numbers, occasionally in exponent form
fn price_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(50000), "50000")]
    #[case(json!(0.5), "0.5")]
    #[case(json!("2500.25"), "2500.25")]
    #[case(json!(1.2e-7), "0.00000012")]
    fn test_price_from_json(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(
            price_from_json(&value),
            Some(Decimal::from_str(expected).unwrap())
        );
    }

    #[test]
    fn test_price_rejects_non_numbers() {
        assert_eq!(price_from_json(&json!(null)), None);
        assert_eq!(price_from_json(&json!("n/a")), None);
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let mut config = crate::config::test_settings().market;
        config.coingecko_api_key = Some("  ".into());
        let client = CoinGeckoClient::new(&config).unwrap();
        assert!(client.api_key.is_none());
    }
}
