//! CryptoPanic news feed

use super::{fetch_json, http_client};
use crate::config::MarketConfig;
use crate::error::TradelogResult;

use serde::Deserialize;
use serde_json::Value;

const SERVICE: &str = "cryptopanic";

#[derive(Debug, Clone, Deserialize)]
pub struct NewsQuery {
    #[serde(default = "default_currencies")]
    pub currencies: String,
}

fn default_currencies() -> String {
    "BTC,ETH".to_string()
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            currencies: default_currencies(),
        }
    }
}

pub struct CryptoPanicClient {
    base_url: String,
    auth_token: String,
    http: reqwest::Client,
}

impl CryptoPanicClient {
    pub fn new(config: &MarketConfig) -> TradelogResult<Self> {
        Ok(Self {
            base_url: config.cryptopanic_url.trim_end_matches('/').to_string(),
            auth_token: config.cryptopanic_auth_token.clone(),
            http: http_client(config.request_timeout_secs)?,
        })
    }

    /// Hot posts for the given currencies, passed through untouched
    pub async fn posts(&self, query: &NewsQuery) -> TradelogResult<Value> {
        // auth_token goes in the query string; never log the built URL
        let request = self
            .http
            .get(format!("{}/posts/", self.base_url))
            .query(&[
                ("auth_token", self.auth_token.as_str()),
                ("filter", "hot"),
                ("currencies", query.currencies.as_str()),
            ]);
        fetch_json(SERVICE, request).await
    }
}
