//! Coin balance lookup

use crate::chain::{AccountAddress, AccountResource, ChainClient};
use crate::error::{TradelogError, TradelogResult};
use crate::metrics;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Fixed-point scale of the native coin (1 APT = 10^8 octas)
pub const COIN_DECIMALS: u32 = 8;

/// Balance in octas plus whether the coin store exists at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoinBalance {
    pub octas: u64,
    pub resource_present: bool,
}

impl CoinBalance {
    /// Exact decimal value, `octas / 10^8`
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.octas), COIN_DECIMALS).normalize()
    }
}

pub struct BalanceQuery {
    client: Arc<dyn ChainClient>,
    coin_type: String,
    /// Only this account's balance is exported as a gauge
    wallet: Option<AccountAddress>,
}

impl BalanceQuery {
    pub fn new(client: Arc<dyn ChainClient>, coin_type: impl Into<String>) -> Self {
        Self {
            client,
            coin_type: coin_type.into(),
            wallet: None,
        }
    }

    pub fn with_wallet_gauge(mut self, wallet: AccountAddress) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Balance of the configured coin store; `ResourceNotFound` if absent
    pub async fn balance(&self, address: AccountAddress) -> TradelogResult<CoinBalance> {
        let resources = self.client.get_account_resources(address).await?;

        let resource = resources
            .iter()
            .find(|r| r.resource_type == self.coin_type)
            .ok_or_else(|| TradelogError::ResourceNotFound {
                address: address.to_hex(),
                resource_type: self.coin_type.clone(),
            })?;

        let octas = coin_value(resource)?;
        let balance = CoinBalance {
            octas,
            resource_present: true,
        };

        debug!("Balance of {}: {} octas", address, octas);
        if self.wallet == Some(address) {
            metrics::record_wallet_balance(
                &address.to_hex(),
                balance.to_decimal().to_f64().unwrap_or_default(),
            );
        }
        Ok(balance)
    }

    /// Like `balance`, but an absent coin store reads as zero
    pub async fn balance_or_zero(&self, address: AccountAddress) -> TradelogResult<CoinBalance> {
        match self.balance(address).await {
            Err(TradelogError::ResourceNotFound { .. }) => Ok(CoinBalance {
                octas: 0,
                resource_present: false,
            }),
            other => other,
        }
    }
}

/// `data.coin.value`, a u64 the node encodes as a string
fn coin_value(resource: &AccountResource) -> TradelogResult<u64> {
    let value = resource
        .data
        .get("coin")
        .and_then(|coin| coin.get("value"))
        .ok_or_else(|| {
            TradelogError::upstream(
                "chain",
                format!("{} has no coin.value field", resource.resource_type),
            )
        })?;

    let parsed = match value {
        Value::String(s) => s.parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        TradelogError::upstream("chain", format!("Malformed coin value: {}", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use rstest::rstest;
    use serde_json::json;
    use std::str::FromStr;

    const COIN: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

    fn resources(value: Value) -> Vec<AccountResource> {
        vec![
            AccountResource {
                resource_type: "0x1::account::Account".into(),
                data: json!({"sequence_number": "3"}),
            },
            AccountResource {
                resource_type: COIN.into(),
                data: json!({"coin": {"value": value}}),
            },
        ]
    }

    fn query(resources: Vec<AccountResource>) -> BalanceQuery {
        let mut client = MockChainClient::new();
        client
            .expect_get_account_resources()
            .returning(move |_| Ok(resources.clone()));
        BalanceQuery::new(Arc::new(client), COIN)
    }

    fn addr() -> AccountAddress {
        AccountAddress::from_hex("0xa11ce").unwrap()
    }

    #[rstest]
    #[case(0, "0")]
    #[case(100_000_000, "1")]
    #[case(123_456_789, "1.23456789")]
    #[case(1, "0.00000001")]
    fn test_decimal_conversion_is_exact(#[case] octas: u64, #[case] expected: &str) {
        let balance = CoinBalance {
            octas,
            resource_present: true,
        };
        assert_eq!(balance.to_decimal(), Decimal::from_str(expected).unwrap());
        assert_eq!(balance.to_decimal().to_string(), expected);
    }

    #[tokio::test]
    async fn test_reads_string_and_number_values() {
        let from_string = query(resources(json!("123456789")))
            .balance(addr())
            .await
            .unwrap();
        let from_number = query(resources(json!(123456789u64)))
            .balance(addr())
            .await
            .unwrap();
        assert_eq!(from_string.octas, 123_456_789);
        assert_eq!(from_string, from_number);
    }

    #[tokio::test]
    async fn test_missing_store_versus_zero_balance() {
        let absent = query(vec![]);
        assert!(matches!(
            absent.balance(addr()).await,
            Err(TradelogError::ResourceNotFound { .. })
        ));
        let zero = absent.balance_or_zero(addr()).await.unwrap();
        assert!(!zero.resource_present);
        assert_eq!(zero.octas, 0);

        let present = query(resources(json!("0")))
            .balance_or_zero(addr())
            .await
            .unwrap();
        assert!(present.resource_present);
        assert_eq!(present.octas, 0);
    }

    #[tokio::test]
    async fn test_gauge_only_tracks_wallet() {
        let wallet = AccountAddress::from_hex("0x3a11e7").unwrap();
        let strangers: Vec<AccountAddress> = (0..50u64)
            .map(|i| AccountAddress::from_hex(&format!("0x5e7{:04x}", i)).unwrap())
            .collect();
        let tracked = query(resources(json!("250000000"))).with_wallet_gauge(wallet);

        for stranger in &strangers {
            tracked.balance(*stranger).await.unwrap();
        }
        tracked.balance(wallet).await.unwrap();

        let rendered = metrics::render().unwrap();
        assert!(rendered.contains(&wallet.to_hex()));
        for stranger in &strangers {
            assert!(!rendered.contains(&stranger.to_hex()));
        }
    }

    #[tokio::test]
    async fn test_malformed_value_is_upstream_error() {
        let err = query(resources(json!("lots")))
            .balance(addr())
            .await
            .unwrap_err();
        assert!(matches!(err, TradelogError::UpstreamApi { .. }));
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_zeroed() {
        let mut client = MockChainClient::new();
        client.expect_get_account_resources().returning(|address| {
            Err(TradelogError::AccountLookup {
                address: address.to_hex(),
                message: "404".into(),
            })
        });
        let query = BalanceQuery::new(Arc::new(client), COIN);
        assert!(matches!(
            query.balance_or_zero(addr()).await,
            Err(TradelogError::AccountLookup { .. })
        ));
    }
}
