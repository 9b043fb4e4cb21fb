//! Trade form handling: price lookup, suggestion, action string, submission

use super::suggestion::{Suggester, TradeSuggestion};
use crate::error::{TradelogError, TradelogResult};
use crate::market::PriceSource;
use crate::tx::SubmissionWorkflow;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Stop-loss default relative to the predicted price
const STOP_LOSS_FACTOR: Decimal = Decimal::from_parts(98, 0, 0, false, 2);
/// Take-profit default relative to the predicted price
const TAKE_PROFIT_FACTOR: Decimal = Decimal::from_parts(105, 0, 0, false, 2);

/// Submitted trade form; form fields may arrive as strings or numbers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub trading_pair: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub investment_amount: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub leverage: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub order_type: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub stop_loss_price: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub take_profit_price: Option<String>,
}

/// Strings and numbers become trimmed text; null and "" become `None`
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string or number, got {}",
                other
            )))
        }
    };
    Ok(text.filter(|s| !s.is_empty()))
}

impl TradeRequest {
    pub fn pair(&self) -> TradelogResult<&str> {
        self.trading_pair
            .as_deref()
            .ok_or_else(|| TradelogError::InvalidInput("tradingPair is required".into()))
    }

    /// Web form rule: pair and amount are both mandatory
    pub fn validate_form(&self) -> TradelogResult<()> {
        self.pair()?;
        let amount = self
            .investment_amount
            .as_deref()
            .ok_or_else(|| TradelogError::InvalidInput("investmentAmount is required".into()))?;
        match amount.parse::<Decimal>() {
            Ok(value) if value > Decimal::ZERO => Ok(()),
            _ => Err(TradelogError::InvalidInput(format!(
                "investmentAmount must be a positive number, got {:?}",
                amount
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDecision {
    Long,
    Short,
}

impl TradeDecision {
    pub fn from_prices(predicted: Decimal, real_time: Decimal) -> Self {
        if predicted > real_time {
            TradeDecision::Long
        } else {
            TradeDecision::Short
        }
    }
}

impl fmt::Display for TradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDecision::Long => f.write_str("LONG"),
            TradeDecision::Short => f.write_str("SHORT"),
        }
    }
}

/// Everything recorded for one trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlan {
    pub pair: String,
    pub trade_decision: TradeDecision,
    pub leverage: String,
    pub order_type: String,
    pub trade_size: String,
    pub stop_loss: String,
    pub take_profit: String,
    #[serde(serialize_with = "two_places")]
    pub real_time_price: Decimal,
    #[serde(serialize_with = "two_places")]
    pub predicted_price: Decimal,
}

fn two_places<S: serde::Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value.round_dp(2)))
}

impl TradePlan {
    /// The string written on chain
    pub fn action(&self) -> String {
        format!(
            "Trade: {}, Leverage: {}, Order: {}, Size: {}, SL: {}, TP: {}",
            self.trade_decision,
            self.leverage,
            self.order_type,
            self.trade_size,
            self.stop_loss,
            self.take_profit
        )
    }
}

/// Merge form values over the suggestion; the form wins where present
pub fn compose_plan(request: &TradeRequest, suggestion: &TradeSuggestion) -> TradelogResult<TradePlan> {
    let pair = request.pair()?.to_string();

    let leverage = request
        .leverage
        .as_deref()
        .map(|l| l.replace(['x', 'X'], "").trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| suggestion.suggested_leverage.to_string());

    let order_type = request
        .order_type
        .clone()
        .unwrap_or_else(|| suggestion.suggested_order_type.clone());

    let trade_size = request
        .investment_amount
        .clone()
        .unwrap_or_else(|| format!("{:.2}", suggestion.trade_size));

    let stop_loss = request.stop_loss_price.clone().unwrap_or_else(|| {
        format!("{:.2}", (suggestion.predicted_price * STOP_LOSS_FACTOR).round_dp(2))
    });
    let take_profit = request.take_profit_price.clone().unwrap_or_else(|| {
        format!("{:.2}", (suggestion.predicted_price * TAKE_PROFIT_FACTOR).round_dp(2))
    });

    Ok(TradePlan {
        pair,
        trade_decision: TradeDecision::from_prices(
            suggestion.predicted_price,
            suggestion.real_time_price,
        ),
        leverage,
        order_type,
        trade_size,
        stop_loss,
        take_profit,
        real_time_price: suggestion.real_time_price,
        predicted_price: suggestion.predicted_price,
    })
}

/// Success body shared by `POST /api/trade` and the CLI's `log-trade`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub status: &'static str,
    pub txn_hash: String,
    pub trade_details: TradePlan,
}

pub struct TradeDesk {
    prices: Arc<dyn PriceSource>,
    suggester: Arc<dyn Suggester>,
    workflow: Arc<SubmissionWorkflow>,
}

impl TradeDesk {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        suggester: Arc<dyn Suggester>,
        workflow: Arc<SubmissionWorkflow>,
    ) -> Self {
        Self {
            prices,
            suggester,
            workflow,
        }
    }

    /// Spot price of the pair's base asset; zero when it cannot be found
    pub async fn real_time_price(&self, pair: &str) -> Decimal {
        let symbol = pair.split('/').next().unwrap_or(pair).trim().to_lowercase();

        match self.prices.usd_price(&symbol).await {
            Ok(Some(price)) => price.round_dp(2),
            Ok(None) => {
                warn!("No price for {}, using zero", symbol);
                Decimal::ZERO
            }
            Err(e) => {
                warn!("Price lookup for {} failed, using zero: {}", symbol, e);
                Decimal::ZERO
            }
        }
    }

    pub async fn execute(&self, request: &TradeRequest) -> TradelogResult<TradeReceipt> {
        let pair = request.pair()?;
        let real_time_price = self.real_time_price(pair).await;
        let suggestion = self.suggester.suggest(real_time_price);
        let plan = compose_plan(request, &suggestion)?;

        let action = plan.action();
        info!("Logging trade for {}: {}", plan.pair, action);
        let hash = self.workflow.submit_action(&action).await?;

        Ok(TradeReceipt {
            status: "success",
            txn_hash: hash.to_string(),
            trade_details: plan,
        })
    }
}
