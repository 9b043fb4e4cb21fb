//! Cross-rate conversion between two coins priced in USD

use crate::error::{TradelogError, TradelogResult};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decimal places in `estimated_receive`
const RECEIVE_SCALE: u32 = 6;

/// Raw `/convert` query string; every field is optional until validated
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertParams {
    pub from_coin: Option<String>,
    pub to_coin: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub from_coin: String,
    pub to_coin: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionQuote {
    pub from_coin: String,
    pub to_coin: String,
    pub amount: String,
    pub rate: String,
    pub estimated_receive: String,
}

impl ConvertParams {
    pub fn validate(&self) -> TradelogResult<ConvertRequest> {
        let from_coin = coin_id(self.from_coin.as_deref(), "from_coin")?;
        let to_coin = coin_id(self.to_coin.as_deref(), "to_coin")?;

        let raw_amount = self
            .amount
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TradelogError::InvalidInput("Missing parameter: amount".into()))?;
        let amount = Decimal::from_str(raw_amount)
            .or_else(|_| Decimal::from_scientific(raw_amount))
            .map_err(|_| {
                TradelogError::InvalidInput(format!("amount is not a number: {:?}", raw_amount))
            })?;
        if amount <= Decimal::ZERO {
            return Err(TradelogError::InvalidInput(
                "amount must be greater than zero".into(),
            ));
        }

        Ok(ConvertRequest {
            from_coin,
            to_coin,
            amount,
        })
    }
}

fn coin_id(value: Option<&str>, name: &str) -> TradelogResult<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TradelogError::InvalidInput(format!("Missing parameter: {}", name)))
}

/// `amount * from_price / to_price`, rounded half-up to six places
pub fn convert(
    request: &ConvertRequest,
    from_price: Decimal,
    to_price: Decimal,
) -> TradelogResult<ConversionQuote> {
    if from_price <= Decimal::ZERO || to_price <= Decimal::ZERO {
        return Err(TradelogError::upstream(
            "coingecko",
            format!(
                "Non-positive price for {} or {}",
                request.from_coin, request.to_coin
            ),
        ));
    }

    let rate = from_price
        .checked_div(to_price)
        .ok_or_else(|| TradelogError::Internal("conversion rate overflow".into()))?;
    let receive = request
        .amount
        .checked_mul(rate)
        .ok_or_else(|| TradelogError::InvalidInput("amount too large".into()))?
        .round_dp_with_strategy(RECEIVE_SCALE, RoundingStrategy::MidpointAwayFromZero);

    Ok(ConversionQuote {
        from_coin: request.from_coin.clone(),
        to_coin: request.to_coin.clone(),
        amount: request.amount.normalize().to_string(),
        rate: rate.normalize().to_string(),
        estimated_receive: format!("{:.6}", receive),
    })
}
