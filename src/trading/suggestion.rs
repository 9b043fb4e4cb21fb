//! Trade suggestions
//!
//! The bundled suggester is a random stub; only the shape of a suggestion is
//! meaningful.

use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSuggestion {
    pub real_time_price: Decimal,
    pub predicted_price: Decimal,
    /// 1..=10
    pub suggested_leverage: u8,
    pub suggested_order_type: String,
    pub trade_size: Decimal,
    pub risk_level: RiskLevel,
}

/// Produces a suggestion from the current market price
pub trait Suggester: Send + Sync {
    fn suggest(&self, real_time_price: Decimal) -> TradeSuggestion;
}

/// Uniformly random prediction in a fixed band
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuggester;

impl Suggester for RandomSuggester {
    fn suggest(&self, real_time_price: Decimal) -> TradeSuggestion {
        let mut rng = rand::thread_rng();

        let predicted_cents: i64 = rng.gen_range(3_000_000..6_000_000);
        let size_cents: i64 = rng.gen_range(0..50_000);

        TradeSuggestion {
            real_time_price,
            predicted_price: Decimal::new(predicted_cents, 2),
            suggested_leverage: rng.gen_range(1..=10),
            suggested_order_type: "market".to_string(),
            trade_size: Decimal::new(size_cents, 2),
            risk_level: if rng.gen_bool(0.5) {
                RiskLevel::High
            } else {
                RiskLevel::Low
            },
        }
    }
}
