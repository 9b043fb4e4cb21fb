//! Trade suggestion and trade-log composition

mod desk;
mod suggestion;

pub use desk::{compose_plan, TradeDecision, TradeDesk, TradePlan, TradeReceipt, TradeRequest};
pub use suggestion::{RandomSuggester, RiskLevel, Suggester, TradeSuggestion};
