//! Gas budget selection for trade-log transactions

use crate::chain::ChainClient;
use crate::config::{GasPriceStrategy, SubmissionConfig};

use tracing::{debug, warn};

/// Gas fields copied into an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBudget {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
}

impl GasBudget {
    /// Upper bound on the fee in octas
    pub fn max_cost(&self) -> u64 {
        calculate_cost(self.max_gas_amount, self.gas_unit_price)
    }
}

/// Gas estimator for transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    strategy: GasPriceStrategy,
    /// Configured budget, also the fallback for `Estimate`
    fixed: GasBudget,
    /// Buffer percentage added to the node's estimate (e.g. 10 = 10%)
    gas_price_buffer_percent: u64,
}

impl GasEstimator {
    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self {
            strategy: config.gas_price_strategy,
            fixed: GasBudget {
                max_gas_amount: config.max_gas_amount,
                gas_unit_price: config.gas_unit_price,
            },
            gas_price_buffer_percent: config.gas_price_buffer_percent,
        }
    }

    /// Budget for the next submission
    pub async fn budget(&self, client: &dyn ChainClient) -> GasBudget {
        match self.strategy {
            GasPriceStrategy::Fixed => self.fixed,
            GasPriceStrategy::Estimate => match client.estimate_gas_price().await {
                Ok(estimate) if estimate > 0 => {
                    let buffer = estimate.saturating_mul(self.gas_price_buffer_percent) / 100;
                    let gas_unit_price = estimate.saturating_add(buffer);
                    debug!(
                        "Gas unit price {} (estimate {} + {}%)",
                        gas_unit_price, estimate, self.gas_price_buffer_percent
                    );
                    GasBudget {
                        gas_unit_price,
                        ..self.fixed
                    }
                }
                Ok(_) => {
                    warn!("Node returned a zero gas estimate, using configured price");
                    self.fixed
                }
                Err(e) => {
                    warn!("Gas estimation failed, using configured price: {}", e);
                    self.fixed
                }
            },
        }
    }
}

/// Total cost in octas
fn calculate_cost(gas_amount: u64, gas_unit_price: u64) -> u64 {
    gas_amount.saturating_mul(gas_unit_price)
}
