//! Configuration management for the trade-log relayer
//!
//! Loads configuration from TOML files with environment variable substitution,
//! then applies process-environment overrides (`PORT`).

use crate::chain::AccountAddress;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub chain: ChainConfig,
    pub submission: SubmissionConfig,
    pub wallet: WalletConfig,
    pub market: MarketConfig,
    pub predict: PredictConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u8,
    pub node_urls: Vec<String>,
    pub module_address: String,
    pub module_name: String,
    pub function_name: String,
    #[serde(default = "default_coin_type")]
    pub coin_type: String,
    #[serde(default = "default_page_size")]
    pub history_page_size: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    #[serde(default)]
    pub gas_price_strategy: GasPriceStrategy,
    #[serde(default)]
    pub gas_price_buffer_percent: u64,
    pub expiration_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    #[default]
    Fixed,
    Estimate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub coingecko_url: String,
    #[serde(default)]
    pub coingecko_api_key: Option<String>,
    pub cryptopanic_url: String,
    pub cryptopanic_auth_token: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

fn default_coin_type() -> String {
    "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>".to_string()
}

fn default_page_size() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    15
}

/// Accepted transaction expiration window, in seconds
const EXPIRATION_RANGE_SECS: std::ops::RangeInclusive<u64> = 30..=3600;

impl Settings {
    /// Load settings from the configuration file named by `TRADELOG_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TRADELOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut settings = Self::from_toml_str(&config_str)?;
        settings.apply_env_overrides()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        toml::from_str(&config_str).with_context(|| "Failed to parse configuration")
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_port_override(env::var("PORT").ok().as_deref())
    }

    fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(port) = port {
            self.api.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chain.node_urls.is_empty() {
            anyhow::bail!("At least one chain node URL must be configured");
        }
        if self.chain.module_address.trim().is_empty() {
            anyhow::bail!("chain.module_address must be set; set TRADELOG_MODULE_ADDRESS");
        }
        AccountAddress::from_hex(&self.chain.module_address)
            .with_context(|| "chain.module_address is not a valid account address")?;
        if self.chain.history_page_size == 0 {
            anyhow::bail!("chain.history_page_size must be positive");
        }
        if !EXPIRATION_RANGE_SECS.contains(&self.submission.expiration_secs) {
            anyhow::bail!(
                "submission.expiration_secs must be within {}..={}, got {}",
                EXPIRATION_RANGE_SECS.start(),
                EXPIRATION_RANGE_SECS.end(),
                self.submission.expiration_secs
            );
        }
        if self.submission.max_gas_amount == 0 || self.submission.gas_unit_price == 0 {
            anyhow::bail!("submission gas budget must be positive");
        }
        if self.submission.poll_interval_ms == 0 {
            anyhow::bail!("submission.poll_interval_ms must be positive");
        }
        if self.market.cryptopanic_auth_token.trim().is_empty() {
            anyhow::bail!(
                "market.cryptopanic_auth_token is empty; set CRYPTOPANIC_AUTH_TOKEN"
            );
        }
        if self.predict.command.trim().is_empty() {
            anyhow::bail!("predict.command must be set");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

/// Settings used by unit tests across the crate
#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings::from_toml_str(TEST_CONFIG).expect("test config parses")
}

#[cfg(test)]
pub(crate) const TEST_CONFIG: &str = r#"
[api]
host = "127.0.0.1"
port = 8080

[metrics]
enabled = false
port = 9090

[chain]
chain_id = 2
node_urls = ["http://127.0.0.1:1/v1"]
module_address = "0xe0f5d08c01462815ff2ae4816eaa6678f77fa26722d4e9ee456acfe966414b45"
module_name = "ai_trading_log"
function_name = "log_trade"

[submission]
max_gas_amount = 50000
gas_unit_price = 100
expiration_secs = 600
confirmation_timeout_secs = 30
poll_interval_ms = 5

[wallet]
private_key_env = "TRADELOG_PRIVATE_KEY"

[market]
coingecko_url = "http://127.0.0.1:1/api/v3"
cryptopanic_url = "http://127.0.0.1:1/api/free/v1"
cryptopanic_auth_token = "test-token"

[predict]
command = "python3"
args = ["predict.py"]
timeout_secs = 10
"#;
