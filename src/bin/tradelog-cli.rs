//! Command-line access to the trade log
//!
//! Prints exactly one JSON object on stdout. Failures print
//! `{"status":"error","message":...}` and exit 1. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

use aptos_tradelog::chain::{AccountAddress, ChainClient, RestChainClient};
use aptos_tradelog::logging::{init_logging, LogTarget};
use aptos_tradelog::market::CoinGeckoClient;
use aptos_tradelog::query::{BalanceQuery, HistoryQuery};
use aptos_tradelog::trading::{RandomSuggester, TradeDesk, TradeRequest};
use aptos_tradelog::tx::SubmissionWorkflow;
use aptos_tradelog::wallet::LocalAccount;
use aptos_tradelog::Settings;

#[derive(Parser)]
#[command(name = "tradelog-cli", version, about = "Log trade actions on chain and inspect accounts")]
struct Cli {
    /// Configuration file (defaults to $TRADELOG_CONFIG or config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a free-text action
    LogAction {
        text: String,
    },
    /// Compose a trade from a JSON form and record it
    LogTrade {
        /// e.g. '{"tradingPair":"BTC/USDT","leverage":"5x"}'
        json: String,
    },
    /// Coin balance and account details
    Balance {
        #[arg(long)]
        address: Option<String>,
    },
    /// One page of transaction history, newest first
    History {
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Address derived from the configured private key
    Address,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(LogTarget::Stderr);
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            println!("{}", json!({"status": "error", "message": format!("{:#}", e)}));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let chain: Arc<dyn ChainClient> = Arc::new(RestChainClient::new(settings.chain.clone())?);

    match cli.command {
        Command::Address => {
            let account = LocalAccount::load(&settings.wallet)?;
            Ok(json!({"status": "success", "address": account.address()}))
        }

        Command::LogAction { text } => {
            let workflow = workflow(&settings, chain)?;
            let hash = workflow.submit_action(&text).await?;
            Ok(json!({"status": "success", "txnHash": hash, "action": text}))
        }

        Command::LogTrade { json } => {
            let request: TradeRequest =
                serde_json::from_str(&json).context("Trade data is not valid JSON")?;
            request.pair()?;

            let desk = TradeDesk::new(
                Arc::new(CoinGeckoClient::new(&settings.market)?),
                Arc::new(RandomSuggester),
                Arc::new(workflow(&settings, chain)?),
            );
            let receipt = desk.execute(&request).await?;
            Ok(serde_json::to_value(receipt)?)
        }

        Command::Balance { address } => {
            let address = resolve_address(&settings, address.as_deref())?;
            let balance = BalanceQuery::new(chain.clone(), settings.chain.coin_type.clone())
                .balance_or_zero(address)
                .await?;

            let mut output = json!({
                "status": "success",
                "address": address,
                "octas": balance.octas.to_string(),
                "balance": balance.to_decimal().to_string(),
                "resourcePresent": balance.resource_present,
            });

            // Account details are extra; the balance stands without them
            match chain.get_account(address).await {
                Ok(account) => {
                    output["sequenceNumber"] = json!(account.sequence_number.to_string());
                    output["authenticationKey"] = json!(account.authentication_key);
                }
                Err(e) => warn!("Could not fetch account details for {}: {}", address, e),
            }
            Ok(output)
        }

        Command::History { address, page } => {
            let address = resolve_address(&settings, address.as_deref())?;
            let page = HistoryQuery::new(chain, settings.chain.history_page_size)
                .page(address, page)
                .await?;

            let mut output = serde_json::to_value(page)?;
            output["status"] = json!("success");
            output["address"] = json!(address);
            Ok(output)
        }
    }
}

fn workflow(settings: &Settings, chain: Arc<dyn ChainClient>) -> Result<SubmissionWorkflow> {
    let account = Arc::new(LocalAccount::load(&settings.wallet)?);
    Ok(SubmissionWorkflow::new(
        chain,
        account,
        &settings.chain,
        &settings.submission,
    )?)
}

/// Explicit address, else the configured wallet's
fn resolve_address(settings: &Settings, address: Option<&str>) -> Result<AccountAddress> {
    match address {
        Some(a) => Ok(AccountAddress::from_hex(a)?),
        None => Ok(LocalAccount::load(&settings.wallet)?.address()),
    }
}
