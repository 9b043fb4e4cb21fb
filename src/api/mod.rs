//! HTTP API: health, market-data passthrough, conversion, prediction,
//! trade logging and account reporting

use crate::chain::{AccountAddress, ChainClient, RestChainClient};
use crate::config::{ApiConfig, Settings};
use crate::error::{TradelogError, TradelogResult};
use crate::market::{
    convert, CoinGeckoClient, ConversionQuote, ConvertParams, CryptoPanicClient, MarketsQuery,
    NewsQuery,
};
use crate::metrics;
use crate::predict::PredictionRunner;
use crate::query::{BalanceQuery, HistoryPage, HistoryQuery};
use crate::trading::{RandomSuggester, TradeDesk, TradeReceipt, TradeRequest};
use crate::tx::SubmissionWorkflow;
use crate::wallet::LocalAccount;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<dyn ChainClient>,
    pub chain_id: u8,
    pub wallet_address: AccountAddress,
    pub balances: Arc<BalanceQuery>,
    pub history: Arc<HistoryQuery>,
    pub coingecko: Arc<CoinGeckoClient>,
    pub news: Arc<CryptoPanicClient>,
    pub predictor: Arc<PredictionRunner>,
    pub trades: Arc<TradeDesk>,
}

impl AppState {
    /// Wire every component around an existing chain client
    pub fn new(
        settings: &Settings,
        chain: Arc<dyn ChainClient>,
        account: Arc<LocalAccount>,
    ) -> TradelogResult<Self> {
        let coingecko = Arc::new(CoinGeckoClient::new(&settings.market)?);
        let workflow = Arc::new(SubmissionWorkflow::new(
            chain.clone(),
            account.clone(),
            &settings.chain,
            &settings.submission,
        )?);
        let trades = Arc::new(TradeDesk::new(
            coingecko.clone(),
            Arc::new(RandomSuggester),
            workflow,
        ));

        Ok(Self {
            chain_id: settings.chain.chain_id,
            wallet_address: account.address(),
            balances: Arc::new(
                BalanceQuery::new(chain.clone(), settings.chain.coin_type.clone())
                    .with_wallet_gauge(account.address()),
            ),
            history: Arc::new(HistoryQuery::new(
                chain.clone(),
                settings.chain.history_page_size,
            )),
            coingecko,
            news: Arc::new(CryptoPanicClient::new(&settings.market)?),
            predictor: Arc::new(PredictionRunner::from_config(&settings.predict)),
            trades,
            chain,
        })
    }

    /// Build with the REST chain client described by the settings
    pub fn from_settings(settings: &Settings, account: LocalAccount) -> TradelogResult<Self> {
        let chain: Arc<dyn ChainClient> = Arc::new(RestChainClient::new(settings.chain.clone())?);
        Self::new(settings, chain, Arc::new(account))
    }
}

/// All routes with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/crypto", get(crypto_markets))
        .route("/api/news", get(crypto_news))
        .route("/convert", get(convert_coins))
        .route("/predict", post(predict))
        .route("/api/trade", post(log_trade))
        .route("/api/balance/:address", get(account_balance))
        .route("/api/transactions", get(account_transactions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: &ApiConfig, state: AppState) -> TradelogResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TradelogError::Config(format!("Cannot bind API {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| TradelogError::Internal(format!("API server failed: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - chain node reachability
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let chain_ok = state.chain.health_check().await;
    metrics::record_chain_health(state.chain_id, chain_ok);

    let status = if chain_ok {
        metrics::record_health_check();
        StatusCode::OK
    } else {
        metrics::record_health_check_failure();
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: chain_ok,
            chain_id: state.chain_id,
            chain: chain_ok,
        }),
    )
}

async fn crypto_markets(
    State(state): State<AppState>,
    query: Result<Query<MarketsQuery>, QueryRejection>,
) -> TradelogResult<Json<Value>> {
    let Query(query) = query.map_err(invalid_query)?;
    Ok(Json(state.coingecko.markets(query).await?))
}

async fn crypto_news(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> TradelogResult<Json<Value>> {
    let Query(query) = query.map_err(invalid_query)?;
    Ok(Json(state.news.posts(&query).await?))
}

async fn convert_coins(
    State(state): State<AppState>,
    query: Result<Query<ConvertParams>, QueryRejection>,
) -> TradelogResult<Json<ConversionQuote>> {
    let Query(params) = query.map_err(invalid_query)?;
    let request = params.validate()?;

    let prices = state
        .coingecko
        .simple_prices(&[request.from_coin.as_str(), request.to_coin.as_str()])
        .await?;

    let price_of = |coin: &str| {
        prices
            .get(coin)
            .copied()
            .ok_or_else(|| TradelogError::InvalidInput(format!("Unknown coin: {}", coin)))
    };
    let from_price = price_of(&request.from_coin)?;
    let to_price = price_of(&request.to_coin)?;

    Ok(Json(convert(&request, from_price, to_price)?))
}

async fn predict(State(state): State<AppState>, body: Bytes) -> TradelogResult<Json<Value>> {
    let input: Value = serde_json::from_slice(&body)
        .map_err(|e| TradelogError::InvalidInput(format!("Body is not JSON: {}", e)))?;
    Ok(Json(state.predictor.run(&input).await?))
}

async fn log_trade(State(state): State<AppState>, body: Bytes) -> TradelogResult<Json<TradeReceipt>> {
    let request: TradeRequest = serde_json::from_slice(&body)
        .map_err(|e| TradelogError::InvalidInput(format!("Invalid trade form: {}", e)))?;
    request.validate_form()?;

    Ok(Json(state.trades.execute(&request).await?))
}

async fn account_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> TradelogResult<Json<BalanceResponse>> {
    let address = AccountAddress::from_hex(&address)?;
    let balance = state.balances.balance_or_zero(address).await?;

    Ok(Json(BalanceResponse {
        address: address.to_hex(),
        octas: balance.octas,
        balance: balance.to_decimal().to_string(),
        resource_present: balance.resource_present,
    }))
}

async fn account_transactions(
    State(state): State<AppState>,
    query: Result<Query<HistoryParams>, QueryRejection>,
) -> TradelogResult<Json<HistoryPage>> {
    let Query(params) = query.map_err(invalid_query)?;

    let address = match params.address.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => AccountAddress::from_hex(a)?,
        _ => state.wallet_address,
    };
    let page = match params.page.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p
            .parse::<usize>()
            .map_err(|_| TradelogError::InvalidInput(format!("page must be a number: {:?}", p)))?,
        _ => 1,
    };

    Ok(Json(state.history.page(address, page).await?))
}

fn invalid_query(rejection: QueryRejection) -> TradelogError {
    warn!("Rejected query string: {}", rejection);
    TradelogError::InvalidInput(rejection.body_text())
}

// Request/response types

#[derive(Debug, Deserialize)]
struct HistoryParams {
    address: Option<String>,
    page: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    chain_id: u8,
    chain: bool,
}

#[derive(Serialize)]
struct BalanceResponse {
    address: String,
    octas: u64,
    balance: String,
    resource_present: bool,
}
