//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Chain node reachability
//! - Trade-log submissions and confirmation latency
//! - Upstream market-data calls
//! - Wallet balance lookups

use crate::error::{TradelogError, TradelogResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    // Chain metrics
    pub static ref CHAIN_CONNECTED: GaugeVec = register_gauge_vec!(
        "tradelog_chain_connected",
        "Chain node reachability (1=reachable, 0=unreachable)",
        &["chain_id"]
    ).unwrap();

    // Submission metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "tradelog_transactions_submitted_total",
        "Total trade-log transactions accepted by the node",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_CONFIRMED: CounterVec = register_counter_vec!(
        "tradelog_transactions_confirmed_total",
        "Total trade-log transactions committed successfully",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "tradelog_transactions_failed_total",
        "Total trade-log submissions that failed, by error kind",
        &["chain_id", "kind"]
    ).unwrap();

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "tradelog_transaction_latency_seconds",
        "Time from sequence fetch to confirmed commit",
        &["chain_id"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // Upstream metrics
    pub static ref UPSTREAM_REQUESTS: CounterVec = register_counter_vec!(
        "tradelog_upstream_requests_total",
        "Upstream API calls by service and outcome",
        &["service", "outcome"]
    ).unwrap();

    // Wallet metrics
    pub static ref WALLET_BALANCE: GaugeVec = register_gauge_vec!(
        "tradelog_wallet_balance_apt",
        "Last observed coin balance of the relayer wallet",
        &["address"]
    ).unwrap();

    // Health metrics
    pub static ref HEALTH_CHECK_SUCCESS: CounterVec = register_counter_vec!(
        "tradelog_health_check_success_total",
        "Total successful health checks",
        &[]
    ).unwrap();

    pub static ref HEALTH_CHECK_FAILURE: CounterVec = register_counter_vec!(
        "tradelog_health_check_failure_total",
        "Total failed health checks",
        &[]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> TradelogResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TradelogError::Config(format!("Cannot bind metrics {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| TradelogError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Text exposition of every registered metric
pub fn render() -> TradelogResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TradelogError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TradelogError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_chain_health(chain_id: u8, healthy: bool) {
    CHAIN_CONNECTED
        .with_label_values(&[&chain_id.to_string()])
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_tx_submitted(chain_id: u8) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_confirmed(chain_id: u8) {
    TX_CONFIRMED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_failed(chain_id: u8, err: &TradelogError) {
    TX_FAILED
        .with_label_values(&[&chain_id.to_string(), err.kind()])
        .inc();
}

pub fn record_tx_latency(chain_id: u8, latency_secs: f64) {
    TX_LATENCY
        .with_label_values(&[&chain_id.to_string()])
        .observe(latency_secs);
}

pub fn record_upstream(service: &str, ok: bool) {
    UPSTREAM_REQUESTS
        .with_label_values(&[service, if ok { "ok" } else { "error" }])
        .inc();
}

pub fn record_wallet_balance(address: &str, balance: f64) {
    WALLET_BALANCE.with_label_values(&[address]).set(balance);
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.with_label_values(&[]).inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.with_label_values(&[]).inc();
}
