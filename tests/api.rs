//! Integration tests for the HTTP API against a mock upstream Axum server
//! standing in for the fullnode, CoinGecko and CryptoPanic.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use aptos_tradelog::{
    api::{router, AppState},
    chain::AccountAddress,
    wallet::LocalAccount,
    Settings,
};
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_test::assert_ok;
use tower::ServiceExt;

const CONFIG_TEMPLATE: &str = r#"
[api]
host = "127.0.0.1"
port = 0

[metrics]
enabled = false
port = 0

[chain]
chain_id = 2
node_urls = ["{UPSTREAM}/v1"]
module_address = "0xe0f5d08c01462815ff2ae4816eaa6678f77fa26722d4e9ee456acfe966414b45"
module_name = "ai_trading_log"
function_name = "log_trade"
request_timeout_secs = 5

[submission]
max_gas_amount = 50000
gas_unit_price = 100
expiration_secs = 600
confirmation_timeout_secs = 5
poll_interval_ms = 10

[wallet]
private_key_env = "TRADELOG_TEST_UNUSED_KEY"

[market]
coingecko_url = "{COINGECKO}"
cryptopanic_url = "{UPSTREAM}/api/free/v1"
cryptopanic_auth_token = "panic-token"
request_timeout_secs = 5

[predict]
command = "sh"
args = ["-c", "printf '{\"echo\":%s}' \"$1\"", "predict"]
timeout_secs = 5
"#;

const BCS_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";

#[derive(Clone, Default)]
struct TestServerState {
    last_news_query: Arc<Mutex<Option<HashMap<String, String>>>>,
    submissions: Arc<Mutex<Vec<usize>>>,
}

fn addr(hex: &str) -> AccountAddress {
    AccountAddress::from_hex(hex).unwrap()
}

async fn simple_price(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let known = HashMap::from([("bitcoin", 50000), ("ethereum", 2500)]);
    let mut body = serde_json::Map::new();
    for id in params.get("ids").map(String::as_str).unwrap_or("").split(',') {
        if let Some(price) = known.get(id) {
            body.insert(id.to_string(), json!({"usd": price}));
        }
    }
    Json(Value::Object(body))
}

async fn coins_list() -> Json<Value> {
    Json(json!([
        {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"},
        {"id": "ethereum", "symbol": "eth", "name": "Ethereum"}
    ]))
}

async fn markets(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!([{ "id": "bitcoin", "query": params }]))
}

async fn news(
    State(state): State<TestServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorized = params.get("auth_token").map(String::as_str) == Some("panic-token");
    *state.last_news_query.lock().await = Some(params);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad token"}))).into_response();
    }
    Json(json!({"results": [{"title": "BTC up"}]})).into_response()
}

async fn ledger_info() -> Json<Value> {
    Json(json!({"chain_id": 2, "ledger_version": "1000"}))
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": message, "error_code": "account_not_found"})),
    )
        .into_response()
}

async fn account(Path(address): Path<String>) -> axum::response::Response {
    if addr(&address) == addr("0x404") {
        return not_found("Account not found");
    }
    Json(json!({"sequence_number": "4", "authentication_key": "0x00"})).into_response()
}

async fn resources(Path(address): Path<String>) -> axum::response::Response {
    let address = addr(&address);
    if address == addr("0x404") {
        return not_found("Account not found");
    }
    let mut list = vec![json!({
        "type": "0x1::account::Account",
        "data": {"sequence_number": "4"}
    })];
    if address != addr("0x2") {
        list.push(json!({
            "type": "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>",
            "data": {"coin": {"value": "123456789"}}
        }));
    }
    Json(Value::Array(list)).into_response()
}

async fn transactions(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    if params.get("start").map(String::as_str) != Some("0") {
        return Json(json!([]));
    }
    let txns: Vec<Value> = (0..7u64)
        .map(|i| {
            json!({
                "hash": format!("0x{:02x}", i),
                "success": true,
                "timestamp": (1_700_000_000_000_000u64 + i * 1_000_000).to_string(),
                "type": "user_transaction"
            })
        })
        .collect();
    Json(Value::Array(txns))
}

async fn submit(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != BCS_CONTENT_TYPE {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({"message": "wrong content type"})),
        )
            .into_response();
    }
    state.submissions.lock().await.push(body.len());
    (StatusCode::ACCEPTED, Json(json!({"hash": "0xBEEF"}))).into_response()
}

async fn by_hash(Path(hash): Path<String>) -> axum::response::Response {
    if hash != "0xbeef" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "not found"}))).into_response();
    }
    Json(json!({
        "type": "user_transaction",
        "success": true,
        "vm_status": "Executed successfully"
    }))
    .into_response()
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

fn create_upstream(state: TestServerState) -> Router {
    Router::new()
        .route("/api/v3/simple/price", get(simple_price))
        .route("/api/v3/coins/list", get(coins_list))
        .route("/api/v3/coins/markets", get(markets))
        .route("/broken/api/v3/simple/price", get(broken))
        .route("/api/free/v1/posts/", get(news))
        .route("/v1/", get(ledger_info))
        .route("/v1/accounts/:address", get(account))
        .route("/v1/accounts/:address/resources", get(resources))
        .route("/v1/accounts/:address/transactions", get(transactions))
        .route("/v1/transactions", post(submit))
        .route("/v1/transactions/by_hash/:hash", get(by_hash))
        .with_state(state)
}

async fn start_upstream(state: TestServerState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_upstream(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct TestApp {
    router: Router,
    upstream: TestServerState,
}

async fn test_app_with(coingecko_path: &str) -> TestApp {
    let upstream = TestServerState::default();
    let addr = start_upstream(upstream.clone()).await;
    let base = format!("http://{}", addr);

    let config = CONFIG_TEMPLATE
        .replace("{COINGECKO}", &format!("{}{}", base, coingecko_path))
        .replace("{UPSTREAM}", &base);
    let settings = Settings::from_toml_str(&config).unwrap();
    settings.validate().unwrap();

    let state = assert_ok!(AppState::from_settings(
        &settings,
        LocalAccount::from_seed([1u8; 32])
    ));

    TestApp {
        router: router(state),
        upstream,
    }
}

async fn test_app() -> TestApp {
    test_app_with("/api/v3").await
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &TestApp, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get_json(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_convert_bitcoin_to_ethereum() {
    let app = test_app().await;

    let (status, body) =
        get_json(&app, "/convert?from_coin=bitcoin&to_coin=ethereum&amount=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estimated_receive"], "40.000000");
    assert_eq!(body["rate"], "20");
    assert_eq!(body["from_coin"], "bitcoin");
    assert_eq!(body["to_coin"], "ethereum");
}

#[tokio::test]
async fn test_convert_rejects_bad_input() {
    let app = test_app().await;

    for uri in [
        "/convert?from_coin=bitcoin&to_coin=ethereum&amount=0",
        "/convert?from_coin=bitcoin&amount=2",
        "/convert?to_coin=ethereum&amount=2",
        "/convert?from_coin=bitcoin&to_coin=ethereum",
        "/convert?from_coin=bitcoin&to_coin=dogecoin&amount=2",
    ] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "invalid_input");
    }
}

#[tokio::test]
async fn test_convert_upstream_failure_is_500() {
    let app = test_app_with("/broken/api/v3").await;

    let (status, body) =
        get_json(&app, "/convert?from_coin=bitcoin&to_coin=ethereum&amount=2").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upstream_api");
}

#[tokio::test]
async fn test_markets_passthrough_with_paging() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/crypto?per_page=10&page=2").await;
    assert_eq!(status, StatusCode::OK);
    let query = &body[0]["query"];
    assert_eq!(query["vs_currency"], "usd");
    assert_eq!(query["order"], "market_cap_desc");
    assert_eq!(query["per_page"], "10");
    assert_eq!(query["page"], "2");

    let (status, _) = get_json(&app, "/api/crypto?per_page=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_news_passthrough() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["title"], "BTC up");

    let query = app.upstream.last_news_query.lock().await.clone().unwrap();
    assert_eq!(query.get("filter").map(String::as_str), Some("hot"));
    assert_eq!(query.get("currencies").map(String::as_str), Some("BTC,ETH"));
}

#[tokio::test]
async fn test_balance_reporting() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/balance/0x1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["octas"], 123456789);
    assert_eq!(body["balance"], "1.23456789");
    assert_eq!(body["resource_present"], true);

    let (status, body) = get_json(&app, "/api/balance/0x2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "0");
    assert_eq!(body["resource_present"], false);

    let (status, body) = get_json(&app, "/api/balance/0x404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "account_lookup");

    let (status, _) = get_json(&app, "/api/balance/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transaction_history_pages() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/transactions?address=0x1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["total_transactions"], 7);
    assert_eq!(body["transactions"][0]["hash"], "0x06");

    let (_, body) = get_json(&app, "/api/transactions?address=0x1&page=2").await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

    for page in ["0", "3", "x"] {
        let (status, _) =
            get_json(&app, &format!("/api/transactions?address=0x1&page={page}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "page {page}");
    }

    // defaults to the wallet
    let (status, body) = get_json(&app, "/api/transactions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_transactions"], 7);
}

#[cfg(unix)]
#[tokio::test]
async fn test_predict_returns_process_output() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/predict", r#"{"WRI": 3.5}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["echo"]["WRI"], 3.5);

    let (status, _) = post_json(&app, "/predict", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trade_is_logged_on_chain() {
    let app = test_app().await;

    let (status, body) = post_json(
        &app,
        "/api/trade",
        r#"{"tradingPair": "BTC/USDT", "investmentAmount": "250", "leverage": "3x"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["txnHash"], "0xbeef");
    assert_eq!(body["tradeDetails"]["pair"], "BTC/USDT");
    assert_eq!(body["tradeDetails"]["leverage"], "3");
    assert_eq!(body["tradeDetails"]["tradeSize"], "250");
    assert_eq!(body["tradeDetails"]["realTimePrice"], "50000.00");
    assert_eq!(app.upstream.submissions.lock().await.len(), 1);
}

#[tokio::test]
async fn test_trade_form_validation() {
    let app = test_app().await;

    let (status, body) = post_json(&app, "/api/trade", r#"{"tradingPair": "BTC/USDT"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("investmentAmount"));

    let (status, _) = post_json(&app, "/api/trade", "{").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.upstream.submissions.lock().await.is_empty());
}
