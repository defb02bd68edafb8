use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use broker_api_client::BrokerError;
use broker_api_client::auth::{Credentials, StaticCredentials, hash_body, sign_request};
use broker_api_client::error::error_codes;
use broker_api_client::rest::{
    BrokerClient, BrokerRestClient, EstimateRequest, SwapRequest, new_idempotency_key,
};
use broker_api_client::types::OrderStatus;
use rust_decimal::Decimal;

const API_KEY: &str = "test_key";
const SECRET: &str = "test_secret_1";

fn build_client(server: &MockServer) -> BrokerRestClient {
    let credentials = Arc::new(StaticCredentials::new(API_KEY, SECRET));
    BrokerRestClient::builder()
        .base_url(server.uri())
        .credentials(credentials)
        .build()
}

fn header_str<'a>(request: &'a Request, name: &str) -> &'a str {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| panic!("missing header {name}"))
}

/// Recompute the signature from what the server actually received.
fn assert_signed(request: &Request) {
    let path_with_query = match request.url.query() {
        Some(query) => format!("{}?{}", request.url.path(), query),
        None => request.url.path().to_string(),
    };
    let timestamp: i64 = header_str(request, "X-API-TIMESTAMP").parse().unwrap();
    let nonce = header_str(request, "X-API-NONCE");

    let expected = sign_request(
        &Credentials::new(API_KEY, SECRET),
        request.method.as_str(),
        &path_with_query,
        timestamp,
        nonce,
        &hash_body(Some(request.body.as_slice())),
    )
    .unwrap();

    assert_eq!(header_str(request, "X-API-KEY"), API_KEY);
    assert_eq!(header_str(request, "X-API-SIGN"), expected);
}

async fn single_request(server: &MockServer) -> Request {
    let mut requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    requests.remove(0)
}

#[tokio::test]
async fn test_get_balances() {
    let server = MockServer::start().await;
    let response = json!({
        "balances": [
            {"asset": "USDT", "total": "1000.50", "locked": "100"},
            {"asset": "BTC", "total": "0.5", "locked": "0"}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/balances"))
        .and(header("Content-Type", "application/json"))
        .and(header_exists("X-API-KEY"))
        .and(header_exists("X-API-TIMESTAMP"))
        .and(header_exists("X-API-NONCE"))
        .and(header_exists("X-API-SIGN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let balances = client.get_balances().await.unwrap();

    assert_eq!(balances.balances.len(), 2);
    let usdt = balances.get("USDT").unwrap();
    assert_eq!(usdt.available(), "900.50".parse::<Decimal>().unwrap());

    let request = single_request(&server).await;
    assert!(request.body.is_empty());
    assert!(request.headers.get("Idempotency-Key").is_none());
    assert_signed(&request);
}

#[tokio::test]
async fn test_estimate_swap_signs_transmitted_body() {
    let server = MockServer::start().await;
    let response = json!({
        "route": [{
            "exchange": "binance",
            "pool": "ETHUSDT",
            "from_asset": "ETH",
            "to_asset": "USDT",
            "amount_in": "1.5",
            "amount_out": "4500"
        }],
        "price": "3000",
        "expectedOut": "4500",
        "expiresAt": 1732526430000i64
    });

    Mock::given(method("POST"))
        .and(path("/api/v1/estimate"))
        .and(body_string(r#"{"from":"ETH","to":"USDT","amount":"1.5"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let request = EstimateRequest::new("ETH", "USDT", "1.5".parse().unwrap());
    let estimate = client.estimate_swap(&request).await.unwrap();

    assert_eq!(estimate.expected_out, "4500".parse::<Decimal>().unwrap());
    assert_eq!(estimate.route[0].pool, "ETHUSDT");

    let received = single_request(&server).await;
    assert_eq!(
        hash_body(Some(received.body.as_slice())),
        "15ec616d9a8dbb7085fb19f46d1a0c59d2ed30a42126f31e34d3efa6a293d78b"
    );
    assert_signed(&received);
}

#[tokio::test]
async fn test_estimate_swap_sends_liquidity_filter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/estimate"))
        .and(body_string(
            r#"{"from":"USDT","to":"BTC","amount":"10","filter":["binance","gate"]}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "route": [],
            "price": "0.0000333",
            "expectedOut": "0.000333",
            "expiresAt": 1732526430000i64
        })))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let request = EstimateRequest::new("USDT", "BTC", "10".parse().unwrap()).filter(["binance", "gate"]);
    let estimate = client.estimate_swap(&request).await.unwrap();
    assert!(estimate.route.is_empty());

    assert_signed(&single_request(&server).await);
}

#[tokio::test]
async fn test_swap_sends_idempotency_key() {
    let server = MockServer::start().await;
    let key = new_idempotency_key();

    Mock::given(method("POST"))
        .and(path("/api/v1/swap"))
        .and(header("Idempotency-Key", key.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"orderId": "ord_123", "status": "PENDING"})),
        )
        .mount(&server)
        .await;

    let client = build_client(&server);
    let request = SwapRequest::new("USDT", "BTC", "10".parse().unwrap(), "main", 50)
        .client_order_id("my-order-1");
    let response = client.swap(&request, &key).await.unwrap();

    assert_eq!(response.order_id, "ord_123");
    assert_eq!(response.status, OrderStatus::Pending);

    let received = single_request(&server).await;
    let body: serde_json::Value = serde_json::from_slice(&received.body).unwrap();
    assert_eq!(body["clientOrderId"], "my-order-1");
    assert_eq!(body["slippage_bps"], 50);
    assert_signed(&received);
}

#[tokio::test]
async fn test_swap_rejects_empty_idempotency_key() {
    let server = MockServer::start().await;
    let client = build_client(&server);
    let request = SwapRequest::new("USDT", "BTC", "10".parse().unwrap(), "main", 50);

    let err = client.swap(&request, "").await.unwrap_err();
    assert!(matches!(err, BrokerError::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_order_status_signs_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders/ord_123/status"))
        .and(query_param("clientOrderId", "my order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "ord_123",
            "status": "COMPLETED",
            "filledOut": "0.00033",
            "txHash": "0xabc",
            "updatedAt": 1732526400000i64,
            "clientOrderId": "my order"
        })))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let status = client
        .get_order_status("ord_123", Some("my order"))
        .await
        .unwrap();

    assert_eq!(status.status, OrderStatus::Completed);
    assert!(status.status.is_terminal());
    assert_eq!(status.tx_hash.as_deref(), Some("0xabc"));

    let received = single_request(&server).await;
    assert_eq!(received.url.query(), Some("clientOrderId=my+order"));
    assert_signed(&received);
}

#[tokio::test]
async fn test_get_order_status_rejects_path_characters() {
    let server = MockServer::start().await;
    let client = build_client(&server);

    for id in ["", "a/b", "a?b", "a#b", "a b"] {
        let err = client.get_order_status(id, None).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidInput(_)), "id {id:?}");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_structured_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/balances"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "INVALID_NONCE",
            "message": "nonce already used",
            "request_id": "req-42"
        })))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let err = client.get_balances().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    let api = err.api_error().unwrap();
    assert_eq!(api.code, error_codes::INVALID_NONCE);
    assert_eq!(api.message, "nonce already used");
    assert_eq!(api.request_id, "req-42");
    assert!(api.is_invalid_nonce());
}

#[tokio::test]
async fn test_unstructured_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/estimate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let client = build_client(&server);
    let request = EstimateRequest::new("ETH", "USDT", "1".parse().unwrap());
    match client.estimate_swap(&request).await.unwrap_err() {
        BrokerError::HttpStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "service unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credentials() {
    let server = MockServer::start().await;
    let client = BrokerRestClient::builder().base_url(server.uri()).build();

    let err = client.get_balances().await.unwrap_err();
    assert!(matches!(err, BrokerError::MissingCredentials));
}

#[tokio::test]
async fn test_each_request_uses_fresh_nonce() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/balances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balances": []})))
        .expect(2)
        .mount(&server)
        .await;

    let client = build_client(&server);
    client.get_balances().await.unwrap();
    client.get_balances().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_ne!(
        header_str(&requests[0], "X-API-NONCE"),
        header_str(&requests[1], "X-API-NONCE")
    );
    assert_ne!(
        header_str(&requests[0], "X-API-SIGN"),
        header_str(&requests[1], "X-API-SIGN")
    );
}

async fn fetch_via_trait<C: BrokerClient>(client: &C) -> broker_api_client::Result<usize> {
    Ok(client.get_balances().await?.balances.len())
}

#[tokio::test]
async fn test_trait_dispatch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/balances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "balances": [{"asset": "ETH", "total": "2", "locked": "0"}]
        })))
        .mount(&server)
        .await;

    let client = build_client(&server);
    assert_eq!(fetch_via_trait(&client).await.unwrap(), 1);
}
