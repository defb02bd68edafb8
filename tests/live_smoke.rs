use std::sync::Arc;

use broker_api_client::auth::EnvCredentials;
use broker_api_client::rest::{BrokerRestClient, EstimateRequest};
use broker_api_client::ws::{BrokerWsClient, WsSwapParams, ws_url_from_base};

fn live_tests_enabled() -> bool {
    std::env::var("BROKER_LIVE_TESTS").ok().as_deref() == Some("1")
}

fn base_url() -> Option<String> {
    std::env::var("BROKER_BASE_URL").ok().filter(|v| !v.is_empty())
}

#[tokio::test]
#[ignore]
async fn live_rest_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    if !live_tests_enabled() {
        return Ok(());
    }

    let Ok(credentials) = EnvCredentials::from_env() else {
        return Ok(());
    };
    let mut builder = BrokerRestClient::builder().credentials(Arc::new(credentials));
    if let Some(url) = base_url() {
        builder = builder.base_url(url);
    }
    let client = builder.build();

    let _balances = client.get_balances().await?;
    let estimate = client
        .estimate_swap(&EstimateRequest::new("USDT", "BTC", "10".parse()?))
        .await?;
    assert!(estimate.expected_out > rust_decimal::Decimal::ZERO);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_ws_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    if !live_tests_enabled() {
        return Ok(());
    }

    let Ok(credentials) = EnvCredentials::from_env() else {
        return Ok(());
    };
    let mut client = BrokerWsClient::new(Arc::new(credentials));
    if let Some(url) = base_url() {
        client = client.with_url(ws_url_from_base(&url));
    }

    let session = client.connect().await?;
    assert!(session.is_authenticated());

    let _balances = session.balances().await?;
    let _estimate = session
        .estimate(&WsSwapParams::new("10".parse()?, "USDT", "BTC"))
        .await?;

    session.close().await?;
    Ok(())
}
