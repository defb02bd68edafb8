//! Request and response types for the REST endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

use crate::types::{Balance, OrderStatus, RouteStep, datetime_from_millis};

/// Response of `GET /api/v1/balances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesResponse {
    /// Per-asset balances.
    #[serde(default)]
    pub balances: Vec<Balance>,
}

impl BalancesResponse {
    /// Find the balance of one asset.
    pub fn get(&self, asset: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.asset == asset)
    }
}

/// Request body of `POST /api/v1/estimate`.
///
/// Field order is the wire order and therefore part of the signed body.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequest {
    /// Asset to sell.
    pub from: String,
    /// Asset to buy.
    pub to: String,
    /// Amount of `from` to sell.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Settlement network.
    pub network: Option<String>,
    /// Sub-account.
    pub account: Option<String>,
    /// Liquidity sources to route through (e.g. `binance`, `gate`).
    pub filter: Option<Vec<String>>,
}

impl EstimateRequest {
    /// Create an estimate request.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            network: None,
            account: None,
            filter: None,
        }
    }

    /// Set the settlement network.
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Set the sub-account.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Restrict routing to the given liquidity sources.
    pub fn filter<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(sources.into_iter().map(Into::into).collect());
        self
    }
}

/// Response of `POST /api/v1/estimate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    /// Route the swap would take.
    #[serde(default)]
    pub route: Vec<RouteStep>,
    /// Quoted price.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Expected amount of the target asset.
    #[serde(with = "rust_decimal::serde::str")]
    pub expected_out: Decimal,
    /// Quote expiry in milliseconds since the UNIX epoch.
    pub expires_at: i64,
}

impl EstimateResponse {
    /// Quote expiry as a datetime.
    pub fn expires_at_datetime(&self) -> Option<OffsetDateTime> {
        datetime_from_millis(self.expires_at)
    }
}

/// Request body of `POST /api/v1/swap`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Asset to sell.
    pub from: String,
    /// Asset to buy.
    pub to: String,
    /// Amount of `from` to sell.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Account executing the swap.
    pub account: String,
    /// Maximum slippage in basis points.
    pub slippage_bps: u32,
    /// Caller-chosen order identifier.
    #[serde(rename = "clientOrderId")]
    pub client_order_id: Option<String>,
    /// Liquidity sources to route through.
    pub filter: Option<Vec<String>>,
}

impl SwapRequest {
    /// Create a swap request.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
        account: impl Into<String>,
        slippage_bps: u32,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            account: account.into(),
            slippage_bps,
            client_order_id: None,
            filter: None,
        }
    }

    /// Build a swap that executes a previously estimated trade.
    ///
    /// The estimate's liquidity filter carries over.
    pub fn from_estimate(
        estimate: &EstimateRequest,
        account: impl Into<String>,
        slippage_bps: u32,
    ) -> Self {
        Self {
            filter: estimate.filter.clone(),
            ..Self::new(
                estimate.from.clone(),
                estimate.to.clone(),
                estimate.amount,
                account,
                slippage_bps,
            )
        }
    }

    /// Set the client order ID.
    pub fn client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Restrict routing to the given liquidity sources.
    pub fn filter<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(sources.into_iter().map(Into::into).collect());
        self
    }
}

/// Response of `POST /api/v1/swap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Server-assigned order ID.
    pub order_id: String,
    /// Initial order status.
    pub status: OrderStatus,
}

/// Response of `GET /api/v1/orders/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    /// Server-assigned order ID.
    pub order_id: String,
    /// Current status.
    pub status: OrderStatus,
    /// Amount of the target asset delivered so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_out: Option<String>,
    /// Settlement transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Last update in milliseconds since the UNIX epoch.
    #[serde(default)]
    pub updated_at: i64,
    /// Caller-chosen order identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl OrderStatusResponse {
    /// Filled amount as a decimal, if present and well-formed.
    pub fn filled_out_amount(&self) -> Option<Decimal> {
        self.filled_out.as_deref().and_then(|s| s.parse().ok())
    }

    /// Last update as a datetime.
    pub fn updated_at_datetime(&self) -> Option<OffsetDateTime> {
        datetime_from_millis(self.updated_at)
    }
}

/// Query string of the order status endpoint.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct OrderStatusQuery<'a> {
    #[serde(rename = "clientOrderId")]
    pub client_order_id: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_request_wire_format() {
        let request = EstimateRequest::new("ETH", "USDT", "1.5".parse().unwrap());
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"from":"ETH","to":"USDT","amount":"1.5"}"#
        );

        let request = request.network("ERC20").account("main");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"from":"ETH","to":"USDT","amount":"1.5","network":"ERC20","account":"main"}"#
        );
    }

    #[test]
    fn test_swap_request_wire_format() {
        let request = SwapRequest::new("USDT", "BTC", "10".parse().unwrap(), "main", 30)
            .client_order_id("my-1");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"from":"USDT","to":"BTC","amount":"10","account":"main","slippage_bps":30,"clientOrderId":"my-1"}"#
        );
    }

    #[test]
    fn test_filter_serialized_last() {
        let estimate = EstimateRequest::new("USDT", "BTC", "10".parse().unwrap())
            .filter(["binance", "gate"])
            .network("TRC20");
        assert_eq!(
            serde_json::to_string(&estimate).unwrap(),
            r#"{"from":"USDT","to":"BTC","amount":"10","network":"TRC20","filter":["binance","gate"]}"#
        );

        let swap = SwapRequest::from_estimate(&estimate, "main", 50).client_order_id("c-1");
        assert_eq!(
            serde_json::to_string(&swap).unwrap(),
            r#"{"from":"USDT","to":"BTC","amount":"10","account":"main","slippage_bps":50,"clientOrderId":"c-1","filter":["binance","gate"]}"#
        );
    }

    #[test]
    fn test_estimate_response_deserialize() {
        let json = r#"{
            "route": [{
                "exchange": "binance",
                "pool": "ETHUSDT",
                "from_asset": "ETH",
                "to_asset": "USDT",
                "amount_in": "1.5",
                "amount_out": "4500.12"
            }],
            "price": "3000.08",
            "expectedOut": "4500.12",
            "expiresAt": 1732526430000
        }"#;
        let response: EstimateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.route.len(), 1);
        assert_eq!(response.route[0].exchange, "binance");
        assert_eq!(response.expected_out, "4500.12".parse::<Decimal>().unwrap());
        assert!(response.expires_at_datetime().is_some());
    }

    #[test]
    fn test_order_status_response_optional_fields() {
        let json = r#"{"orderId":"ord_1","status":"COMPLETED","filledOut":"0.0003","txHash":"0xabc","updatedAt":1732526400000}"#;
        let response: OrderStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, OrderStatus::Completed);
        assert_eq!(response.filled_out_amount(), Some("0.0003".parse::<Decimal>().unwrap()));
        assert!(response.client_order_id.is_none());

        let json = r#"{"orderId":"ord_2","status":"pending","updatedAt":0}"#;
        let response: OrderStatusResponse = serde_json::from_str(json).unwrap();
        assert!(response.filled_out_amount().is_none());
    }

    #[test]
    fn test_order_status_query() {
        let query = OrderStatusQuery {
            client_order_id: Some("a b&c"),
        };
        assert_eq!(
            serde_urlencoded::to_string(&query).unwrap(),
            "clientOrderId=a+b%26c"
        );
        assert_eq!(
            serde_urlencoded::to_string(OrderStatusQuery::default()).unwrap(),
            ""
        );
    }
}
