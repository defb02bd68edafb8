//! Common domain types for the Broker API.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Balance of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Asset symbol (e.g. `USDT`)
    pub asset: String,
    /// Total amount, including locked funds
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    /// Amount reserved by open orders
    #[serde(with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

impl Balance {
    /// Amount available for new swaps.
    pub fn available(&self) -> Decimal {
        self.total - self.locked
    }
}

/// One hop of a swap route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Venue executing this hop
    pub exchange: String,
    /// Pool or market identifier on that venue
    pub pool: String,
    /// Asset going in
    pub from_asset: String,
    /// Asset coming out
    pub to_asset: String,
    /// Amount going in
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_in: Decimal,
    /// Amount coming out
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_out: Decimal,
}

/// Status of a swap order.
///
/// The server sends statuses in upper case (`PENDING`, `COMPLETED`); decoding
/// ignores case and accepts the common synonyms. Anything else becomes
/// [`OrderStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, not yet routed
    Pending,
    /// Being executed on chain or on a venue
    Processing,
    /// Fully executed
    Completed,
    /// Execution failed
    Failed,
    /// Cancelled before completion
    Cancelled,
    /// Expired before execution
    Expired,
    /// Any status this client does not know yet
    Unknown,
}

impl OrderStatus {
    /// Whether no further updates are expected for the order.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "new" | "accepted" => OrderStatus::Pending,
            "processing" | "executing" | "submitted" => OrderStatus::Processing,
            "completed" | "filled" | "done" | "success" => OrderStatus::Completed,
            "failed" | "rejected" | "error" => OrderStatus::Failed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "expired" => OrderStatus::Expired,
            _ => OrderStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Cow::<'de, str>::deserialize(deserializer)?;
        Ok(OrderStatus::from(s.as_ref()))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a millisecond UNIX timestamp from the API into a datetime.
///
/// Returns `None` for values outside the representable range.
pub fn datetime_from_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_balance_deserialize() {
        let balance: Balance =
            serde_json::from_str(r#"{"asset":"USDT","total":"100.50","locked":"0.50"}"#).unwrap();
        assert_eq!(balance.asset, "USDT");
        assert_eq!(balance.available(), dec("100.00"));
    }

    #[test]
    fn test_order_status_server_case() {
        let status: OrderStatus = serde_json::from_str(r#""PENDING""#).unwrap();
        assert_eq!(status, OrderStatus::Pending);
        assert!(!status.is_terminal());

        let status: OrderStatus = serde_json::from_str(r#""COMPLETED""#).unwrap();
        assert_eq!(status, OrderStatus::Completed);
        assert!(status.is_terminal());

        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), r#""CANCELLED""#);
        assert_eq!(OrderStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_order_status_from_value() {
        let status: OrderStatus = serde_json::from_value(serde_json::json!("Canceled")).unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_order_status_aliases() {
        let status: OrderStatus = serde_json::from_str(r#""filled""#).unwrap();
        assert_eq!(status, OrderStatus::Completed);
        assert!(status.is_terminal());

        let status: OrderStatus = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_datetime_from_millis() {
        let dt = datetime_from_millis(1_732_526_400_000).unwrap();
        assert_eq!(dt.unix_timestamp(), 1_732_526_400);
    }
}
