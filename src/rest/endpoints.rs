//! Broker REST API endpoint constants.

/// Base URL for the Broker REST API.
pub const BROKER_BASE_URL: &str = "https://partner-api-dev.the-one.io";

/// Get account balances.
pub const BALANCES: &str = "/api/v1/balances";
/// Get a swap estimate.
pub const ESTIMATE: &str = "/api/v1/estimate";
/// Execute a swap.
pub const SWAP: &str = "/api/v1/swap";

/// Path for the status of a single order.
pub fn order_status(order_id: &str) -> String {
    format!("/api/v1/orders/{order_id}/status")
}
