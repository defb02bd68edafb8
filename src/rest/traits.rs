//! Trait definition for the Broker REST API client.
//!
//! [`BrokerClient`] abstracts the trading operations so callers can swap in
//! mock implementations or wrap the client with decorators.

use std::future::Future;

use crate::error::BrokerError;
use crate::rest::types::{
    BalancesResponse, EstimateRequest, EstimateResponse, OrderStatusResponse, SwapRequest,
    SwapResponse,
};

/// Trait defining the Broker REST API operations.
///
/// All methods are async and return `Result<T, BrokerError>`.
pub trait BrokerClient: Send + Sync {
    /// Get account balances.
    fn get_balances(&self) -> impl Future<Output = Result<BalancesResponse, BrokerError>> + Send;

    /// Get a swap estimate.
    fn estimate_swap(
        &self,
        request: &EstimateRequest,
    ) -> impl Future<Output = Result<EstimateResponse, BrokerError>> + Send;

    /// Execute a swap under an idempotency key.
    fn swap(
        &self,
        request: &SwapRequest,
        idempotency_key: &str,
    ) -> impl Future<Output = Result<SwapResponse, BrokerError>> + Send;

    /// Get the status of an order.
    fn get_order_status(
        &self,
        order_id: &str,
        client_order_id: Option<&str>,
    ) -> impl Future<Output = Result<OrderStatusResponse, BrokerError>> + Send;
}
