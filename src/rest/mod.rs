//! Broker REST API client.
//!
//! Every call is signed with the HMAC-SHA256 scheme from [`crate::auth`] and
//! carries the `X-API-*` headers.
//!
//! # Trait-based API
//!
//! The [`BrokerClient`] trait abstracts the REST operations, enabling mock
//! implementations in tests and decorators around the real client.
//!
//! ```rust,ignore
//! use broker_api_client::rest::{BrokerClient, BrokerRestClient};
//!
//! async fn show_balances<C: BrokerClient>(client: &C) -> broker_api_client::Result<()> {
//!     for balance in client.get_balances().await?.balances {
//!         println!("{}: {}", balance.asset, balance.total);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
pub mod endpoints;
mod traits;
mod types;

pub use client::{BrokerRestClient, BrokerRestClientBuilder, new_idempotency_key};
pub use endpoints::BROKER_BASE_URL;
pub use traits::BrokerClient;
pub use types::*;
