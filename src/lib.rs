//! # Broker Client
//!
//! An async Rust client library for the Broker Trading REST and WebSocket APIs.
//!
//! ## Features
//!
//! - HMAC-SHA256 request signing shared by both transports
//! - Signed REST calls for balances, estimates, swaps and order status
//! - WebSocket sessions with channel subscriptions and automatic reconnection
//! - Strong typing for all request/response types
//! - Financial precision with `rust_decimal`
//!
//! ## Signing
//!
//! Every private call is signed over
//! `METHOD\nPATH_WITH_QUERY\nTIMESTAMP_MS\nNONCE\nBODY_SHA256_HEX` with a key
//! derived from the secret. See [`auth`] for details.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use broker_api_client::auth::EnvCredentials;
//! use broker_api_client::rest::BrokerRestClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BrokerRestClient::builder()
//!         .credentials(Arc::new(EnvCredentials::from_env()?))
//!         .build();
//!     let balances = client.get_balances().await?;
//!     println!("Balances: {:?}", balances);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod rest;
pub mod types;
pub mod ws;

// Re-export commonly used types at crate root
pub use error::{ApiError, BrokerError};
pub use types::common::{Balance, OrderStatus};

/// Result type alias using BrokerError
pub type Result<T> = std::result::Result<T, BrokerError>;
