//! Broker WebSocket API client.
//!
//! A [`WsSession`] authenticates once per connection, tracks channel
//! subscriptions, routes responses to waiting callers and reconnects with
//! exponential backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use broker_api_client::auth::StaticCredentials;
//! use broker_api_client::ws::{BrokerWsClient, WsEvent, WsSwapParams, channels};
//! use futures_util::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(StaticCredentials::new("api_key", "secret_key"));
//!     let session = BrokerWsClient::new(credentials).connect().await?;
//!     let mut events = session.take_events().expect("events already taken");
//!
//!     session
//!         .subscribe(channels::BALANCES, |msg| println!("balances: {}", msg.data))
//!         .await?;
//!
//!     let estimate = session
//!         .estimate(&WsSwapParams::new("10".parse()?, "USDT", "BTC"))
//!         .await?;
//!     println!("Expected out: {}", estimate.expected_out);
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             WsEvent::Reconnected { resubscribed } => {
//!                 println!("Reconnected, {} channels restored", resubscribed);
//!             }
//!             WsEvent::ReconnectFailed { .. } => break,
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
pub mod messages;
mod session;

pub use client::{BackoffPolicy, BrokerWsClient, WsConfig, WsConfigBuilder, ws_url_from_base};
pub use messages::{
    ChannelMessage, InboundMessage, OrderStatusParams, WsErrorMessage, WsFrame, WsSwapParams,
    channels, operations,
};
pub use session::{ConnectionState, MessageHandler, WsEvent, WsSession};
