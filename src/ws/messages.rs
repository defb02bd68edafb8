//! WebSocket message types for the Broker stream.
//!
//! Every frame, in both directions, is a flat JSON object:
//!
//! ```text
//! {"op":..,"ch":..,"key":..,"ts":..,"nonce":..,"sig":..,"data":..,"error":..}
//! ```
//!
//! with absent fields omitted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use serde_with::skip_serializing_none;

use crate::auth::{Credentials, NonceProvider, SignedRequest, timestamp_ms};
use crate::error::{ApiError, BrokerError};

/// Method token used when signing WebSocket frames.
pub const WS_METHOD: &str = "WS";

/// Synthetic path signed by the auth frame.
pub const AUTH_PATH: &str = "/ws/v1/stream";

/// Synthetic path signed by a per-operation frame.
pub fn operation_path(op: &str) -> String {
    format!("/ws/v1/{op}")
}

/// Operation names (the `op` field).
pub mod operations {
    /// Session authentication.
    pub const AUTH: &str = "auth";
    /// Subscribe to a channel.
    pub const SUBSCRIBE: &str = "subscribe";
    /// Unsubscribe from a channel.
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    /// Swap estimate.
    pub const ESTIMATE: &str = "estimate";
    /// Swap execution.
    pub const SWAP: &str = "swap";
    /// Order status lookup.
    pub const ORDER_STATUS: &str = "order_status";
    /// Balance snapshot.
    pub const BALANCES: &str = "balances";

    /// Whether frames for this operation carry their own signature.
    pub fn is_signed(op: &str) -> bool {
        matches!(op, ESTIMATE | SWAP | ORDER_STATUS | BALANCES)
    }
}

/// Channel names (the `ch` field).
pub mod channels {
    /// Balance updates.
    pub const BALANCES: &str = "balances";

    /// Updates for a single order.
    pub fn order(order_id: &str) -> String {
        format!("orders:{order_id}")
    }
}

/// An outbound WebSocket frame.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WsFrame {
    /// Operation name.
    pub op: Option<String>,
    /// Channel name.
    pub ch: Option<String>,
    /// API key (auth frame only).
    pub key: Option<String>,
    /// Milliseconds since the UNIX epoch.
    pub ts: Option<i64>,
    /// Unique token for this frame.
    pub nonce: Option<String>,
    /// Lowercase hex signature.
    pub sig: Option<String>,
    /// Operation payload, embedded verbatim.
    pub data: Option<Box<RawValue>>,
    /// Error text.
    pub error: Option<String>,
}

impl WsFrame {
    /// Build the auth frame using the current time and a fresh nonce.
    pub fn auth(
        credentials: &Credentials,
        nonce_provider: &dyn NonceProvider,
    ) -> Result<Self, BrokerError> {
        Self::auth_at(credentials, timestamp_ms(), nonce_provider.next_nonce())
    }

    /// Build the auth frame with an explicit timestamp and nonce.
    ///
    /// The signature covers `WS\n/ws/v1/stream\nTS\nNONCE\n<empty body hash>`.
    pub fn auth_at(
        credentials: &Credentials,
        timestamp_ms: i64,
        nonce: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        let signed = SignedRequest::at(credentials, WS_METHOD, AUTH_PATH, timestamp_ms, nonce, None)?;
        Ok(Self {
            op: Some(operations::AUTH.to_string()),
            key: Some(credentials.api_key.clone()),
            ts: Some(signed.timestamp_ms),
            nonce: Some(signed.nonce),
            sig: Some(signed.signature),
            ..Default::default()
        })
    }

    /// Build a subscribe frame.
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            op: Some(operations::SUBSCRIBE.to_string()),
            ch: Some(channel.into()),
            ..Default::default()
        }
    }

    /// Build an unsubscribe frame.
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            op: Some(operations::UNSUBSCRIBE.to_string()),
            ch: Some(channel.into()),
            ..Default::default()
        }
    }

    /// Build a signed operation frame using the current time and a fresh nonce.
    ///
    /// `data` is the already-serialized JSON payload.
    pub fn signed(
        op: &str,
        credentials: &Credentials,
        nonce_provider: &dyn NonceProvider,
        data: Option<String>,
    ) -> Result<Self, BrokerError> {
        Self::signed_at(op, credentials, timestamp_ms(), nonce_provider.next_nonce(), data)
    }

    /// Build a signed operation frame with an explicit timestamp and nonce.
    ///
    /// The payload is embedded as a raw JSON value, so the bytes hashed into
    /// the signature are the bytes sent in `data`.
    pub fn signed_at(
        op: &str,
        credentials: &Credentials,
        timestamp_ms: i64,
        nonce: impl Into<String>,
        data: Option<String>,
    ) -> Result<Self, BrokerError> {
        let data = data.map(RawValue::from_string).transpose()?;
        let body = data.as_ref().map(|raw| raw.get().as_bytes().to_vec());
        let signed = SignedRequest::at(
            credentials,
            WS_METHOD,
            &operation_path(op),
            timestamp_ms,
            nonce,
            body,
        )?;

        Ok(Self {
            op: Some(op.to_string()),
            ts: Some(signed.timestamp_ms),
            nonce: Some(signed.nonce),
            sig: Some(signed.signature),
            data,
            ..Default::default()
        })
    }

    /// Serialize the frame to its JSON text.
    pub fn to_json(&self) -> Result<String, BrokerError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of the `estimate` and `swap` operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsSwapParams {
    /// Amount of `asset_in` to sell.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_in: Decimal,
    /// Asset to sell.
    pub asset_in: String,
    /// Asset to buy.
    pub asset_out: String,
}

impl WsSwapParams {
    /// Create swap parameters.
    pub fn new(amount_in: Decimal, asset_in: impl Into<String>, asset_out: impl Into<String>) -> Self {
        Self {
            amount_in,
            asset_in: asset_in.into(),
            asset_out: asset_out.into(),
        }
    }
}

/// Payload of the `order_status` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusParams {
    /// Server-assigned order ID.
    pub id: String,
}

/// A push notification delivered to channel handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    /// Channel the message was published on.
    pub channel: String,
    /// Message payload (`Null` when absent).
    pub data: Value,
}

/// An `error` frame from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsErrorMessage {
    /// Operation the error refers to, if the server named one.
    pub op: Option<String>,
    /// Error text.
    pub message: String,
    /// Structured error, when `error` was a `{code, message}` object.
    pub api_error: Option<ApiError>,
}

impl WsErrorMessage {
    /// Convert into the error handed to a waiting caller.
    pub fn into_error(self) -> BrokerError {
        match self.api_error {
            Some(api_error) => BrokerError::Api(api_error),
            None => BrokerError::WebSocketMsg(self.message),
        }
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Frame with a non-empty `error`, whether or not `op` is set.
    Error(WsErrorMessage),
    /// Response to an operation.
    Response {
        /// Operation name.
        op: String,
        /// Channel, for subscribe/unsubscribe acknowledgements.
        ch: Option<String>,
        /// Response payload.
        data: Option<Value>,
    },
    /// Push notification on a channel.
    ChannelData(ChannelMessage),
    /// Anything else.
    Unknown(Value),
}

impl InboundMessage {
    /// Classify a frame by the presence of `error`, then `op`, then `ch`.
    pub fn classify(mut value: Value) -> Self {
        let op = value.get("op").and_then(Value::as_str).map(str::to_string);

        if let Some(error) = value.get("error").filter(|e| is_present(e)) {
            let api_error = serde_json::from_value::<ApiError>(error.clone())
                .ok()
                .filter(|e| !e.code.is_empty());
            let message = match (error, &api_error) {
                (_, Some(api)) if !api.message.is_empty() => api.message.clone(),
                (Value::String(s), _) => s.clone(),
                (Value::Object(map), _) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
                _ => error.to_string(),
            };
            return Self::Error(WsErrorMessage {
                op,
                message,
                api_error,
            });
        }

        let ch = value.get("ch").and_then(Value::as_str).map(str::to_string);
        let data = value.get_mut("data").map(Value::take).filter(|d| !d.is_null());

        match (op, ch) {
            (Some(op), ch) => Self::Response { op, ch, data },
            (None, Some(channel)) => Self::ChannelData(ChannelMessage {
                channel,
                data: data.unwrap_or(Value::Null),
            }),
            (None, None) => Self::Unknown(value),
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
