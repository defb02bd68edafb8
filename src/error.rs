//! Error types for the Broker client library.

use serde::Deserialize;
use thiserror::Error;

/// The main error type for all Broker client operations.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// Non-2xx HTTP response whose body is not a structured API error
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// WebSocket communication error (with message)
    #[error("WebSocket error: {0}")]
    WebSocketMsg(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Broker API returned a structured error
    #[error("Broker API error: {0}")]
    Api(ApiError),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Input that cannot be signed or sent (e.g. a newline inside a canonical field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure
        reason: String,
    },

    /// Operation requires an authenticated WebSocket session
    #[error("WebSocket session is not authenticated")]
    NotAuthenticated,

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Missing required credentials
    #[error("Missing credentials: API key and secret required for private endpoints")]
    MissingCredentials,
}

impl BrokerError {
    /// The structured API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Api(e) => e.status,
            _ => None,
        }
    }
}

/// Structured error returned by the Broker API in the response body.
///
/// The body looks like `{"code":"INVALID_NONCE","message":"...","request_id":"..."}`.
/// Some deployments spell the last field `requestId`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code (e.g. `INVALID_SIGNATURE`)
    pub code: String,
    /// Human-readable error message
    #[serde(default)]
    pub message: String,
    /// Server-side request identifier for support tickets
    #[serde(default, alias = "requestId")]
    pub request_id: String,
    /// HTTP status the error arrived with
    #[serde(skip)]
    pub status: Option<u16>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.request_id.is_empty() {
            write!(f, " (request_id: {})", self.request_id)?;
        }
        Ok(())
    }
}

impl ApiError {
    /// Create a new API error from code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: String::new(),
            status: None,
        }
    }

    /// Attach the request ID.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Attach the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Parse a structured error from a response body.
    ///
    /// Returns `None` unless the body is a JSON object with a non-empty `code`.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|e| !e.code.is_empty())
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        self.code == error_codes::RATE_LIMITED
    }

    /// Check if this is an invalid nonce error (replayed or stale nonce).
    pub fn is_invalid_nonce(&self) -> bool {
        self.code == error_codes::INVALID_NONCE
    }

    /// Check if this is an invalid signature error.
    pub fn is_invalid_signature(&self) -> bool {
        self.code == error_codes::INVALID_SIGNATURE
    }

    /// Check if the request was rejected as unauthenticated.
    ///
    /// A bad signature cannot be told apart from other auth failures client-side,
    /// so this covers every code the server uses for rejected credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.code.as_str(),
            error_codes::UNAUTHORIZED
                | error_codes::INVALID_SIGNATURE
                | error_codes::INVALID_NONCE
                | error_codes::INVALID_TIMESTAMP
                | error_codes::INVALID_API_KEY
        )
    }

    /// Check if the order referenced by the request does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == error_codes::NOT_FOUND || self.code == error_codes::ORDER_NOT_FOUND
    }
}

/// Known Broker error codes for pattern matching.
pub mod error_codes {
    /// Authentication errors
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_API_KEY: &str = "INVALID_API_KEY";
    pub const INVALID_SIGNATURE: &str = "INVALID_SIGNATURE";
    pub const INVALID_NONCE: &str = "INVALID_NONCE";
    pub const INVALID_TIMESTAMP: &str = "INVALID_TIMESTAMP";

    /// Request errors
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ORDER_NOT_FOUND: &str = "ORDER_NOT_FOUND";
    pub const IDEMPOTENCY_CONFLICT: &str = "IDEMPOTENCY_CONFLICT";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";

    /// Trading errors
    pub const INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";
    pub const QUOTE_EXPIRED: &str = "QUOTE_EXPIRED";

    /// Service errors
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
