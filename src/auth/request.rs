//! A fully signed request, ready to hand to a transport.

use crate::auth::{Credentials, NonceProvider, hash_body, sign_request};
use crate::error::BrokerError;

/// Header carrying the API key.
pub const HEADER_API_KEY: &str = "X-API-KEY";
/// Header carrying the request timestamp in milliseconds.
pub const HEADER_TIMESTAMP: &str = "X-API-TIMESTAMP";
/// Header carrying the request nonce.
pub const HEADER_NONCE: &str = "X-API-NONCE";
/// Header carrying the hex signature.
pub const HEADER_SIGNATURE: &str = "X-API-SIGN";
/// Header carrying the idempotency key (swap execution only).
pub const HEADER_IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn timestamp_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// A request signed for one-time use.
///
/// Built fresh for every call and dropped once the response arrives. The
/// `body` field holds the exact bytes that were hashed and must be the exact
/// bytes transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Upper-cased method (`GET`, `POST`, or `WS`).
    pub method: String,
    /// Path plus optional query string.
    pub path_with_query: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
    /// Unique token for this request.
    pub nonce: String,
    /// Serialized body (empty when the request has none).
    pub body: Vec<u8>,
    /// Lowercase hex SHA-256 of `body`.
    pub body_sha256: String,
    /// Lowercase hex HMAC-SHA256 signature.
    pub signature: String,
}

impl SignedRequest {
    /// Sign a request using the current time and a fresh nonce.
    pub fn new(
        credentials: &Credentials,
        nonce_provider: &dyn NonceProvider,
        method: &str,
        path_with_query: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Self, BrokerError> {
        Self::at(
            credentials,
            method,
            path_with_query,
            timestamp_ms(),
            nonce_provider.next_nonce(),
            body,
        )
    }

    /// Sign a request with an explicit timestamp and nonce.
    pub fn at(
        credentials: &Credentials,
        method: &str,
        path_with_query: &str,
        timestamp_ms: i64,
        nonce: impl Into<String>,
        body: Option<Vec<u8>>,
    ) -> Result<Self, BrokerError> {
        let nonce = nonce.into();
        let body = body.unwrap_or_default();
        let body_sha256 = hash_body(Some(body.as_slice()));
        let signature = sign_request(
            credentials,
            method,
            path_with_query,
            timestamp_ms,
            &nonce,
            &body_sha256,
        )?;

        Ok(Self {
            method: method.to_ascii_uppercase(),
            path_with_query: path_with_query.to_string(),
            timestamp_ms,
            nonce,
            body,
            body_sha256,
            signature,
        })
    }

    /// Authentication header pairs for a REST call.
    pub fn headers(&self, credentials: &Credentials) -> [(&'static str, String); 4] {
        [
            (HEADER_API_KEY, credentials.api_key.clone()),
            (HEADER_TIMESTAMP, self.timestamp_ms.to_string()),
            (HEADER_NONCE, self.nonce.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{EMPTY_BODY_SHA256, RandomNonce};

    #[test]
    fn test_signed_request_known_vector() {
        let credentials = Credentials::new("test_key", "test_secret_1");
        let body = br#"{"from":"ETH","to":"USDT","amount":"1.5"}"#.to_vec();
        let request = SignedRequest::at(
            &credentials,
            "post",
            "/api/v1/estimate",
            1732526400000,
            "nonce_123",
            Some(body.clone()),
        )
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.body, body);
        assert_eq!(
            request.signature,
            "3db33719be74eccafe50c3819fb0dacba2421fb7710b264d1f8c92e2fb34abd1"
        );

        let headers = request.headers(&credentials);
        assert_eq!(headers[0], (HEADER_API_KEY, "test_key".to_string()));
        assert_eq!(headers[1], (HEADER_TIMESTAMP, "1732526400000".to_string()));
        assert_eq!(headers[2], (HEADER_NONCE, "nonce_123".to_string()));
    }

    #[test]
    fn test_signed_request_fresh_nonce() {
        let credentials = Credentials::new("k", "s");
        let a = SignedRequest::new(&credentials, &RandomNonce, "GET", "/api/v1/balances", None)
            .unwrap();
        let b = SignedRequest::new(&credentials, &RandomNonce, "GET", "/api/v1/balances", None)
            .unwrap();

        assert_eq!(a.body_sha256, EMPTY_BODY_SHA256);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.signature, b.signature);
        assert!(a.timestamp_ms > 1_700_000_000_000);
    }
}
