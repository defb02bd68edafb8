//! HMAC-SHA256 signature generation for Broker API authentication.
//!
//! Every private call (REST or WebSocket) is signed over a canonical string:
//!
//! ```text
//! METHOD\nPATH_WITH_QUERY\nTIMESTAMP_MS\nNONCE\nBODY_SHA256_HEX
//! ```
//!
//! The HMAC key is NOT the raw secret. The secret is hashed with SHA-256, the
//! digest is base64url-encoded (URL-safe alphabet, padding kept), and the UTF-8
//! bytes of that base64 text are used as the key:
//!
//! ```text
//! key       = base64url(SHA256(secret))
//! signature = hex(HMAC-SHA256(key, canonical_string))
//! ```
//!
//! WebSocket frames reuse the same function with the method `WS` and a
//! synthetic path (`/ws/v1/stream` for auth, `/ws/v1/<operation>` otherwise).

use base64::{Engine, engine::general_purpose::URL_SAFE};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::auth::Credentials;
use crate::error::BrokerError;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of the empty byte string, used for requests without a body.
pub const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Hash a request body.
///
/// `None` and an empty slice both hash to [`EMPTY_BODY_SHA256`]. The bytes
/// passed here must be exactly the bytes put on the wire.
pub fn hash_body(body: Option<&[u8]>) -> String {
    hex::encode(Sha256::digest(body.unwrap_or_default()))
}

/// Build the canonical string for a request.
///
/// The method is upper-cased; all other fields are used verbatim. Fields
/// containing a line break are rejected because they would shift the field
/// boundaries the server reconstructs.
pub fn canonical_string(
    method: &str,
    path_with_query: &str,
    timestamp_ms: i64,
    nonce: &str,
    body_sha256: &str,
) -> Result<String, BrokerError> {
    for (name, value) in [
        ("method", method),
        ("path", path_with_query),
        ("nonce", nonce),
        ("body hash", body_sha256),
    ] {
        if value.contains(['\n', '\r']) {
            return Err(BrokerError::InvalidInput(format!(
                "{name} must not contain line breaks"
            )));
        }
    }

    Ok(format!(
        "{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        path_with_query,
        timestamp_ms,
        nonce,
        body_sha256
    ))
}

/// Derive the HMAC key text from the raw secret.
///
/// Returns `base64url(SHA256(secret))` with padding.
pub fn derive_hmac_key(secret: &str) -> String {
    URL_SAFE.encode(Sha256::digest(secret.as_bytes()))
}

/// Sign a canonical string with the raw secret.
///
/// Returns the lowercase hex HMAC-SHA256 digest.
pub fn sign_canonical(secret: &str, canonical: &str) -> Result<String, BrokerError> {
    sign_with_hmac_key(&derive_hmac_key(secret), canonical)
}

fn sign_with_hmac_key(key: &str, canonical: &str) -> Result<String, BrokerError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| BrokerError::Auth(format!("Invalid HMAC key: {e}")))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign a request for the Broker API.
///
/// # Arguments
///
/// * `credentials` - API credentials containing the secret
/// * `method` - HTTP method, or `WS` for WebSocket frames (any case)
/// * `path_with_query` - e.g. `/api/v1/orders/42/status?clientOrderId=abc`
/// * `timestamp_ms` - milliseconds since the UNIX epoch
/// * `nonce` - unique token for this request
/// * `body_sha256` - output of [`hash_body`]
///
/// # Example
///
/// ```rust
/// use broker_api_client::auth::{Credentials, hash_body, sign_request};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("api_key", "secret");
/// let signature = sign_request(
///     &credentials,
///     "GET",
///     "/api/v1/balances",
///     1732526400000,
///     "1732526400000000000_42",
///     &hash_body(None),
/// )?;
/// assert_eq!(signature.len(), 64);
/// # Ok(())
/// # }
/// ```
pub fn sign_request(
    credentials: &Credentials,
    method: &str,
    path_with_query: &str,
    timestamp_ms: i64,
    nonce: &str,
    body_sha256: &str,
) -> Result<String, BrokerError> {
    let canonical = canonical_string(method, path_with_query, timestamp_ms, nonce, body_sha256)?;
    tracing::trace!(canonical = ?canonical, "signing canonical string");
    sign_with_hmac_key(credentials.hmac_key(), &canonical)
}
