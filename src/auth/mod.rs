//! Authentication module for the Broker API.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - Nonce generation for replay attack prevention
//! - Body hashing, canonical strings and HMAC-SHA256 signatures shared by REST and WebSocket

mod credentials;
mod nonce;
mod request;
mod signature;

pub use credentials::{
    API_KEY_ENV, Credentials, CredentialsProvider, EnvCredentials, SECRET_KEY_ENV,
    StaticCredentials,
};
pub use nonce::{NonceProvider, RandomNonce, generate_nonce};
pub use request::{
    HEADER_API_KEY, HEADER_IDEMPOTENCY_KEY, HEADER_NONCE, HEADER_SIGNATURE, HEADER_TIMESTAMP,
    SignedRequest, timestamp_ms,
};
pub use signature::{
    EMPTY_BODY_SHA256, canonical_string, derive_hmac_key, hash_body, sign_canonical, sign_request,
};
