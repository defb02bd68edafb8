//! Nonce generation for Broker API authentication.
//!
//! The server rejects any nonce it has already seen for a key inside its
//! acceptance window. Nonces pair a nanosecond timestamp with a 63-bit random
//! component.

use rand::Rng;

/// Largest value of the random component (63 bits, non-negative as a signed 64-bit integer).
const RANDOM_MAX: u64 = i64::MAX as u64;

/// Trait for providing nonces for authenticated requests.
///
/// Returned values are opaque strings and must never repeat for the same
/// credentials while the server still remembers them.
pub trait NonceProvider: Send + Sync {
    /// Generate the next nonce value.
    fn next_nonce(&self) -> String;
}

/// Default nonce provider: `{unix_nanos}_{random}`.
///
/// The random part is drawn from the thread-local CSPRNG, giving 63 bits of
/// entropy per nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl RandomNonce {
    /// Create a new random nonce provider.
    pub fn new() -> Self {
        Self
    }
}

impl NonceProvider for RandomNonce {
    fn next_nonce(&self) -> String {
        generate_nonce()
    }
}

/// Generate a nonce with the default format.
pub fn generate_nonce() -> String {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let random: u64 = rand::thread_rng().gen_range(0..=RANDOM_MAX);
    format!("{nanos}_{random}")
}
