//! API key and signing key.

use secrecy::{ExposeSecret, SecretString};

use crate::auth::signature::derive_hmac_key;
use crate::error::BrokerError;

/// Default environment variable holding the API key.
pub const API_KEY_ENV: &str = "BROKER_API_KEY";
/// Default environment variable holding the secret key.
pub const SECRET_KEY_ENV: &str = "BROKER_SECRET_KEY";

/// An API key paired with the HMAC key derived from its secret.
///
/// The secret is reduced to `base64url(SHA256(secret))` on construction and
/// is not kept.
#[derive(Clone)]
pub struct Credentials {
    /// Public identifier, sent as `X-API-KEY`.
    pub api_key: String,
    hmac_key: SecretString,
}

impl Credentials {
    /// Derive credentials from an API key and its secret.
    pub fn new(api_key: impl Into<String>, secret: impl AsRef<str>) -> Self {
        Self {
            api_key: api_key.into(),
            hmac_key: SecretString::from(derive_hmac_key(secret.as_ref())),
        }
    }

    /// Like [`new`](Self::new), but rejects an empty key or secret and an
    /// API key that cannot travel in a header.
    pub fn try_new(api_key: impl Into<String>, secret: impl AsRef<str>) -> Result<Self, BrokerError> {
        let api_key = api_key.into();
        if api_key.is_empty() || secret.as_ref().is_empty() {
            return Err(BrokerError::MissingCredentials);
        }
        if api_key.contains(['\r', '\n']) {
            return Err(BrokerError::InvalidInput(
                "API key contains a line break".to_string(),
            ));
        }
        Ok(Self::new(api_key, secret))
    }

    pub(crate) fn hmac_key(&self) -> &str {
        self.hmac_key.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("hmac_key", &"[REDACTED]")
            .finish()
    }
}

/// Source of the credentials a client signs with.
///
/// Implement this to pull keys from a secrets manager.
pub trait CredentialsProvider: Send + Sync {
    /// Credentials for the next signature.
    fn get_credentials(&self) -> &Credentials;
}

impl CredentialsProvider for Credentials {
    fn get_credentials(&self) -> &Credentials {
        self
    }
}

/// Credentials held in memory.
pub type StaticCredentials = Credentials;

/// Credentials read once from the environment.
#[derive(Debug, Clone)]
pub struct EnvCredentials(Credentials);

impl EnvCredentials {
    /// Read `BROKER_API_KEY` and `BROKER_SECRET_KEY`.
    ///
    /// Fails with [`BrokerError::MissingCredentials`] if either is unset or
    /// empty.
    pub fn from_env() -> Result<Self, BrokerError> {
        Self::from_env_vars(API_KEY_ENV, SECRET_KEY_ENV)
    }

    /// Read credentials from custom variable names.
    pub fn from_env_vars(key_var: &str, secret_var: &str) -> Result<Self, BrokerError> {
        let api_key = read_var(key_var)?;
        let secret = read_var(secret_var)?;
        Credentials::try_new(api_key, secret).map(Self)
    }
}

impl CredentialsProvider for EnvCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.0
    }
}

fn read_var(name: &str) -> Result<String, BrokerError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            tracing::debug!(var = name, "credential variable missing or empty");
            Err(BrokerError::MissingCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_key_material() {
        let creds = Credentials::new("my_key", "super_secret");
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("my_key"));
        assert!(!debug_str.contains("super_secret"));
        assert!(!debug_str.contains(&derive_hmac_key("super_secret")));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_hmac_key_derived_once() {
        let creds = Credentials::new("test_key", "test_secret_1");
        assert_eq!(creds.hmac_key(), "ujdPNqnu1MgSWAsTH3bUSUue1CRwKEEdXiy57uL1Gh8=");
    }

    #[test]
    fn test_try_new_rejects_unusable_values() {
        assert!(matches!(
            Credentials::try_new("", "secret"),
            Err(BrokerError::MissingCredentials)
        ));
        assert!(matches!(
            Credentials::try_new("key", ""),
            Err(BrokerError::MissingCredentials)
        ));
        assert!(matches!(
            Credentials::try_new("key\r\nX-Evil: 1", "secret"),
            Err(BrokerError::InvalidInput(_))
        ));
        assert!(Credentials::try_new("key", "secret").is_ok());
    }

    #[test]
    fn test_env_credentials_from_set_vars() {
        // SAFETY: variable names are unique to this test.
        unsafe {
            std::env::set_var("BROKER_TEST_ENV_SET_KEY", "env_key");
            std::env::set_var("BROKER_TEST_ENV_SET_SECRET", "test_secret_1");
        }

        let provider =
            EnvCredentials::from_env_vars("BROKER_TEST_ENV_SET_KEY", "BROKER_TEST_ENV_SET_SECRET")
                .unwrap();
        let creds = provider.get_credentials();
        assert_eq!(creds.api_key, "env_key");
        assert_eq!(creds.hmac_key(), derive_hmac_key("test_secret_1"));
    }

    #[test]
    fn test_env_credentials_missing_or_empty() {
        // SAFETY: variable names are unique to this test.
        unsafe {
            std::env::set_var("BROKER_TEST_ENV_EMPTY_KEY", "");
            std::env::set_var("BROKER_TEST_ENV_EMPTY_SECRET", "s");
        }

        assert!(matches!(
            EnvCredentials::from_env_vars("BROKER_TEST_ENV_EMPTY_KEY", "BROKER_TEST_ENV_EMPTY_SECRET"),
            Err(BrokerError::MissingCredentials)
        ));
        assert!(matches!(
            EnvCredentials::from_env_vars(
                "BROKER_TEST_SURELY_UNSET_KEY",
                "BROKER_TEST_SURELY_UNSET_SECRET"
            ),
            Err(BrokerError::MissingCredentials)
        ));
    }
}
