//! WebSocket client implementation.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CredentialsProvider, NonceProvider, RandomNonce};
use crate::error::BrokerError;
use crate::rest::BROKER_BASE_URL;
use crate::ws::messages::AUTH_PATH;
use crate::ws::session::WsSession;

/// Derive the stream URL from a REST base URL.
///
/// `https://` becomes `wss://`, `http://` becomes `ws://`, and the stream
/// path is appended.
pub fn ws_url_from_base(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{AUTH_PATH}")
}

/// Reconnection backoff policy.
///
/// The delay before attempt `n` (1-based) is
/// `initial_delay * multiplier^(n - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Growth factor between attempts.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Maximum number of attempts (None = infinite).
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait before the given attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay.min(self.max_delay);
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.initial_delay.as_secs_f64() * factor;
        let max = self.max_delay.as_secs_f64();
        if secs.is_finite() && secs < max {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }

    /// Whether the given attempt is within the attempt budget.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Configuration for WebSocket sessions.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Reconnection backoff.
    pub backoff: BackoffPolicy,
    /// How long to wait for the auth response.
    pub auth_timeout: Duration,
    /// How long to wait for the transport to open.
    pub connect_timeout: Duration,
    /// How long a signed operation waits for its response.
    pub request_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            auth_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl WsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::new()
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug, Clone, Default)]
pub struct WsConfigBuilder {
    config: WsConfig,
}

impl WsConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WsConfig::default(),
        }
    }

    /// Replace the whole backoff policy.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Set the reconnection backoff bounds.
    pub fn reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.backoff.initial_delay = initial;
        self.config.backoff.max_delay = max;
        self
    }

    /// Set maximum reconnection attempts.
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.backoff.max_attempts = Some(attempts);
        self
    }

    /// Set the authentication timeout.
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.config.auth_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-operation response timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> WsConfig {
        self.config
    }
}

/// Broker WebSocket client.
///
/// Holds what a session needs to connect; each [`connect`](Self::connect)
/// opens an independent, authenticated [`WsSession`].
#[derive(Clone)]
pub struct BrokerWsClient {
    url: String,
    credentials: Arc<dyn CredentialsProvider>,
    nonce_provider: Arc<dyn NonceProvider>,
    config: WsConfig,
}

impl BrokerWsClient {
    /// Create a client for the default endpoint.
    pub fn new(credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            url: ws_url_from_base(BROKER_BASE_URL),
            credentials,
            nonce_provider: Arc::new(RandomNonce::new()),
            config: WsConfig::default(),
        }
    }

    /// Use a custom stream URL (useful for testing).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Use a custom configuration.
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom nonce provider.
    pub fn with_nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = provider;
        self
    }

    /// Get the stream URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the configuration.
    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Connect and authenticate.
    ///
    /// Fails if the transport cannot be opened or the server rejects (or does
    /// not answer) the auth frame in time. Once this returns, the session
    /// reconnects on its own.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use broker_api_client::auth::StaticCredentials;
    /// use broker_api_client::ws::{BrokerWsClient, channels};
    /// use std::sync::Arc;
    ///
    /// let credentials = Arc::new(StaticCredentials::new("api_key", "secret_key"));
    /// let session = BrokerWsClient::new(credentials).connect().await?;
    ///
    /// session
    ///     .subscribe(channels::BALANCES, |msg| println!("{}: {}", msg.channel, msg.data))
    ///     .await?;
    ///
    /// let balances = session.balances().await?;
    /// ```
    pub async fn connect(&self) -> Result<WsSession, BrokerError> {
        let url = url::Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(BrokerError::InvalidInput(format!(
                "unsupported WebSocket scheme: {}",
                url.scheme()
            )));
        }

        WsSession::connect(
            self.url.clone(),
            self.credentials.clone(),
            self.nonce_provider.clone(),
            self.config.clone(),
        )
        .await
    }
}

impl std::fmt::Debug for BrokerWsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerWsClient")
            .field("url", &self.url)
            .field("config", &self.config)
            .finish()
    }
}
