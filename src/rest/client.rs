//! Broker REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;

use crate::auth::{
    CredentialsProvider, HEADER_IDEMPOTENCY_KEY, NonceProvider, RandomNonce, SignedRequest,
};
use crate::error::{ApiError, BrokerError};
use crate::rest::endpoints::{self, BROKER_BASE_URL};
use crate::rest::traits::BrokerClient;
use crate::rest::types::{
    BalancesResponse, EstimateRequest, EstimateResponse, OrderStatusQuery, OrderStatusResponse,
    SwapRequest, SwapResponse,
};

/// Generate a fresh idempotency key for [`BrokerRestClient::swap`].
///
/// Reuse the same key when retrying the same swap; the server executes a
/// given key at most once.
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The Broker REST API client.
///
/// All endpoints are private: every request is signed with the configured
/// credentials and a fresh nonce.
///
/// # Example
///
/// ```rust,no_run
/// use broker_api_client::auth::StaticCredentials;
/// use broker_api_client::rest::BrokerRestClient;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(StaticCredentials::new("api_key", "secret_key"));
///     let client = BrokerRestClient::builder()
///         .credentials(credentials)
///         .build();
///
///     let balances = client.get_balances().await?;
///     println!("Balances: {:?}", balances);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BrokerRestClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    nonce_provider: Arc<dyn NonceProvider>,
}

impl BrokerRestClient {
    /// Create a new client builder.
    pub fn builder() -> BrokerRestClientBuilder {
        BrokerRestClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get account balances.
    pub async fn get_balances(&self) -> Result<BalancesResponse, BrokerError> {
        self.private_request::<_, ()>(Method::GET, endpoints::BALANCES, None, None)
            .await
    }

    /// Get a swap estimate.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use broker_api_client::auth::StaticCredentials;
    /// use broker_api_client::rest::{BrokerRestClient, EstimateRequest};
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let credentials = Arc::new(StaticCredentials::new("key", "secret"));
    ///     let client = BrokerRestClient::builder().credentials(credentials).build();
    ///
    ///     let request = EstimateRequest::new("USDT", "BTC", "10".parse()?);
    ///     let estimate = client.estimate_swap(&request).await?;
    ///     println!("Expected out: {}", estimate.expected_out);
    ///     Ok(())
    /// }
    /// ```
    pub async fn estimate_swap(
        &self,
        request: &EstimateRequest,
    ) -> Result<EstimateResponse, BrokerError> {
        self.private_request(Method::POST, endpoints::ESTIMATE, Some(request), None)
            .await
    }

    /// Execute a swap.
    ///
    /// `idempotency_key` is sent as `Idempotency-Key`; retrying with the same
    /// key is the only protection against executing the swap twice.
    pub async fn swap(
        &self,
        request: &SwapRequest,
        idempotency_key: &str,
    ) -> Result<SwapResponse, BrokerError> {
        if idempotency_key.is_empty() {
            return Err(BrokerError::InvalidInput(
                "idempotency key must not be empty".to_string(),
            ));
        }
        self.private_request(
            Method::POST,
            endpoints::SWAP,
            Some(request),
            Some(idempotency_key),
        )
        .await
    }

    /// Get the status of an order.
    pub async fn get_order_status(
        &self,
        order_id: &str,
        client_order_id: Option<&str>,
    ) -> Result<OrderStatusResponse, BrokerError> {
        if order_id.is_empty()
            || order_id.contains(|c: char| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Err(BrokerError::InvalidInput(format!(
                "invalid order id: {order_id:?}"
            )));
        }

        let mut path = endpoints::order_status(order_id);
        let query = serde_urlencoded::to_string(OrderStatusQuery { client_order_id })
            .map_err(|e| BrokerError::InvalidInput(e.to_string()))?;
        if !query.is_empty() {
            path = format!("{path}?{query}");
        }

        self.private_request::<_, ()>(Method::GET, &path, None, None)
            .await
    }

    /// Make a signed request and parse the typed response.
    pub(crate) async fn private_request<T, B>(
        &self,
        method: Method,
        path_with_query: &str,
        body: Option<&B>,
        idempotency_key: Option<&str>,
    ) -> Result<T, BrokerError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        // Serialize once: these bytes are both hashed and transmitted.
        let body = body.map(serde_json::to_vec).transpose()?;
        let (status, text) = self
            .send_signed(method, path_with_query, body, idempotency_key)
            .await?;
        parse_response(status, &text)
    }

    /// Send a signed request and return the raw status and body.
    ///
    /// Use this for endpoints this client has no typed wrapper for. `body`
    /// must already be serialized; it is sent unchanged.
    pub async fn send_signed(
        &self,
        method: Method,
        path_with_query: &str,
        body: Option<Vec<u8>>,
        idempotency_key: Option<&str>,
    ) -> Result<(StatusCode, String), BrokerError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(BrokerError::MissingCredentials)?;
        let creds = credentials.get_credentials();

        let signed = SignedRequest::new(
            creds,
            self.nonce_provider.as_ref(),
            method.as_str(),
            path_with_query,
            body,
        )?;

        tracing::debug!(
            method = %signed.method,
            path = %signed.path_with_query,
            timestamp = signed.timestamp_ms,
            body_sha256 = %signed.body_sha256,
            "sending signed request"
        );

        let url = format!("{}{}", self.base_url, path_with_query);
        let mut request = self
            .http_client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in signed.headers(creds) {
            request = request.header(name, value);
        }
        if let Some(key) = idempotency_key {
            request = request.header(HEADER_IDEMPOTENCY_KEY, key);
        }
        if !signed.body.is_empty() {
            request = request.body(signed.body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "request failed");
        }

        Ok((status, text))
    }
}

/// Map a raw response onto a typed result or a [`BrokerError`].
///
/// A structured `{code, message, request_id}` body wins over the HTTP status,
/// so callers can branch on `code`.
fn parse_response<T>(status: StatusCode, body: &str) -> Result<T, BrokerError>
where
    T: serde::de::DeserializeOwned,
{
    if let Some(api_error) = ApiError::from_body(body) {
        return Err(BrokerError::Api(api_error.with_status(status.as_u16())));
    }

    if !status.is_success() {
        return Err(BrokerError::HttpStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        BrokerError::InvalidResponse(format!("Failed to parse response: {}. Body: {}", e, body))
    })
}

impl std::fmt::Debug for BrokerRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerRestClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

/// Builder for [`BrokerRestClient`].
pub struct BrokerRestClientBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    nonce_provider: Option<Arc<dyn NonceProvider>>,
    user_agent: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl BrokerRestClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: BROKER_BASE_URL.to_string(),
            credentials: None,
            nonce_provider: None,
            user_agent: None,
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the credentials provider for authenticated requests.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set a custom nonce provider.
    pub fn nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = Some(provider);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient transport failures.
    ///
    /// Defaults to 0. A retried request reuses its nonce, which the server
    /// may reject as a replay; prefer retrying at the call site with a new
    /// signature (and the same idempotency key for swaps).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the client.
    pub fn build(self) -> BrokerRestClient {
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("broker-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("broker-api-client"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.max_retries);

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let nonce_provider = self
            .nonce_provider
            .unwrap_or_else(|| Arc::new(RandomNonce::new()));

        BrokerRestClient {
            http_client: client,
            base_url: self.base_url,
            credentials: self.credentials,
            nonce_provider,
        }
    }
}

impl Default for BrokerRestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerClient for BrokerRestClient {
    async fn get_balances(&self) -> Result<BalancesResponse, BrokerError> {
        BrokerRestClient::get_balances(self).await
    }

    async fn estimate_swap(
        &self,
        request: &EstimateRequest,
    ) -> Result<EstimateResponse, BrokerError> {
        BrokerRestClient::estimate_swap(self, request).await
    }

    async fn swap(
        &self,
        request: &SwapRequest,
        idempotency_key: &str,
    ) -> Result<SwapResponse, BrokerError> {
        BrokerRestClient::swap(self, request, idempotency_key).await
    }

    async fn get_order_status(
        &self,
        order_id: &str,
        client_order_id: Option<&str>,
    ) -> Result<OrderStatusResponse, BrokerError> {
        BrokerRestClient::get_order_status(self, order_id, client_order_id).await
    }
}
