//! HTTP client for the recipechat backend REST API.
//!
//! Handles timeouts, bearer authentication, exponential backoff retry,
//! and mapping of HTTP failures onto [`RcError`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use rc_core::config::{AppConfig, ServerConfig};
use rc_core::constants;
use rc_core::error::{RcError, RcResult};

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

/// HTTP client for the recipechat backend.
///
/// Wraps reqwest::Client with base-address handling, retry logic and
/// error classification. Endpoint methods live in [`crate::endpoints`].
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Backend origin, e.g. "http://localhost:8080".
    base_url: String,
    /// Path of the chat history endpoint.
    history_path: String,
    /// Default request timeout.
    timeout: Duration,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new ApiClient from server configuration.
    pub fn new(config: &ServerConfig) -> RcResult<Self> {
        let base_url = AppConfig::sanitize_server_address(&config.address);
        if base_url.is_empty() {
            return Err(RcError::MissingConfig("server address".into()));
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30));

        // Handle self-signed certificates
        if config.accept_self_signed_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let inner = builder
            .build()
            .map_err(|e| RcError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url,
            history_path: constants::CHAT_HISTORY_PATH.to_string(),
            timeout: Duration::from_millis(config.api_timeout_ms),
            retry_config: RetryConfig::default(),
        })
    }

    /// Create a client from the full application configuration.
    pub fn from_config(config: &AppConfig) -> RcResult<Self> {
        Ok(Self::new(&config.server)?.with_history_path(&config.chat.history_path))
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Override the chat history endpoint path.
    pub fn with_history_path(mut self, path: &str) -> Self {
        self.history_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self
    }

    /// Get the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn history_path(&self) -> &str {
        &self.history_path
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Internal: build a request for the given method, URL, optional bearer
    /// token and optional JSON body.
    fn build_request(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(self.timeout);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
    }

    /// Execute a request with exponential backoff retry.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> RcResult<Response> {
        let url = self.url(path);
        debug!("{} {}", method, path);

        let mut last_error: Option<RcError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self.build_request(method.clone(), &url, bearer, body);

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    // Check if this status code is retryable
                    if self
                        .retry_config
                        .retryable_statuses
                        .contains(&status.as_u16())
                        && attempt < self.retry_config.max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), path);
                        last_error = Some(RcError::ServerError {
                            status: status.as_u16(),
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }

                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    let err = Self::classify_error(e);

                    if is_retryable && attempt < self.retry_config.max_retries {
                        warn!("retryable error on {}: {}", path, err);
                        last_error = Some(err);
                        continue;
                    }

                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RcError::Http("max retries exceeded".into())))
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(31));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- Public HTTP methods ---

    /// Execute a GET request with automatic retry.
    pub async fn get(&self, path: &str, bearer: Option<&str>) -> RcResult<Response> {
        self.request_with_retry(Method::GET, path, bearer, None).await
    }

    /// Execute a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> RcResult<Response> {
        self.request_with_retry(Method::POST, path, None, Some(body))
            .await
    }

    /// Deserialize a JSON response body.
    pub async fn parse_json<T: DeserializeOwned>(response: Response) -> RcResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| RcError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Convenience: GET + parse.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> RcResult<T> {
        let resp = self.get(path, bearer).await?;
        Self::parse_json(resp).await
    }

    /// Convenience: POST + parse.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RcResult<T> {
        let resp = self.post(path, body).await?;
        Self::parse_json(resp).await
    }

    /// Check the HTTP status code and convert to RcError if needed.
    async fn check_status(response: Response) -> RcResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RcError::AuthFailed(format!("server returned {status}")));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RcError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    /// Classify a reqwest error into an RcError variant.
    fn classify_error(e: reqwest::Error) -> RcError {
        if e.is_timeout() {
            RcError::Timeout(e.to_string())
        } else if e.is_connect() {
            RcError::Http(format!("connection failed: {e}"))
        } else {
            RcError::Http(e.to_string())
        }
    }
}
