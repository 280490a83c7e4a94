//! HTTP client with retry and rate limiting
//!
//! The reqwest-backed [`RequestExecutor`]. It owns everything the core
//! deliberately does not: retries with backoff, rate limiting, default
//! headers, and classification of non-2xx statuses into typed errors.

use super::executor::{ApiRequest, ApiResponse, RequestExecutor};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// How failed requests are retried
///
/// Applies to 429, 5xx, timeouts and connection failures. Listing and queue
/// calls are safe to resend: a repeated page fetch or claim read changes
/// nothing on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` sends each request once
    pub max_retries: u32,
    pub backoff: BackoffType,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for any single delay, including a provider's `Retry-After`
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffType::Exponential,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Send every request exactly once
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.initial_delay,
            BackoffType::Linear => self.initial_delay * (attempt + 1),
            BackoffType::Exponential => self.initial_delay * 2u32.saturating_pow(attempt),
        };
        delay.min(self.max_delay)
    }

    fn validate(&self) -> Result<()> {
        if self.initial_delay > self.max_delay {
            return Err(Error::config(format!(
                "initial backoff {:?} exceeds max backoff {:?}",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

/// Settings for talking to one provider endpoint
///
/// Service and queue clients are built from one of these. Paths passed to
/// the executor are joined onto `base_url`; absolute URLs (such as a
/// provider's `next` link) are used as they are.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Provider endpoint, e.g. `https://queues.example.com`
    pub base_url: Option<String>,
    /// Per-request timeout unless the request sets its own
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Client-side throttle; `None` sends as fast as the caller asks
    pub rate_limit: Option<RateLimiterConfig>,
    /// Sent with every request, e.g. `X-Auth-Token` or `X-Project-Id`
    pub default_headers: HashMap<String, String>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("nimbus/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            url::Url::parse(base)?;
        }
        self.retry.validate()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Backoff curve and its bounds
    pub fn backoff(mut self, backoff: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry.backoff = backoff;
        self.config.retry.initial_delay = initial;
        self.config.retry.max_delay = max;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Throttle to `requests_per_second`, allowing `burst` back to back
    pub fn rate_limit(mut self, requests_per_second: u32, burst: u32) -> Self {
        self.config.rate_limit = Some(RateLimiterConfig::new(requests_per_second, burst));
        self
    }

    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Send `key: value` with every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        self.config.retry.delay(attempt)
    }

    fn build_request(&self, request: &ApiRequest, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(request.method.into(), url)
            .timeout(timeout);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }
        req
    }
}

#[async_trait]
impl RequestExecutor for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.build_url(&request.path);
        let max_retries = request.max_retries.unwrap_or(self.config.retry.max_retries);
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            match self.build_request(&request, &url, timeout).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        debug!("{} {} -> {}", request.method, url, status.as_u16());
                        return into_api_response(response).await;
                    }

                    if is_retryable_status(status) && attempt < max_retries {
                        let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                            retry_after(&response)
                                .map_or_else(|| self.calculate_backoff(attempt), Duration::from_secs)
                                .min(self.config.retry.max_delay)
                        } else {
                            self.calculate_backoff(attempt)
                        };
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let retry_after = retry_after(&response);
                    let body = response.text().await.unwrap_or_default();
                    debug!("{} {} -> {}", request.method, url, status.as_u16());
                    return Err(classify(status, &request, body, retry_after));
                }
                Err(e) => {
                    if e.is_timeout() {
                        let timeout_ms = timeout.as_millis() as u64;
                        if attempt < max_retries {
                            let delay = self.calculate_backoff(attempt);
                            warn!(
                                "Request timeout, attempt {}/{}, retrying in {:?}",
                                attempt + 1,
                                max_retries + 1,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            last_error = Some(Error::Timeout { timeout_ms });
                            continue;
                        }
                        return Err(Error::Timeout { timeout_ms });
                    }

                    if e.is_connect() && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Connection error, attempt {}/{}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::Http(e));
                        continue;
                    }

                    return Err(Error::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a non-2xx status into a typed error
fn classify(status: StatusCode, request: &ApiRequest, body: String, retry_after: Option<u64>) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::not_found(format!("{} {}", request.method, request.path));
    }
    Error::from_status(status.as_u16(), body, retry_after)
}

async fn into_api_response(response: Response) -> Result<ApiResponse> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    let body = response.text().await?;

    Ok(ApiResponse {
        status,
        headers,
        body,
    })
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Extract retry-after header value
fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}
