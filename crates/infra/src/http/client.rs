//! HTTP client with built-in retry and timeout support.
//!
//! Retries are deliberately narrow: only 429 responses are retried. Server
//! errors (5xx) and transport failures surface immediately so the scheduled
//! sweeps decide when to try again, and 4xx responses are final.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use roomsync_domain::constants::{
    RATE_LIMIT_BASE_BACKOFF_MS, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_MAX_JITTER_MS,
};
use roomsync_domain::RoomSyncError;
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client wrapper around reqwest with rate-limit retry.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
    max_jitter: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, RoomSyncError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// A 429 response consumes an attempt and backs off before retrying.
    /// When attempts are exhausted the last 429 is returned to the caller,
    /// which maps it to [`RoomSyncError::RateLimited`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, RoomSyncError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                RoomSyncError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder.build().map_err(|err| {
                let infra: InfraError = err.into();
                RoomSyncError::from(infra)
            })?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status == StatusCode::TOO_MANY_REQUESTS && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");
                    let infra: InfraError = err.into();
                    return Err(RoomSyncError::from(infra));
                }
            }
        }

        Err(RoomSyncError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    /// Exponential backoff: base * 2^(retry-1), plus uniform random jitter.
    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        let jitter_ms = if self.max_jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64)
        };
        self.base_backoff.saturating_mul(multiplier) + Duration::from_millis(jitter_ms)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    max_jitter: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: RATE_LIMIT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(RATE_LIMIT_BASE_BACKOFF_MS),
            max_jitter: Duration::from_millis(RATE_LIMIT_MAX_JITTER_MS),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, RoomSyncError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            RoomSyncError::from(infra)
        })?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
            max_jitter: self.max_jitter,
        })
    }
}
