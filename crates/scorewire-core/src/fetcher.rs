//! Retrying GET primitive used by source adapters.
//!
//! Every attempt sleeps a random jitter first, goes out under a user-agent
//! drawn at random from a fixed pool, and carries its own timeout. Failed
//! attempts (429, other non-2xx, timeout, network) wait
//! `min(30s, 2^attempt * 1s)` before the next one until the attempt budget
//! is spent.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};
use crate::retry::RetryConfig;

/// Browser identities rotated across attempts.
pub const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Why the last attempt of a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    HttpStatus(u16),
    Network,
    /// The body arrived but could not be decoded. Never retried.
    Decode,
}

impl Display for FetchErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::HttpStatus(status) => write!(f, "HTTP {status}"),
            Self::Network => f.write_str("network error"),
            Self::Decode => f.write_str("decode error"),
        }
    }
}

/// Fetch failure surfaced after the retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("GET {url} failed after {attempts} attempt(s): {kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub attempts: u32,
    pub last_status: Option<u16>,
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.kind, FetchErrorKind::HttpStatus(429))
    }
}

/// Process-wide fetch defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| (*ua).to_owned()).collect(),
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.user_agents = user_agents;
        self
    }
}

/// Per-call overrides of [`FetchConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub headers: BTreeMap<String, String>,
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Outcome of one attempt that did not yield a 2xx body.
struct AttemptFailure {
    kind: FetchErrorKind,
    status: Option<u16>,
    message: String,
}

impl From<HttpResponse> for AttemptFailure {
    fn from(response: HttpResponse) -> Self {
        Self {
            kind: FetchErrorKind::HttpStatus(response.status),
            status: Some(response.status),
            message: format!("unexpected status {}", response.status),
        }
    }
}

impl From<HttpError> for AttemptFailure {
    fn from(error: HttpError) -> Self {
        let kind = match error.kind() {
            HttpErrorKind::Timeout => FetchErrorKind::Timeout,
            HttpErrorKind::Network => FetchErrorKind::Network,
        };
        Self {
            kind,
            status: None,
            message: error.message().to_owned(),
        }
    }
}

/// Retrying HTTP GET with identity rotation.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    config: FetchConfig,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(SystemClock),
            FetchConfig::default(),
        )
    }
}

impl Fetcher {
    pub fn new(client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, config: FetchConfig) -> Self {
        Self {
            client,
            clock,
            config,
        }
    }

    /// Real transport and clock with the given defaults.
    pub fn with_config(config: FetchConfig) -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_with(url, &FetchOptions::default()).await
    }

    pub async fn fetch_with(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        self.fetch_counted(url, options).await.map(|(body, _)| body)
    }

    /// Fetches and deserializes a JSON body. A body that does not decode is
    /// not retried; the error reports the attempt that delivered it.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let (body, attempts) = self.fetch_counted(url, &FetchOptions::default()).await?;
        serde_json::from_str(&body).map_err(|error| FetchError {
            kind: FetchErrorKind::Decode,
            attempts,
            last_status: None,
            url: url.to_owned(),
            message: error.to_string(),
        })
    }

    /// Retry loop; on success also returns how many attempts it took.
    async fn fetch_counted(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<(String, u32), FetchError> {
        let retry = match options.max_retries {
            Some(max_retries) => RetryConfig {
                max_retries,
                ..self.config.retry.clone()
            },
            None => self.config.retry.clone(),
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if !retry.jitter.is_disabled() {
                self.clock.sleep(retry.jitter.sample()).await;
            }

            let mut request = HttpRequest::get(url).with_timeout(timeout);
            for (name, value) in &options.headers {
                request = request.with_header(name.as_str(), value.as_str());
            }
            if let Some(user_agent) = self.pick_user_agent() {
                request = request.with_user_agent(user_agent);
            }

            debug!(url, attempt, "fetch attempt");
            let failure = match self.client.execute(request).await {
                Ok(response) if response.is_success() => {
                    debug!(url, attempt, status = response.status, "fetch succeeded");
                    return Ok((response.body, attempt));
                }
                Ok(response) => AttemptFailure::from(response),
                Err(error) => AttemptFailure::from(error),
            };

            if !retry.allows_another(attempt) {
                warn!(url, attempts = attempt, kind = %failure.kind, "fetch gave up");
                return Err(FetchError {
                    kind: failure.kind,
                    attempts: attempt,
                    last_status: failure.status,
                    url: url.to_owned(),
                    message: failure.message,
                });
            }

            let delay = retry.delay_for_attempt(attempt);
            if failure.status == Some(429) {
                warn!(url, attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
            } else {
                warn!(
                    url,
                    attempt,
                    kind = %failure.kind,
                    delay_ms = delay.as_millis() as u64,
                    "fetch attempt failed, backing off"
                );
            }
            self.clock.sleep(delay).await;
        }
    }

    fn pick_user_agent(&self) -> Option<&str> {
        if self.config.user_agents.is_empty() {
            return None;
        }
        let index = fastrand::usize(..self.config.user_agents.len());
        Some(self.config.user_agents[index].as_str())
    }
}
