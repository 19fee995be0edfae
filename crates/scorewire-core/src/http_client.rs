use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Single GET request issued by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        self.with_header("user-agent", user_agent)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("user-agent").map(String::as_str)
    }
}

/// Response returned by a transport. Any status code is a response, never an
/// error; the retry loop decides what a status means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Transport failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Timeout,
    Network,
}

/// Transport-level HTTP error: the request produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

impl HttpError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Network,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Transport contract used by the fetcher.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: HttpRequest) -> HttpFuture<'_>;
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .cookie_store(true)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url).timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timeout(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::network(format!("connection failed: {e}"))
                } else {
                    HttpError::network(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timeout(format!("timed out reading response body: {e}"))
                } else {
                    HttpError::network(format!("failed to read response body: {e}"))
                }
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// Transport that replays a fixed script of outcomes and records every
/// request, for deterministic offline tests. Once the script runs out every
/// call fails with a network error.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(script: impl IntoIterator<Item = Result<HttpResponse, HttpError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .push(request);
        let next = self
            .script
            .lock()
            .expect("scripted client lock is not poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::network("script exhausted")));
        Box::pin(async move { next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_lowercased() {
        let request = HttpRequest::get("https://example.test/tabla")
            .with_header("Accept-Language", "es-AR")
            .with_user_agent("scorewire-test");

        assert_eq!(
            request.headers.get("accept-language").map(String::as_str),
            Some("es-AR")
        );
        assert_eq!(request.user_agent(), Some("scorewire-test"));
        assert_eq!(request.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn scripted_client_replays_then_fails() {
        let client = ScriptedHttpClient::new([Ok(HttpResponse::new(429, ""))]);

        let first = client
            .execute(HttpRequest::get("https://example.test"))
            .await
            .expect("scripted response");
        assert!(first.is_rate_limited());

        let second = client
            .execute(HttpRequest::get("https://example.test"))
            .await
            .expect_err("script is exhausted");
        assert_eq!(second.kind(), HttpErrorKind::Network);
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn reqwest_client_returns_error_statuses_as_responses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tabla")
            .match_header("user-agent", "scorewire-test")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = ReqwestHttpClient::new();
        let response = client
            .execute(
                HttpRequest::get(format!("{}/tabla", server.url()))
                    .with_user_agent("scorewire-test"),
            )
            .await
            .expect("a 503 is still a response");

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "maintenance");
        assert!(!response.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reqwest_client_reports_connection_failures() {
        let client = ReqwestHttpClient::new();
        let error = client
            .execute(
                HttpRequest::get("http://127.0.0.1:9/unreachable")
                    .with_timeout(Duration::from_secs(2)),
            )
            .await
            .expect_err("nothing listens on the discard port");

        assert!(matches!(
            error.kind(),
            HttpErrorKind::Network | HttpErrorKind::Timeout
        ));
    }
}
