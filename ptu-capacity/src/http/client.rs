//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default timeout for a single HTTP request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("ptu-capacity/", env!("CARGO_PKG_VERSION"));

/// HTTP methods used against the management and storage endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a PUT request carrying `body`.
    pub fn put(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Adds a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an `Authorization: Bearer` header.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level HTTP failures.
///
/// Non-2xx responses are not errors at this layer; callers inspect
/// [`HttpResponse::status`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HttpError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl HttpError {
    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. })
    }
}

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Sends a request and buffers the full response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn classify(url: &str, error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        HttpError::Connect {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        HttpError::Request {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Put => self.client.put(&url),
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&url, e))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
