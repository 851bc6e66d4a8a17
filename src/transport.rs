//! One network attempt against one origin.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::error::{Error, Result};
use crate::network::Origin;

/// A fully resolved request for a single origin.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub origin: Origin,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

enum Body {
    Pending(reqwest::Response),
    Ready(String),
}

/// An origin answered. The body may still be on the wire.
pub struct RawResponse {
    pub origin: Origin,
    pub status: StatusCode,
    pub url: String,
    body: Body,
}

impl RawResponse {
    pub fn from_reqwest(origin: Origin, response: reqwest::Response) -> Self {
        RawResponse {
            origin,
            status: response.status(),
            url: response.url().to_string(),
            body: Body::Pending(response),
        }
    }

    /// A response whose body is already in memory.
    pub fn buffered(origin: Origin, status: StatusCode, url: impl Into<String>, body: impl Into<String>) -> Self {
        RawResponse {
            origin,
            status,
            url: url.into(),
            body: Body::Ready(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub async fn text(self) -> Result<String> {
        match self.body {
            Body::Ready(s) => Ok(s),
            Body::Pending(r) => r.text().await.map_err(|e| Error::Body(e.to_string())),
        }
    }
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("origin", &self.origin)
            .field("status", &self.status)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolves once response headers arrive. Any status counts as an answer.
    async fn send(&self, attempt: Attempt) -> Result<RawResponse>;
}

/// Longest silence tolerated between two reads of a response body.
pub const BODY_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed transport. Attempt deadlines are applied by the caller; the
/// client itself only bounds stalled reads.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_read_timeout(BODY_READ_TIMEOUT)
    }

    pub fn with_read_timeout(read_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        ReqwestTransport { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, attempt: Attempt) -> Result<RawResponse> {
        let mut req = self
            .http
            .request(attempt.method, &attempt.url)
            .headers(attempt.headers);
        if let Some(body) = attempt.body {
            req = req.body(body);
        }
        let response = req.send().await?;
        Ok(RawResponse::from_reqwest(attempt.origin, response))
    }
}
