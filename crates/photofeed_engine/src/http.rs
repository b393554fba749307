//! HTTP envelope.
//!
//! The actual HTTP client is abstracted via [`HttpClient`] so the engine can
//! run against reqwest, a test double, or anything else that moves bytes.
//! [`HttpEnvelope`] sits on top and turns raw exchanges into typed results:
//! transport failures, non-2xx statuses and undecodable bodies each map to
//! their own [`FeedError`] variant.

use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Upper bound on the body preview kept for decode diagnostics.
const MAX_LOG_BODY_CHARS: usize = 512;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request. Bodies are never sent; the API is query-driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a request without headers.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds `Authorization: Bearer {credential}`.
    pub fn with_bearer(self, credential: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {credential}"))
    }

    /// Returns the first header value with the given name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of a query parameter.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// A raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for statuses in `200..300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations report only transport-level failures as `Err`; any
/// response the server produced, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs one request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Typed wrapper around an [`HttpClient`].
#[derive(Clone)]
pub struct HttpEnvelope {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl HttpEnvelope {
    /// Creates an envelope applying `timeout` to every request.
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends a request and returns the body of a 2xx response.
    pub async fn send(&self, request: HttpRequest) -> FeedResult<Vec<u8>> {
        let method = request.method;
        // Query strings may carry client secrets or codes; log the path only.
        let path = request.url.path().to_owned();
        debug!(%method, %path, "sending request");

        let response = match tokio::time::timeout(self.timeout, self.client.execute(request)).await
        {
            Err(_) => {
                warn!(%method, %path, timeout = ?self.timeout, "request timed out");
                return Err(FeedError::transport(format!(
                    "request timed out after {:?}",
                    self.timeout
                )));
            }
            Ok(Err(cause)) => {
                warn!(%method, %path, %cause, "transport failure");
                return Err(FeedError::Transport(cause));
            }
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            warn!(%method, %path, status = response.status, "unexpected status");
            return Err(FeedError::Status(response.status));
        }
        Ok(response.body)
    }

    /// Sends a request and decodes the JSON body into `T`.
    pub async fn send_typed<T: DeserializeOwned>(&self, request: HttpRequest) -> FeedResult<T> {
        let body = self.send(request).await?;
        decode_body(&body)
    }
}

/// Decodes a body, keeping a preview of it in the error.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> FeedResult<T> {
    photofeed_protocol::decode_json(body).map_err(|err| {
        let body_preview = preview(body);
        warn!(error = %err, body = %body_preview, "failed to decode response");
        FeedError::Decode {
            message: err.to_string(),
            body_preview,
        }
    })
}

fn preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(MAX_LOG_BODY_CHARS)
        .collect()
}

/// [`HttpClient`] backed by `reqwest`.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestClient {
    /// Creates a client with a crate-specific user agent.
    pub fn new() -> FeedResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("photofeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::config(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
