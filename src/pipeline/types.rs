//! Request descriptors and buffered response snapshots.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::signal::CancelSignal;

/// Hook that replaces a response with a derived one between the transport
/// call and the status check.
///
/// Hooks are async; a synchronous hook returns a ready future. An error that
/// already is a [`PipelineError`](super::PipelineError) passes through
/// classification unchanged, anything else surfaces as a network failure.
pub type TransformHook =
    Arc<dyn Fn(HttpResponse) -> BoxFuture<'static, anyhow::Result<HttpResponse>> + Send + Sync>;

/// Description of a single HTTP exchange.
///
/// Descriptors are immutable once handed to the pipeline; the `with_*`
/// builders consume and return a new value, and no stage mutates one in
/// place.
#[derive(Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Per-call timeout, overriding the pipeline default.
    pub timeout: Option<Duration>,
    /// Caller-supplied cancellation, merged with the attempt's timeout.
    pub signal: Option<CancelSignal>,
    pub transform: Option<TransformHook>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
            signal: None,
            transform: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_transform(mut self, hook: TransformHook) -> Self {
        self.transform = Some(hook);
        self
    }

    /// Only GET exchanges are served from and stored to the response cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .field("transform", &self.transform.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// Fully buffered response snapshot.
///
/// The body is [`Bytes`], so clones share one underlying buffer: the cache
/// keeps a snapshot and the caller decodes another without either consuming
/// the other's read.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Best-effort text rendering of the body.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
