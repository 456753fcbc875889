//! Error taxonomy and failure classification for the request pipeline.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use thiserror::Error;

use super::signal::CancelSignal;
use super::types::{HttpResponse, RequestSpec};

/// Failure raised by [`Pipeline::execute`](super::Pipeline::execute).
///
/// Exactly one kind is ever set, and an error of this type passing back
/// through any stage is re-raised unchanged; classification never wraps a
/// `PipelineError` in another one.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport-level failure with no usable response.
    #[error("network error for {method} {url}: {cause}")]
    Network {
        method: Method,
        url: String,
        cause: anyhow::Error,
    },

    /// The exchange completed but the server answered outside 2xx.
    #[error("{method} {url} returned HTTP {status}")]
    HttpStatus {
        method: Method,
        url: String,
        status: StatusCode,
        /// Best-effort body text; `None` when the body was empty.
        body: Option<String>,
    },

    /// The attempt's cancellation signal fired before a response arrived.
    #[error("{method} {url} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        method: Method,
        url: String,
        /// The window that was configured for the attempt.
        timeout: Duration,
    },

    /// The caller or one of its hooks violated the pipeline contract.
    #[error("configuration error for {method} {url}: {message}")]
    Configuration {
        method: Method,
        url: String,
        message: String,
    },
}

/// Discriminant of a [`PipelineError`], for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    Network,
    HttpStatus,
    Timeout,
    Configuration,
}

impl PipelineError {
    pub fn network(spec: &RequestSpec, cause: anyhow::Error) -> Self {
        Self::Network {
            method: spec.method.clone(),
            url: spec.url.clone(),
            cause,
        }
    }

    /// Status-check failure. The body is captured best-effort from the
    /// already-buffered snapshot, so capture can never mask the status.
    pub fn http_status(spec: &RequestSpec, response: &HttpResponse) -> Self {
        let text = response.body_text();
        Self::HttpStatus {
            method: spec.method.clone(),
            url: spec.url.clone(),
            status: response.status,
            body: if text.is_empty() { None } else { Some(text) },
        }
    }

    pub fn timeout(spec: &RequestSpec, timeout: Duration) -> Self {
        Self::Timeout {
            method: spec.method.clone(),
            url: spec.url.clone(),
            timeout,
        }
    }

    pub fn configuration(spec: &RequestSpec, message: impl Into<String>) -> Self {
        Self::Configuration {
            method: spec.method.clone(),
            url: spec.url.clone(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::Network { .. } => PipelineErrorKind::Network,
            Self::HttpStatus { .. } => PipelineErrorKind::HttpStatus,
            Self::Timeout { .. } => PipelineErrorKind::Timeout,
            Self::Configuration { .. } => PipelineErrorKind::Configuration,
        }
    }

    /// HTTP status carried by the error, when one exists.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Classify a transport failure.
///
/// A failure that already is a [`PipelineError`] is returned unchanged. For
/// anything else the attempt signal's own state decides between `Timeout`
/// and `Network`; message text never does, because an aborted exchange is
/// indistinguishable from a refused one at the transport layer.
pub fn classify(
    error: anyhow::Error,
    spec: &RequestSpec,
    signal: &CancelSignal,
    timeout: Duration,
) -> PipelineError {
    match error.downcast::<PipelineError>() {
        Ok(existing) => existing,
        Err(error) => {
            if signal.is_cancelled() {
                PipelineError::timeout(spec, timeout)
            } else {
                PipelineError::network(spec, error)
            }
        }
    }
}

/// Classify a transform-hook failure. Cancellation of a hook is observed by
/// the attempt race itself, so a non-pipeline failure here is a network
/// error.
pub fn classify_hook(error: anyhow::Error, spec: &RequestSpec) -> PipelineError {
    match error.downcast::<PipelineError>() {
        Ok(existing) => existing,
        Err(error) => PipelineError::network(spec, error),
    }
}
