//! API error types for the JIRA client.

use serde_json::Value;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Errors that can occur when interacting with the JIRA API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed - invalid email or API token.
    #[error("Authentication failed: check your email and API token")]
    Unauthorized,

    /// Permission denied - user lacks access to the resource.
    #[error("Permission denied: you don't have access to this resource")]
    Forbidden,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The request was rejected as invalid.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Conflict error - the resource was modified by another request.
    #[error("Conflict: the resource was modified concurrently. Please refresh and try again")]
    Conflict,

    /// Rate limited by the JIRA API.
    #[error("Rate limited: please wait before retrying")]
    RateLimited,

    /// JIRA server error.
    #[error("JIRA server error: {0}")]
    ServerError(String),

    /// Any other non-success status.
    #[error("Unexpected HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid response from the API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Connection validation failed.
    #[error("Connection validation failed: {0}")]
    ConnectionFailed(String),

    /// Client configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure below the API layer: network, timeout or pipeline contract.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code.
    ///
    /// `body` is the error payload JIRA answered with, when there was one;
    /// its `errorMessages` and `errors` entries become the error detail.
    /// `context` names the resource for messages that need one.
    pub fn from_status(status: reqwest::StatusCode, body: Option<&str>, context: &str) -> Self {
        let detail = body.and_then(extract_error_messages);
        match status.as_u16() {
            400 => ApiError::Validation(detail.unwrap_or_else(|| "invalid request".to_string())),
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(context.to_string()),
            409 => ApiError::Conflict,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(format!(
                "HTTP {}: {}",
                status,
                detail.unwrap_or_else(|| context.to_string())
            )),
            code => ApiError::Api {
                status: code,
                message: detail.unwrap_or_else(|| context.to_string()),
            },
        }
    }

    /// Lift a pipeline failure into the API taxonomy.
    ///
    /// HTTP status failures are mapped by their code and error payload;
    /// everything else passes through unchanged.
    pub fn from_pipeline(error: PipelineError) -> Self {
        match error {
            PipelineError::HttpStatus {
                status, body, url, ..
            } => Self::from_status(status, body.as_deref(), &url),
            other => ApiError::Pipeline(other),
        }
    }
}

/// Collect the human-readable messages out of a JIRA error payload.
///
/// JIRA reports errors two ways at once: a flat `errorMessages` array and a
/// field-keyed `errors` object. Both are joined into one line.
fn extract_error_messages(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let mut messages = Vec::new();

    if let Some(list) = value.get("errorMessages").and_then(Value::as_array) {
        for entry in list {
            if let Some(text) = entry.as_str() {
                messages.push(text.to_string());
            }
        }
    }
    if let Some(fields) = value.get("errors").and_then(Value::as_object) {
        for (field, text) in fields {
            if let Some(text) = text.as_str() {
                messages.push(format!("{}: {}", field, text));
            }
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
