//! Content-type driven decoding of buffered responses.

use bytes::Bytes;
use serde_json::Value;
use tracing::trace;

use super::error::PipelineError;
use super::types::{HttpResponse, RequestSpec};

/// Decoded payload of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

impl Decoded {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Decode a buffered response by its `Content-Type` header.
///
/// JSON is checked before text so `application/json; charset=utf-8` never
/// falls into the text branch. An empty or whitespace-only JSON body decodes
/// to `Value::Null`; a malformed one is a [`PipelineError::Configuration`],
/// since by that point the exchange itself already succeeded.
pub fn decode_response(spec: &RequestSpec, response: &HttpResponse) -> Result<Decoded, PipelineError> {
    let content_type = response.content_type().unwrap_or_default().to_lowercase();

    if content_type.contains("json") {
        let text = response.body_text();
        if text.trim().is_empty() {
            return Ok(Decoded::Json(Value::Null));
        }
        return match serde_json::from_str(&text) {
            Ok(value) => Ok(Decoded::Json(value)),
            Err(err) => Err(PipelineError::configuration(
                spec,
                format!("undecodable JSON body: {err}"),
            )),
        };
    }

    if content_type.contains("text") {
        return Ok(Decoded::Text(response.body_text()));
    }

    trace!(content_type = %content_type, bytes = response.body.len(), "passing body through undecoded");
    Ok(Decoded::Bytes(response.body.clone()))
}
