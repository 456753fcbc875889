//! Basic Auth credentials for JIRA Cloud.
//!
//! JIRA Cloud authenticates REST calls with an email and API token pair sent
//! as a Basic Auth header. The pair is encoded once at construction; the raw
//! token is not retained.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Pre-encoded `Authorization` header value.
#[derive(Debug, Clone)]
pub struct Auth {
    header: String,
}

impl Auth {
    pub fn new(email: &str, token: &str) -> Self {
        let encoded = BASE64.encode(format!("{email}:{token}"));
        Self {
            header: format!("Basic {encoded}"),
        }
    }

    /// Value for the `Authorization` request header.
    pub fn header_value(&self) -> &str {
        &self.header
    }
}
