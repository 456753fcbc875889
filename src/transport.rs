//! HTTP transport behind the pipeline.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;

use crate::pipeline::{CancelSignal, HttpResponse, RequestSpec};

/// Performs a single HTTP exchange and buffers the whole response.
///
/// A non-2xx answer is still `Ok`; the pipeline's status check decides what
/// to do with it. An `Err` means no usable response exists at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `spec` and buffer the response. `signal` aborts the exchange
    /// early when cancellation fires mid-transfer.
    async fn send(&self, spec: &RequestSpec, signal: &CancelSignal)
        -> anyhow::Result<HttpResponse>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
///
/// Timing is owned by the pipeline's signal composition, so the underlying
/// client carries no timeout of its own.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialized.
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jira-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Wrap an existing client, keeping its connection pool.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, spec: &RequestSpec) -> anyhow::Result<HttpResponse> {
        let mut request = self.client.request(spec.method.clone(), &spec.url);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;
        trace!(status = %status, bytes = body.len(), "response buffered");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        spec: &RequestSpec,
        signal: &CancelSignal,
    ) -> anyhow::Result<HttpResponse> {
        tokio::select! {
            biased;

            _ = signal.cancelled() => Err(anyhow!("request cancelled")),
            outcome = self.exchange(spec) => outcome,
        }
    }
}
