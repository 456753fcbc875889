//! JIRA REST API client library.
//!
//! This crate provides an async client for the JIRA Cloud REST API v3. All
//! requests run through a composable pipeline that handles response caching,
//! timeouts, cancellation, retries and rate limiting, and a batch executor
//! runs many operations with bounded concurrency and per-item retry.
//!
//! # Example
//!
//! ```no_run
//! use jira_api::{JiraClient, JiraConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = JiraConfig::load()?;
//! let client = JiraClient::new(&config)?;
//!
//! let issue = client.get_issue("PROJ-123").await?;
//! println!("{}: {}", issue.key, issue.summary());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod limit;
pub mod pipeline;
pub mod retry;
pub mod transport;

pub use api::{ApiError, Auth, Issue, JiraClient};
pub use batch::{run_batch, BatchFailure, BatchOptions, BatchReport};
pub use cache::{MemoryCache, ResponseCache};
pub use config::JiraConfig;
pub use limit::{MaxInFlight, RateLimiter};
pub use pipeline::{
    CancelSignal, Decoded, HttpResponse, Pipeline, PipelineBuilder, PipelineError, RequestSpec,
};
pub use retry::{BackoffRetry, RetryRunner};
pub use transport::{ReqwestTransport, Transport};
