//! Request execution pipeline.
//!
//! Every request follows one stage order: cache probe, timeout and signal
//! composition, transport call, optional transform hook, status check, cache
//! store, decode. Cross-cutting behavior lives in collaborators injected at
//! construction: a [`Transport`] performs the exchange, a
//! [`ResponseCache`](crate::cache::ResponseCache) short-circuits repeated
//! GETs, a [`RetryRunner`](crate::retry::RetryRunner) re-runs failed
//! attempts and a [`RateLimiter`](crate::limit::RateLimiter) bounds how many
//! requests are in flight at once.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, instrument, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::limit::RateLimiter;
use crate::retry::RetryRunner;
use crate::transport::Transport;

mod decode;
mod error;
mod signal;
mod types;

pub use decode::{decode_response, Decoded};
pub use error::{classify, classify_hook, PipelineError, PipelineErrorKind};
pub use signal::CancelSignal;
pub use types::{HttpResponse, RequestSpec, TransformHook};

/// Timeout applied when neither the pipeline nor the request sets one, in
/// milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Outcome of a pipeline execution.
pub type PipelineResult = Result<Decoded, PipelineError>;

/// Boxed future for one attempt of a request.
pub type UnitFuture<'a> = BoxFuture<'a, PipelineResult>;

/// Factory over the retryable unit of a request. Retry coordinators call it
/// once per attempt, so every attempt gets a fresh timeout window and a
/// fresh composed signal.
pub type UnitFn<'a> = Box<dyn Fn() -> UnitFuture<'a> + Send + Sync + 'a>;

/// Request execution pipeline.
///
/// The cache is probed exactly once per [`execute`](Pipeline::execute) call,
/// before retry and rate limiting come into play. The retry coordinator
/// wraps everything after the probe as one unit, and the rate limiter wraps
/// the retry loop in turn, so a single in-flight slot covers all attempts
/// of a request.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn ResponseCache>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    retry: Option<Arc<dyn RetryRunner>>,
    timeout: Duration,
}

/// Builder for a [`Pipeline`]. Only the transport is required.
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn ResponseCache>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    retry: Option<Arc<dyn RetryRunner>>,
    timeout: Duration,
}

impl PipelineBuilder {
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryRunner>) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Default timeout for requests that do not carry their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            transport: self.transport,
            cache: self.cache,
            limiter: self.limiter,
            retry: self.retry,
            timeout: self.timeout,
        }
    }
}

impl Pipeline {
    /// Pipeline with no cache, no retry and no rate limiting.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            transport,
            cache: None,
            limiter: None,
            retry: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Run `spec` through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] classifying the failure: `Network` for
    /// transport faults, `HttpStatus` for non-2xx answers, `Timeout` when
    /// the attempt's signal fired first and `Configuration` for contract
    /// violations such as an undecodable JSON body.
    #[instrument(skip(self, spec), fields(method = %spec.method, url = %spec.url))]
    pub async fn execute(&self, spec: RequestSpec) -> PipelineResult {
        if spec.is_cacheable() {
            if let Some(cache) = &self.cache {
                let key = cache_key(&spec.method, &spec.url);
                if let Some(stored) = cache.get(&key) {
                    debug!("serving response from cache");
                    return decode_response(&spec, &stored);
                }
            }
        }

        let spec = &spec;
        let unit: UnitFn<'_> = Box::new(move || Box::pin(self.attempt(spec)));
        let wrapped: UnitFuture<'_> = match &self.retry {
            Some(retry) => retry.run(unit),
            None => unit(),
        };
        match &self.limiter {
            Some(limiter) => limiter.schedule(wrapped).await,
            None => wrapped.await,
        }
    }

    /// One attempt: signal composition through decode.
    async fn attempt(&self, spec: &RequestSpec) -> PipelineResult {
        let timeout = spec.timeout.unwrap_or(self.timeout);
        let timer = CancelSignal::after(timeout);
        let signal = match &spec.signal {
            Some(caller) => CancelSignal::any([caller.clone(), timer.clone()]),
            None => timer.clone(),
        };

        let exchanged = self.exchange(spec, &signal, timeout).await;
        // Settled either way; release the timer task.
        timer.cancel();
        let response = exchanged?;

        if !response.is_success() {
            return Err(PipelineError::http_status(spec, &response));
        }

        if spec.is_cacheable() {
            if let Some(cache) = &self.cache {
                cache.set(&cache_key(&spec.method, &spec.url), response.clone());
            }
        }

        decode_response(spec, &response)
    }

    /// Race the transport call and transform hook against the composed
    /// signal. `biased` polls the cancellation branch first, so an already
    /// cancelled signal wins without the transport ever being invoked.
    async fn exchange(
        &self,
        spec: &RequestSpec,
        signal: &CancelSignal,
        timeout: Duration,
    ) -> Result<HttpResponse, PipelineError> {
        tokio::select! {
            biased;

            _ = signal.cancelled() => {
                warn!(timeout_ms = timeout.as_millis() as u64, "request cancelled before a response arrived");
                Err(PipelineError::timeout(spec, timeout))
            }
            result = async {
                let response = self
                    .transport
                    .send(spec, signal)
                    .await
                    .map_err(|err| classify(err, spec, signal, timeout))?;
                match &spec.transform {
                    Some(hook) => hook(response).await.map_err(|err| classify_hook(err, spec)),
                    None => Ok(response),
                }
            } => result,
        }
    }
}
