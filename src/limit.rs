//! Rate limiting for pipeline requests.

use tokio::sync::Semaphore;
use tracing::trace;

use crate::pipeline::UnitFuture;

/// Defers a request unit until capacity allows it to run.
///
/// The unit a limiter receives already includes the retry loop, so one slot
/// covers every attempt of a request.
pub trait RateLimiter: Send + Sync {
    fn schedule<'a>(&'a self, unit: UnitFuture<'a>) -> UnitFuture<'a>;
}

/// [`RateLimiter`] bounding how many requests run at once.
///
/// Waiters queue on a semaphore in arrival order; nothing is rejected, only
/// delayed.
pub struct MaxInFlight {
    permits: Semaphore,
}

impl MaxInFlight {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Semaphore::new(limit.max(1)),
        }
    }
}

impl RateLimiter for MaxInFlight {
    fn schedule<'a>(&'a self, unit: UnitFuture<'a>) -> UnitFuture<'a> {
        Box::pin(async move {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                // The semaphore is never closed; run the unit regardless.
                Err(_) => return unit.await,
            };
            trace!(
                available = self.permits.available_permits(),
                "acquired in-flight slot"
            );
            unit.await
        })
    }
}
