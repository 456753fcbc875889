//! One-shot cancellation signals for in-flight requests.
//!
//! A [`CancelSignal`] moves from pending to cancelled exactly once, no matter
//! how many routes try to trip it. Signals compose: [`CancelSignal::after`]
//! cancels itself when a duration elapses, [`CancelSignal::any`] merges
//! several signals into one that fires with the first of them. Propagation is
//! strictly downstream; cancelling a merged signal never touches its sources.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::trace;

type Listener = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
}

/// Clonable handle over a one-shot {pending, cancelled} state machine.
///
/// Clones share state: cancelling any handle cancels them all. A signal is
/// created per request attempt and discarded with it; there is no reset and
/// no reuse.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// A pending signal linked to nothing.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Trip the signal. The first call drains and runs every registered
    /// listener; later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let listeners = {
            let mut guard = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        trace!(listeners = listeners.len(), "cancellation signal tripped");
        for listener in listeners {
            listener();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Register a one-shot listener. If the signal is already cancelled the
    /// listener runs immediately and is never stored.
    pub fn on_cancel<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_cancelled() {
            listener();
            return;
        }
        let mut guard = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Re-check under the lock: a concurrent cancel may have drained the
        // list already, in which case the listener runs here instead.
        if self.inner.cancelled.load(Ordering::SeqCst) {
            drop(guard);
            listener();
        } else {
            guard.push(Box::new(listener));
        }
    }

    /// Future that resolves once the signal is cancelled. For a signal that
    /// is never cancelled the future stays pending forever, even after every
    /// handle is dropped.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let (tx, rx) = oneshot::channel::<()>();
        self.on_cancel(move || {
            let _ = tx.send(());
        });
        async move {
            if rx.await.is_err() {
                // Sender dropped without firing: the signal went away while
                // still pending. Cancellation can no longer happen.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Signal that cancels itself once `duration` elapses.
    ///
    /// The backing timer is released the moment the signal is cancelled by
    /// any route, not just when it fires. Must be called inside a tokio
    /// runtime.
    pub fn after(duration: Duration) -> Self {
        let signal = Self::new();
        let timer = signal.clone();
        tokio::spawn(async move {
            let cancelled = timer.cancelled();
            tokio::select! {
                _ = tokio::time::sleep(duration) => timer.cancel(),
                _ = cancelled => {}
            }
        });
        signal
    }

    /// Merge `signals` into one that cancels with the first of them.
    ///
    /// Inputs are checked eagerly: an already-cancelled input cancels the
    /// merge right away and no listener is registered anywhere. An empty
    /// input set yields a signal that never cancels on its own.
    pub fn any<I>(signals: I) -> Self
    where
        I: IntoIterator<Item = CancelSignal>,
    {
        let merged = Self::new();
        let sources: Vec<CancelSignal> = signals.into_iter().collect();
        if sources.iter().any(CancelSignal::is_cancelled) {
            merged.cancel();
            return merged;
        }
        for source in sources {
            let downstream = merged.clone();
            source.on_cancel(move || downstream.cancel());
        }
        merged
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
