//! Bounded-concurrency batch execution.
//!
//! [`run_batch`] drives a list of inputs through one async operation,
//! running at most `concurrency` items at a time. Inputs are taken in
//! groups of that size and a group must settle completely before the next
//! one starts. Each item carries its own exponential backoff retry budget;
//! the run either collects failures into a [`BatchReport`] or stops at the
//! first one, depending on [`BatchOptions::continue_on_error`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::retry::backoff_delay;

/// Default number of items running at once.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;

/// Default per-item retry budget.
pub const DEFAULT_BATCH_RETRIES: u32 = 2;

/// Default base delay between per-item retries, in milliseconds.
pub const DEFAULT_BATCH_RETRY_DELAY_MS: u64 = 1000;

/// Tuning knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on items in flight at once. Zero is treated as one.
    pub concurrency: usize,
    /// Record failures and keep going, instead of stopping at the first.
    pub continue_on_error: bool,
    /// Re-runs allowed per item after its first attempt.
    pub retries: u32,
    /// Base delay before an item's first retry; later ones double it.
    pub retry_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            continue_on_error: true,
            retries: DEFAULT_BATCH_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_BATCH_RETRY_DELAY_MS),
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// The budget applies to every failure alike; a permanent rejection
    /// burns all its retries before it is recorded.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// One input that exhausted its retry budget.
#[derive(Debug)]
pub struct BatchFailure<I, E> {
    /// Position of the input in the original batch.
    pub index: usize,
    pub input: I,
    /// Error of the final attempt.
    pub error: E,
}

/// Outcome of a completed batch run.
#[derive(Debug)]
pub struct BatchReport<O, I, E> {
    /// Outputs in the order their items settled.
    pub successes: Vec<O>,
    /// Failed inputs with their original positions.
    pub failures: Vec<BatchFailure<I, E>>,
    /// Number of inputs the run started with.
    pub total: usize,
}

impl<O, I, E> BatchReport<O, I, E> {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Run `operation` over `items` with bounded concurrency.
///
/// Inputs are cloned once per attempt, so retries always start from the
/// original value. The operation only borrows from its environment, nothing
/// is spawned; closures over `&self` work without `'static` bounds.
///
/// # Errors
///
/// With `continue_on_error` unset, returns the first failure of the group
/// that produced it once that group has settled. Later groups never start.
pub async fn run_batch<I, O, E, F, Fut>(
    items: Vec<I>,
    options: &BatchOptions,
    operation: F,
) -> Result<BatchReport<O, I, E>, BatchFailure<I, E>>
where
    I: Clone,
    E: fmt::Display,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let total = items.len();
    let concurrency = options.concurrency.max(1);
    debug!(total, concurrency, "starting batch run");

    let operation = &operation;
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    let mut index_base = 0;

    let mut remaining = items.into_iter();
    loop {
        let group: Vec<I> = remaining.by_ref().take(concurrency).collect();
        if group.is_empty() {
            break;
        }
        let group_len = group.len();

        let settled = join_all(group.into_iter().enumerate().map(|(offset, item)| async move {
            let index = index_base + offset;
            let outcome = run_item(options, operation, &item, index).await;
            (index, item, outcome)
        }))
        .await;

        let mut group_failure: Option<BatchFailure<I, E>> = None;
        for (index, input, outcome) in settled {
            match outcome {
                Ok(output) => successes.push(output),
                Err(error) if !options.continue_on_error && group_failure.is_none() => {
                    group_failure = Some(BatchFailure {
                        index,
                        input,
                        error,
                    });
                }
                Err(error) => failures.push(BatchFailure {
                    index,
                    input,
                    error,
                }),
            }
        }

        if let Some(failure) = group_failure {
            warn!(index = failure.index, error = %failure.error, "stopping batch at first failure");
            return Err(failure);
        }

        index_base += group_len;
    }

    debug!(
        successes = successes.len(),
        failures = failures.len(),
        "batch run finished"
    );
    Ok(BatchReport {
        successes,
        failures,
        total,
    })
}

/// One item through its retry budget.
async fn run_item<I, O, E, F, Fut>(
    options: &BatchOptions,
    operation: &F,
    item: &I,
    index: usize,
) -> Result<O, E>
where
    I: Clone,
    E: fmt::Display,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation(item.clone()).await {
            Ok(output) => return Ok(output),
            Err(error) if attempt < options.retries => {
                let delay = backoff_delay(options.retry_delay, attempt);
                warn!(
                    index,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "batch item failed, backing off before retry"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
