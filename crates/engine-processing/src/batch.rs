use crate::error::{PaginateError, StreamError};
use chrono::Utc;
use engine_core::{
    clock::{Delay, TokioDelay},
    metrics::Metrics,
    retry::{RetryDisposition, RetryError, RetryPolicy},
};
use futures::{Stream, StreamExt, future::BoxFuture, future::join_all, stream};
use model::{
    pagination::page::Page,
    records::batch::{BatchFailure, BatchResult, BatchState, WorkError},
};
use std::{future::Future, pin::Pin, sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use crate::config::BatchConfig;

/// Cumulative progress, reported once per settled concurrency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Items that have gone through a succeeding batch so far.
    pub processed: usize,
    /// Items in the whole run.
    pub total: usize,
    /// One-based index of the window that just settled.
    pub window: usize,
}

type WorkFn<T, O> =
    Box<dyn Fn(usize, Vec<T>) -> BoxFuture<'static, Result<Vec<O>, WorkError>> + Send + Sync>;
type ProgressFn = Box<dyn Fn(ProgressUpdate) + Send + Sync>;
type FailureFn<T> = Box<dyn Fn(usize, &[T]) + Send + Sync>;

enum BatchOutcome<O> {
    Succeeded { output: Vec<O>, size: usize },
    Failed(BatchFailure),
    Cancelled,
}

/// Splits an input collection into fixed-size batches and runs them through
/// a bounded-concurrency window with per-batch retry and exponential
/// backoff.
///
/// The work function transforms a whole batch and signals failure with a
/// single error for the batch; one batch failing never cancels its
/// siblings. At most `max_concurrency` batches are in flight at any
/// instant: the next window is not dispatched until the current one has
/// fully settled.
pub struct BatchProcessor<T, O> {
    work: WorkFn<T, O>,
    config: BatchConfig,
    retry: RetryPolicy,
    delay: Arc<dyn Delay>,
    cancel: CancellationToken,
    metrics: Metrics,
    on_progress: Option<ProgressFn>,
    on_batch_failure: Option<FailureFn<T>>,
}

impl<T, O> BatchProcessor<T, O>
where
    T: Clone + Send + 'static,
    O: Send + 'static,
{
    pub fn new<W, Fut>(config: BatchConfig, work: W) -> Result<Self, crate::config::ConfigError>
    where
        W: Fn(usize, Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<O>, WorkError>> + Send + 'static,
    {
        config.validate()?;
        let retry = RetryPolicy::new(
            config.retry_attempts,
            config.retry_base_delay,
            config.max_delay,
        );
        Ok(Self {
            work: Box::new(move |index, items| Box::pin(work(index, items))),
            config,
            retry,
            delay: Arc::new(TokioDelay),
            cancel: CancellationToken::new(),
            metrics: Metrics::new(),
            on_progress: None,
            on_batch_failure: None,
        })
    }

    /// Swaps the backoff sleep; tests inject a recording no-op here.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Installs a cooperative cancellation token, checked before every
    /// window, before every attempt, and during backoff sleeps.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Synchronous fire-and-forget progress callback; fires once per
    /// settled window with the cumulative processed count. Exceptions it
    /// raises are the caller's problem, not caught here.
    pub fn on_progress(mut self, callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Invoked with a permanently failed batch's index and original items.
    pub fn on_batch_failure(
        mut self,
        callback: impl Fn(usize, &[T]) + Send + Sync + 'static,
    ) -> Self {
        self.on_batch_failure = Some(Box::new(callback));
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Runs every batch to a terminal state and aggregates the outcome.
    /// Never fails: permanent batch failures are recorded in
    /// `BatchResult::errors` while sibling batches proceed.
    pub async fn process(&self, items: Vec<T>) -> BatchResult<O> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let total_items = items.len();
        let batches = split_batches(items, self.config.batch_size);
        info!(
            items = total_items,
            batches = batches.len(),
            batch_size = self.config.batch_size,
            concurrency = self.config.max_concurrency,
            "Starting batch run"
        );

        let mut outputs: Vec<O> = Vec::new();
        let mut errors: Vec<BatchFailure> = Vec::new();
        let mut processed = 0usize;
        let mut failed = 0usize;
        let mut cancelled = false;
        let mut window_no = 0usize;

        let mut pending = batches.into_iter().enumerate();
        loop {
            let window: Vec<(usize, Vec<T>)> = pending
                .by_ref()
                .take(self.config.max_concurrency)
                .collect();
            if window.is_empty() {
                break;
            }
            if self.cancel.is_cancelled() {
                info!("Cancellation requested; run stops before the next window");
                cancelled = true;
                break;
            }

            window_no += 1;
            let settled = join_all(
                window
                    .into_iter()
                    .map(|(index, batch)| self.run_batch(index, batch)),
            )
            .await;

            for outcome in settled {
                match outcome {
                    BatchOutcome::Succeeded { output, size } => {
                        processed += size;
                        outputs.extend(output);
                    }
                    BatchOutcome::Failed(failure) => {
                        failed += failure.size;
                        errors.push(failure);
                    }
                    BatchOutcome::Cancelled => cancelled = true,
                }
            }

            if let Some(callback) = &self.on_progress {
                callback(ProgressUpdate {
                    processed,
                    total: total_items,
                    window: window_no,
                });
            }
            if cancelled {
                break;
            }
        }

        let result = BatchResult {
            outputs,
            processed,
            failed,
            errors,
            started_at,
            duration: clock.elapsed(),
            cancelled,
        };
        info!(summary = %result.summary(), "Batch run complete");
        if !result.errors.is_empty() {
            debug!(errors = ?result.errors, "Failed batch detail");
        }
        result
    }

    /// Streaming entry point: each incoming page is one batch under the
    /// same retry policy, and the transformed page is yielded immediately —
    /// the full dataset is never buffered.
    ///
    /// Failure contract differs from `process` on purpose: a permanently
    /// failed page aborts the whole stream instead of being isolated.
    pub fn process_stream<'a, S>(
        &'a self,
        pages: S,
    ) -> impl Stream<Item = Result<Page<O>, StreamError>> + 'a
    where
        S: Stream<Item = Result<Page<T>, PaginateError>> + Send + 'a,
    {
        let state: (Pin<Box<S>>, &'a Self) = (Box::pin(pages), self);
        stream::try_unfold(state, |(mut pages, this)| async move {
            if this.cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }

            let page = match pages.next().await {
                None => return Ok(None),
                Some(Err(source)) => return Err(StreamError::Source(source)),
                Some(Ok(page)) => page,
            };
            this.metrics.increment_pages(1);

            match this.run_batch(page.index, page.rows.clone()).await {
                BatchOutcome::Succeeded { output, .. } => {
                    let transformed = page.map_rows(output);
                    Ok(Some((transformed, (pages, this))))
                }
                BatchOutcome::Failed(failure) => Err(StreamError::PageFailed {
                    page: failure.batch,
                    attempts: failure.attempts,
                    source: failure.source,
                }),
                BatchOutcome::Cancelled => Err(StreamError::Cancelled),
            }
        })
    }

    async fn run_batch(&self, index: usize, items: Vec<T>) -> BatchOutcome<O> {
        let size = items.len();
        debug!(
            batch = index,
            size,
            state = %BatchState::Running,
            "Dispatching batch"
        );

        let attempt_result = self
            .retry
            .run(
                self.delay.as_ref(),
                &self.cancel,
                || (self.work)(index, items.clone()),
                |_| RetryDisposition::Retry,
                |attempt, err, backoff| {
                    self.metrics.increment_retries(1);
                    warn!(
                        batch = index,
                        attempt,
                        delay_ms = backoff.as_millis() as u64,
                        error = %err,
                        state = %BatchState::RetryScheduled,
                        "Batch attempt failed; retry scheduled"
                    );
                },
            )
            .await;

        match attempt_result {
            Ok(output) => {
                self.metrics.increment_items(size as u64);
                self.metrics.increment_batches(1);
                debug!(
                    batch = index,
                    size,
                    state = %BatchState::Succeeded,
                    "Batch succeeded"
                );
                BatchOutcome::Succeeded { output, size }
            }
            Err(RetryError::AttemptsExceeded { attempts, source }) => {
                self.fail_batch(index, &items, attempts, source)
            }
            // Unreachable with the always-retry classifier, but a fatal
            // error still has to land in a terminal state.
            Err(RetryError::Fatal(source)) => self.fail_batch(index, &items, 1, source),
            Err(RetryError::Cancelled) => {
                info!(batch = index, "Batch cancelled before completion");
                BatchOutcome::Cancelled
            }
        }
    }

    fn fail_batch(
        &self,
        index: usize,
        items: &[T],
        attempts: usize,
        source: WorkError,
    ) -> BatchOutcome<O> {
        self.metrics.increment_failed_items(items.len() as u64);
        self.metrics.increment_failures(1);
        error!(
            batch = index,
            size = items.len(),
            attempts,
            error = %source,
            state = %BatchState::FailedPermanently,
            "Batch failed permanently"
        );
        if let Some(callback) = &self.on_batch_failure {
            callback(index, items);
        }
        BatchOutcome::Failed(BatchFailure {
            batch: index,
            size: items.len(),
            attempts,
            source,
        })
    }
}

/// Fixed-size chunking; the final batch may be shorter. For N items and
/// batch size B this yields ceil(N/B) batches whose sizes sum to N.
fn split_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size.max(1)));
    let mut batch = Vec::with_capacity(batch_size.min(items.len()));
    for item in items {
        batch.push(item);
        if batch.len() == batch_size {
            batches.push(std::mem::replace(
                &mut batch,
                Vec::with_capacity(batch_size),
            ));
        }
    }
    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_and_size_sum_law() {
        for (n, b) in [(0usize, 5usize), (1, 5), (5, 5), (6, 5), (1000, 250), (7, 3)] {
            let items: Vec<usize> = (0..n).collect();
            let batches = split_batches(items, b);
            assert_eq!(batches.len(), n.div_ceil(b), "count for n={n} b={b}");
            assert_eq!(
                batches.iter().map(Vec::len).sum::<usize>(),
                n,
                "size sum for n={n} b={b}"
            );
            for batch in batches.iter().take(batches.len().saturating_sub(1)) {
                assert_eq!(batch.len(), b);
            }
        }
    }

    #[test]
    fn chunking_preserves_order() {
        let batches = split_batches((0..10).collect::<Vec<_>>(), 4);
        assert_eq!(batches, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }
}
