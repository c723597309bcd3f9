use crate::clock::Delay;
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was considered fatal and should bubble up immediately.
    Fatal(E),
    /// The error was retryable, but the attempt budget ran out.
    /// `attempts` counts every attempt made, including the first.
    AttemptsExceeded { attempts: usize, source: E },
    /// Cooperative cancellation fired before or during a retry wait.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt; an operation is attempted at most
    /// `max_retries + 1` times.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// Executes the operation under this policy. `classify` decides per
    /// error whether to keep retrying; `on_retry` fires before each backoff
    /// sleep with the failed attempt number (zero-based), the error, and the
    /// delay about to be slept.
    pub async fn run<F, Fut, T, E, C, H>(
        &self,
        delay: &dyn Delay,
        cancel: &CancellationToken,
        mut op: F,
        classify: C,
        mut on_retry: H,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDisposition,
        H: FnMut(usize, &E, Duration),
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt >= self.max_retries {
                            return Err(RetryError::AttemptsExceeded {
                                attempts: attempt + 1,
                                source: err,
                            });
                        }

                        let backoff = self.backoff_delay(attempt);
                        on_retry(attempt, &err, backoff);

                        tokio::select! {
                            _ = delay.sleep(backoff) => {}
                            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        }
                        attempt += 1;
                    }
                },
            }
        }
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`. The shift saturates
    /// so large attempt numbers cannot overflow.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u128 << attempt.min(32);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}
