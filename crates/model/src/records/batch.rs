use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, time::Duration};

/// Error type the caller-supplied work function fails with. One error stands
/// for the whole batch; per-item granularity is not part of the contract.
pub type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// How many failing batches the operator-facing summary lists before
/// truncating. Full errors stay available in `BatchResult::errors`.
pub const SUMMARY_ERROR_LIMIT: usize = 5;

/// Lifecycle of a single batch. Every batch ends in exactly one terminal
/// state: `Succeeded` or `FailedPermanently`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    Pending,
    Running,
    RetryScheduled,
    Succeeded,
    FailedPermanently,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Succeeded | BatchState::FailedPermanently)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Pending => "Pending",
            BatchState::Running => "Running",
            BatchState::RetryScheduled => "RetryScheduled",
            BatchState::Succeeded => "Succeeded",
            BatchState::FailedPermanently => "FailedPermanently",
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of a batch that exhausted its retry budget.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based batch index within the run.
    pub batch: usize,
    /// Number of input items the batch carried.
    pub size: usize,
    /// Attempts actually made, i.e. configured retries + 1.
    pub attempts: usize,
    /// The error from the final attempt.
    pub source: WorkError,
}

impl BatchFailure {
    pub fn message(&self) -> String {
        self.source.to_string()
    }
}

/// Aggregate outcome of one `process` invocation.
#[derive(Debug)]
pub struct BatchResult<O> {
    /// Successful batch outputs concatenated in batch-index order.
    pub outputs: Vec<O>,
    /// Items that went through a succeeding batch.
    pub processed: usize,
    /// Items that belonged to a permanently failed batch.
    pub failed: usize,
    pub errors: Vec<BatchFailure>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Set when cooperative cancellation stopped the run before every batch
    /// was dispatched; undispatched items count as neither processed nor
    /// failed.
    pub cancelled: bool,
}

impl<O> BatchResult<O> {
    /// Items processed per second of wall-clock duration; zero for an
    /// instantaneous run.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Operator-facing one-liner: counts plus a bounded list of failing
    /// batch indices with their messages.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "processed={} failed={} duration_ms={} throughput={:.1}/s",
            self.processed,
            self.failed,
            self.duration.as_millis(),
            self.throughput(),
        );
        if self.cancelled {
            line.push_str(" cancelled=true");
        }
        if !self.errors.is_empty() {
            let shown: Vec<String> = self
                .errors
                .iter()
                .take(SUMMARY_ERROR_LIMIT)
                .map(|e| format!("batch {}: {}", e.batch, e.message()))
                .collect();
            line.push_str(&format!(" errors=[{}]", shown.join("; ")));
            if self.errors.len() > SUMMARY_ERROR_LIMIT {
                line.push_str(&format!(
                    " (+{} more)",
                    self.errors.len() - SUMMARY_ERROR_LIMIT
                ));
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_errors(count: usize) -> BatchResult<()> {
        BatchResult {
            outputs: vec![],
            processed: 10,
            failed: count * 2,
            errors: (0..count)
                .map(|i| BatchFailure {
                    batch: i,
                    size: 2,
                    attempts: 3,
                    source: format!("boom {i}").into(),
                })
                .collect(),
            started_at: Utc::now(),
            duration: Duration::from_millis(500),
            cancelled: false,
        }
    }

    #[test]
    fn throughput_is_processed_over_duration() {
        let result = result_with_errors(0);
        assert!((result.throughput() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn throughput_of_instant_run_is_zero() {
        let result = BatchResult::<()> {
            duration: Duration::ZERO,
            ..result_with_errors(0)
        };
        assert_eq!(result.throughput(), 0.0);
    }

    #[test]
    fn summary_bounds_the_error_list() {
        let result = result_with_errors(SUMMARY_ERROR_LIMIT + 3);
        let summary = result.summary();
        assert!(summary.contains("batch 0: boom 0"));
        assert!(summary.contains(&format!(
            "batch {}: boom {}",
            SUMMARY_ERROR_LIMIT - 1,
            SUMMARY_ERROR_LIMIT - 1
        )));
        assert!(!summary.contains(&format!("boom {SUMMARY_ERROR_LIMIT}")));
        assert!(summary.contains("(+3 more)"));
    }

    #[test]
    fn terminal_states() {
        assert!(BatchState::Succeeded.is_terminal());
        assert!(BatchState::FailedPermanently.is_terminal());
        assert!(!BatchState::RetryScheduled.is_terminal());
    }
}
