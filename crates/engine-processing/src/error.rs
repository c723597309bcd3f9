use connectors::error::QueryError;
use model::records::{batch::WorkError, record::RowError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaginateError {
    /// The underlying query failed; pagination performs no retries and
    /// halts the page sequence immediately.
    #[error("Page query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Cursor column '{column}' is missing or NULL in result row")]
    MissingCursorColumn { column: String },

    #[error("Failed to convert result row: {0}")]
    Row(#[from] RowError),

    #[error("Count query returned no usable 'total' column")]
    MalformedCount,
}

/// Failure of a streaming run. Unlike `process`, which records permanent
/// batch failures and carries on, a permanently failed page aborts the
/// whole stream. The asymmetry is deliberate and matches the observed
/// behavior of both entry points; see DESIGN.md.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Page source failed: {0}")]
    Source(#[from] PaginateError),

    #[error("Page {page} failed permanently after {attempts} attempts: {source}")]
    PageFailed {
        page: usize,
        attempts: usize,
        #[source]
        source: WorkError,
    },

    #[error("Stream cancelled")]
    Cancelled,
}
