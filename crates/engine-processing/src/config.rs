use connectors::{error::QueryError, sql::ident};
use model::{core::value::Value, pagination::cursor::SortDirection};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,

    #[error("page limit must be greater than zero")]
    ZeroPageLimit,

    #[error(transparent)]
    InvalidIdentifier(#[from] QueryError),
}

/// Tuning for one `BatchProcessor` run. `max_concurrency` caps in-flight
/// batches; callers must size it to the real capacity of the shared
/// connection pool behind the work function.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    /// Retries beyond the first attempt; a failing batch is attempted
    /// `retry_attempts + 1` times before it is marked failed.
    pub retry_attempts: usize,
    pub retry_base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 4,
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Source description for one cursor traversal.
#[derive(Debug, Clone)]
pub struct PaginateConfig {
    pub table: String,
    pub cursor_column: String,
    pub direction: SortDirection,
    pub limit: usize,
    /// Equality filters, ANDed into the WHERE clause. Null-valued entries
    /// are skipped at render time.
    pub filters: Vec<(String, Value)>,
}

impl PaginateConfig {
    pub fn new(table: &str, cursor_column: &str) -> Self {
        Self {
            table: table.to_string(),
            cursor_column: cursor_column.to_string(),
            direction: SortDirection::Ascending,
            limit: 500,
            filters: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, column: &str, value: Value) -> Self {
        self.filters.push((column.to_string(), value));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::ZeroPageLimit);
        }
        ident::validate(&self.table)?;
        ident::validate(&self.cursor_column)?;
        for (column, _) in &self.filters {
            ident::validate(column)?;
        }
        Ok(())
    }
}
