use crate::error::QueryError;
use async_trait::async_trait;
use model::{core::value::Value, records::row::Row};

/// The narrow query-execution boundary the engine traverses data through.
/// Implementations own the connection/pool; the engine never sees it.
///
/// Every dynamic value travels in `params` as a bound parameter
/// (`$1..$n` placeholders); the SQL text contains only allow-listed
/// identifiers and fixed syntax.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, QueryError>;
}
