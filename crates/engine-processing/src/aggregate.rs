use connectors::executor::QueryExecutor;
use futures::future::join_all;
use model::{core::value::Value, records::row::Row};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// One named, independent query in a fan-out.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub name: String,
    pub sql: String,
    pub params: Vec<Value>,
}

impl QuerySpec {
    pub fn new(name: &str, sql: &str) -> Self {
        Self {
            name: name.to_string(),
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// Fires a set of unrelated queries concurrently and isolates per-query
/// failure: a failing query is logged and its key maps to `None`, so
/// callers get partial data instead of a total failure. Used for
/// dashboard-style fan-outs where stale or missing panels beat an error
/// page.
pub struct ParallelAggregator<E> {
    executor: Arc<E>,
}

impl<E> ParallelAggregator<E>
where
    E: QueryExecutor,
{
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Never fails as a whole; inspect individual entries for `None`.
    pub async fn fetch_all(&self, specs: Vec<QuerySpec>) -> HashMap<String, Option<Vec<Row>>> {
        debug!(queries = specs.len(), "Dispatching aggregated queries");

        let results = join_all(specs.into_iter().map(|spec| {
            let executor = self.executor.clone();
            async move {
                let outcome = executor.query(&spec.sql, &spec.params).await;
                (spec.name, outcome)
            }
        }))
        .await;

        results
            .into_iter()
            .map(|(name, outcome)| match outcome {
                Ok(rows) => (name, Some(rows)),
                Err(err) => {
                    warn!(
                        query = %name,
                        error = %err,
                        "Aggregated query failed; substituting null"
                    );
                    (name, None)
                }
            })
            .collect()
    }
}
