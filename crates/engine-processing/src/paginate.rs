use crate::{
    config::{ConfigError, PaginateConfig},
    error::PaginateError,
};
use connectors::{executor::QueryExecutor, sql::select};
use futures::{Stream, stream};
use model::{
    pagination::{cursor::Cursor, page::Page},
    records::record::FromRow,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Traverses a relational result set through successive bounded range
/// queries, advancing an opaque cursor after every page.
///
/// The cursor column must hold unique, monotonic values. Duplicate values
/// on a page boundary make the strict cursor predicate re-select the same
/// tail rows on every following page (livelock). That limitation is
/// observed behavior and intentionally not worked around here; see
/// DESIGN.md for the flagged follow-up (composite cursor of column plus
/// primary key).
pub struct CursorPaginator<E> {
    executor: Arc<E>,
    config: PaginateConfig,
    cancel: CancellationToken,
}

struct Traversal<E> {
    executor: Arc<E>,
    config: PaginateConfig,
    cancel: CancellationToken,
    cursor: Cursor,
    next_index: usize,
    done: bool,
}

impl<E> CursorPaginator<E>
where
    E: QueryExecutor + 'static,
{
    pub fn new(executor: Arc<E>, config: PaginateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            executor,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Installs a cooperative cancellation token; the page stream finishes
    /// cleanly at the next page boundary after the token fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the lazy, finite, non-restartable page sequence. Query
    /// failures propagate immediately and end the stream; this layer never
    /// retries.
    pub fn paginate<R>(&self) -> impl Stream<Item = Result<Page<R>, PaginateError>> + Send + use<E, R>
    where
        R: FromRow + Send + 'static,
    {
        let state = Traversal {
            executor: self.executor.clone(),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
            cursor: Cursor::None,
            next_index: 0,
            done: false,
        };

        stream::try_unfold(state, |mut state| async move {
            if state.done {
                return Ok(None);
            }
            if state.cancel.is_cancelled() {
                info!(
                    table = %state.config.table,
                    pages = state.next_index,
                    "Pagination cancelled"
                );
                return Ok(None);
            }

            let query = select::page_query(
                &state.config.table,
                &state.config.cursor_column,
                state.config.direction,
                state.config.limit,
                &state.config.filters,
                &state.cursor,
            )?;
            let rows = state.executor.query(&query.sql, &query.params).await?;

            if rows.is_empty() {
                info!(
                    table = %state.config.table,
                    pages = state.next_index,
                    "Pagination complete"
                );
                return Ok(None);
            }

            let boundary = rows
                .last()
                .map(|row| row.get_value(&state.config.cursor_column))
                .filter(|v| !v.is_null())
                .ok_or_else(|| PaginateError::MissingCursorColumn {
                    column: state.config.cursor_column.clone(),
                })?;

            let is_last = rows.len() < state.config.limit;
            let records = rows
                .iter()
                .map(R::from_row)
                .collect::<Result<Vec<_>, _>>()?;

            let page = Page {
                index: state.next_index,
                rows: records,
                end_cursor: Cursor::After(boundary.clone()),
                is_last,
            };
            debug!(
                table = %state.config.table,
                page = page.index,
                rows = page.len(),
                cursor = %page.end_cursor,
                "Fetched page"
            );

            state.cursor = Cursor::After(boundary);
            state.next_index += 1;
            if is_last {
                state.done = true;
                info!(
                    table = %state.config.table,
                    pages = state.next_index,
                    "Pagination complete"
                );
            }

            Ok(Some((page, state)))
        })
    }

    /// Counts the rows matching the equality filters, ignoring cursor
    /// state. Intended for progress reporting alongside `paginate`.
    pub async fn total(&self) -> Result<u64, PaginateError> {
        let query = select::count_query(&self.config.table, &self.config.filters)?;
        let rows = self.executor.query(&query.sql, &query.params).await?;
        let count = rows
            .first()
            .and_then(|row| row.get_i64("total"))
            .ok_or(PaginateError::MalformedCount)?;
        Ok(count.max(0) as u64)
    }
}
