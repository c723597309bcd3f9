//! Traversal and streaming behavior against the in-memory store double.

#[cfg(test)]
mod tests {
    use crate::utils::{MemoryTable, RecordingDelay, ScriptedExecutor, inventory_rows, row};
    use engine_processing::{
        batch::{BatchConfig, BatchProcessor},
        config::PaginateConfig,
        error::{PaginateError, StreamError},
        paginate::CursorPaginator,
    };
    use futures::StreamExt;
    use model::{
        core::value::Value,
        pagination::cursor::{Cursor, SortDirection},
        records::{
            record::{FromRow, RowError, require_i64, require_str},
            row::Row,
        },
    };
    use std::{collections::HashSet, sync::Arc, time::Duration};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone, PartialEq)]
    struct InventoryItem {
        id: i64,
        status: String,
    }

    impl FromRow for InventoryItem {
        fn from_row(row: &Row) -> Result<Self, RowError> {
            Ok(InventoryItem {
                id: require_i64(row, "id")?,
                status: require_str(row, "status")?.to_string(),
            })
        }
    }

    fn paginator(
        store: &Arc<MemoryTable>,
        config: PaginateConfig,
    ) -> CursorPaginator<MemoryTable> {
        CursorPaginator::new(store.clone(), config).expect("valid paginate config")
    }

    // 1200 rows, limit 500, ascending on id: pages of 500/500/200, cursor
    // after page one equals the id of row 500.
    #[tokio::test]
    async fn ascending_traversal_splits_1200_rows_into_three_pages() {
        let store = Arc::new(MemoryTable::new(inventory_rows(1200)));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(500);

        let pages: Vec<_> = paginator(&store, config)
            .paginate::<Row>()
            .collect()
            .await;
        let pages: Vec<_> = pages
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("traversal succeeds");

        assert_eq!(pages.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![500, 500, 200]);
        assert_eq!(pages[0].end_cursor, Cursor::After(Value::Int(500)));
        assert_eq!(
            pages.iter().map(|p| p.is_last).collect::<Vec<_>>(),
            vec![false, false, true]
        );

        let ids: Vec<i64> = pages
            .iter()
            .flat_map(|p| p.rows.iter().map(|r| r.get_i64("id").unwrap()))
            .collect();
        assert_eq!(ids.len(), 1200);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 1200, "no row re-returned");
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids strictly ascending");
    }

    #[tokio::test]
    async fn descending_traversal_walks_backwards() {
        let store = Arc::new(MemoryTable::new(inventory_rows(30)));
        let config = PaginateConfig::new("inventory_items", "id")
            .with_limit(20)
            .with_direction(SortDirection::Descending);

        let pages: Vec<_> = paginator(&store, config)
            .paginate::<Row>()
            .map(|p| p.expect("traversal succeeds"))
            .collect()
            .await;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows[0].get_i64("id"), Some(30));
        assert_eq!(pages[0].end_cursor, Cursor::After(Value::Int(11)));
        assert_eq!(pages[1].len(), 10);
        assert_eq!(pages[1].rows.last().unwrap().get_i64("id"), Some(1));
    }

    // A source whose size is an exact multiple of the limit ends on an
    // empty follow-up page rather than a short one.
    #[tokio::test]
    async fn exact_multiple_ends_on_empty_page() {
        let store = Arc::new(MemoryTable::new(inventory_rows(1000)));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(500);

        let pages: Vec<_> = paginator(&store, config)
            .paginate::<Row>()
            .map(|p| p.expect("traversal succeeds"))
            .collect()
            .await;

        assert_eq!(pages.len(), 2);
        assert!(!pages[1].is_last, "full page cannot prove exhaustion");
        // Two page queries plus the empty probe.
        assert_eq!(store.query_count(), 3);
    }

    #[tokio::test]
    async fn equality_filters_restrict_traversal_and_bind_parameters() {
        let store = Arc::new(MemoryTable::new(inventory_rows(100)));
        let config = PaginateConfig::new("inventory_items", "id")
            .with_limit(30)
            .with_filter("status", Value::from("active"));

        let items: Vec<InventoryItem> = paginator(&store, config)
            .paginate::<InventoryItem>()
            .map(|p| p.expect("traversal succeeds"))
            .flat_map(|p| futures::stream::iter(p.rows))
            .collect()
            .await;

        assert_eq!(items.len(), 50);
        assert!(items.iter().all(|i| i.status == "active"));
    }

    // getTotal counts filter matches only, independent of pagination limit.
    #[tokio::test]
    async fn total_counts_filtered_rows_only() {
        let store = Arc::new(MemoryTable::new(inventory_rows(1200)));
        let config = PaginateConfig::new("inventory_items", "id")
            .with_limit(5)
            .with_filter("status", Value::from("active"));
        let paginator = paginator(&store, config);

        assert_eq!(paginator.total().await.unwrap(), 600);

        let traversed: usize = paginator
            .paginate::<Row>()
            .map(|p| p.expect("traversal succeeds").len())
            .fold(0, |acc, len| async move { acc + len })
            .await;
        assert_eq!(traversed as u64, paginator.total().await.unwrap());
    }

    #[tokio::test]
    async fn null_filters_do_not_participate() {
        let store = Arc::new(MemoryTable::new(inventory_rows(10)));
        let config = PaginateConfig::new("inventory_items", "id")
            .with_limit(20)
            .with_filter("status", Value::Null);

        let pages: Vec<_> = paginator(&store, config)
            .paginate::<Row>()
            .map(|p| p.expect("traversal succeeds"))
            .collect()
            .await;

        assert_eq!(pages[0].len(), 10);
        let sql = store.queries.lock().unwrap().first().unwrap().clone();
        assert!(!sql.contains("status"), "null filter leaked into SQL: {sql}");
    }

    // Query failures propagate immediately; pagination never retries.
    #[tokio::test]
    async fn query_failure_halts_the_page_sequence() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Ok(inventory_rows(3)),
            Err("connection reset".to_string()),
        ]));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(3);
        let paginator = CursorPaginator::new(executor.clone(), config).unwrap();

        let mut stream = Box::pin(paginator.paginate::<Row>());
        assert!(stream.next().await.unwrap().is_ok());
        let failure = stream.next().await.unwrap();
        assert!(matches!(failure, Err(PaginateError::Query(_))));
        assert_eq!(executor.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_cursor_column_is_reported() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(vec![row(&[(
            "name",
            Value::from("stray"),
        )])])]));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(10);
        let paginator = CursorPaginator::new(executor, config).unwrap();

        let mut stream = Box::pin(paginator.paginate::<Row>());
        let failure = stream.next().await.unwrap();
        assert!(matches!(
            failure,
            Err(PaginateError::MissingCursorColumn { column }) if column == "id"
        ));
    }

    #[tokio::test]
    async fn cancelled_paginator_finishes_cleanly() {
        let store = Arc::new(MemoryTable::new(inventory_rows(100)));
        let cancel = CancellationToken::new();
        let config = PaginateConfig::new("inventory_items", "id").with_limit(10);
        let paginator = CursorPaginator::new(store.clone(), config)
            .unwrap()
            .with_cancellation(cancel.clone());

        let mut stream = Box::pin(paginator.paginate::<Row>());
        assert!(stream.next().await.is_some());
        cancel.cancel();
        assert!(stream.next().await.is_none(), "stream ends at next boundary");
        assert_eq!(store.query_count(), 1);
    }

    fn stream_processor(
        retry_attempts: usize,
        delay: Arc<RecordingDelay>,
        fail_page: Option<usize>,
    ) -> BatchProcessor<Row, i64> {
        let config = BatchConfig {
            retry_attempts,
            retry_base_delay: Duration::from_millis(100),
            ..Default::default()
        };
        BatchProcessor::new(config, move |index, rows: Vec<Row>| {
            let fail = fail_page == Some(index);
            async move {
                if fail {
                    return Err("page transform rejected".into());
                }
                Ok(rows.iter().map(|r| r.get_i64("id").unwrap() * 2).collect())
            }
        })
        .expect("valid batch config")
        .with_delay(delay)
    }

    // Pages flow through transformed one at a time; nothing buffers the
    // full dataset.
    #[tokio::test]
    async fn process_stream_transforms_pages_incrementally() {
        let store = Arc::new(MemoryTable::new(inventory_rows(1200)));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(500);
        let paginator = CursorPaginator::new(store, config).unwrap();
        let processor = stream_processor(0, Arc::new(RecordingDelay::default()), None);

        let pages: Vec<_> = processor
            .process_stream(paginator.paginate::<Row>())
            .map(|p| p.expect("stream succeeds"))
            .collect()
            .await;

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].rows[..3], [2, 4, 6]);
        assert_eq!(pages[2].len(), 200);
        assert_eq!(processor.metrics().snapshot().pages_fetched, 3);
        assert_eq!(processor.metrics().snapshot().items_processed, 1200);
    }

    // The streaming entry point aborts on a permanently failed page, unlike
    // process() which isolates it.
    #[tokio::test]
    async fn process_stream_aborts_on_permanent_page_failure() {
        let store = Arc::new(MemoryTable::new(inventory_rows(1200)));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(500);
        let paginator = CursorPaginator::new(store, config).unwrap();
        let delay = Arc::new(RecordingDelay::default());
        let processor = stream_processor(1, delay.clone(), Some(1));

        let mut stream = Box::pin(processor.process_stream(paginator.paginate::<Row>()));
        assert!(stream.next().await.unwrap().is_ok());
        match stream.next().await.unwrap() {
            Err(StreamError::PageFailed { page, attempts, .. }) => {
                assert_eq!(page, 1);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected PageFailed, got {other:?}"),
        }
        assert_eq!(delay.slept(), vec![Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn process_stream_propagates_source_failure() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Err("socket closed".into())]));
        let config = PaginateConfig::new("inventory_items", "id").with_limit(10);
        let paginator = CursorPaginator::new(executor, config).unwrap();
        let processor = stream_processor(3, Arc::new(RecordingDelay::default()), None);

        let mut stream = Box::pin(processor.process_stream(paginator.paginate::<Row>()));
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(StreamError::Source(PaginateError::Query(_)))
        ));
    }
}
