use crate::{error::QueryError, sql::ident};
use model::{
    core::value::Value,
    pagination::cursor::{Cursor, SortDirection},
};
use std::fmt::Write;

/// SQL text plus its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Renders one page of a cursor traversal:
/// `SELECT * FROM t WHERE f1 = $1 AND ... AND cur > $k ORDER BY cur ASC LIMIT n`.
///
/// Equality filters are ANDed; filters carrying `Value::Null` are skipped
/// entirely (absent, not `IS NULL`). The cursor predicate, when present,
/// binds last.
pub fn page_query(
    table: &str,
    cursor_column: &str,
    direction: SortDirection,
    limit: usize,
    filters: &[(String, Value)],
    cursor: &Cursor,
) -> Result<RenderedQuery, QueryError> {
    let table = ident::validate(table)?;
    let cursor_column = ident::validate(cursor_column)?;

    let mut sql = format!("SELECT * FROM {table}");
    let mut params = Vec::new();

    append_filters(&mut sql, &mut params, filters)?;

    if let Some(boundary) = cursor.value() {
        sql.push_str(if params.is_empty() { " WHERE " } else { " AND " });
        params.push(boundary.clone());
        write!(
            sql,
            "{cursor_column} {} ${}",
            direction.comparison_operator(),
            params.len()
        )
        .expect("write to string");
    }

    write!(
        sql,
        " ORDER BY {cursor_column} {} LIMIT {limit}",
        direction.order_keyword()
    )
    .expect("write to string");

    Ok(RenderedQuery { sql, params })
}

/// Renders the progress-reporting count: equality filters only, cursor
/// state never participates.
pub fn count_query(
    table: &str,
    filters: &[(String, Value)],
) -> Result<RenderedQuery, QueryError> {
    let table = ident::validate(table)?;

    let mut sql = format!("SELECT COUNT(*) AS total FROM {table}");
    let mut params = Vec::new();
    append_filters(&mut sql, &mut params, filters)?;

    Ok(RenderedQuery { sql, params })
}

fn append_filters(
    sql: &mut String,
    params: &mut Vec<Value>,
    filters: &[(String, Value)],
) -> Result<(), QueryError> {
    for (column, value) in filters {
        if value.is_null() {
            continue;
        }
        let column = ident::validate(column)?;
        sql.push_str(if params.is_empty() { " WHERE " } else { " AND " });
        params.push(value.clone());
        write!(sql, "{column} = ${}", params.len()).expect("write to string");
    }
    Ok(())
}
