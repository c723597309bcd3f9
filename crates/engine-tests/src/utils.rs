#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{error::QueryError, executor::QueryExecutor};
use engine_core::clock::Delay;
use model::{
    core::value::Value,
    records::row::Row,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

/// Builds a result row from (column, value) pairs.
pub fn row(cells: &[(&str, Value)]) -> Row {
    cells
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Seeds the canonical inventory fixture: `count` rows with unique
/// ascending ids, alternating active/inactive status.
pub fn inventory_rows(count: i64) -> Vec<Row> {
    (1..=count)
        .map(|id| {
            row(&[
                ("id", Value::Int(id)),
                (
                    "status",
                    Value::from(if id % 2 == 0 { "active" } else { "inactive" }),
                ),
                ("name", Value::from(format!("item-{id}").as_str())),
            ])
        })
        .collect()
}

/// In-memory stand-in for the relational store. Interprets exactly the SQL
/// shapes the engine renders (`SELECT * … WHERE … ORDER BY … LIMIT` and
/// `SELECT COUNT(*) AS total …`), applying bound parameters the way the
/// store would, so traversal behavior is exercised end to end.
pub struct MemoryTable {
    rows: Vec<Row>,
    pub queries: Mutex<Vec<String>>,
}

impl MemoryTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn matching_rows(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        let conditions = parse_conditions(sql);
        self.rows
            .iter()
            .filter(|row| {
                conditions.iter().all(|(column, op, param_idx)| {
                    let cell = row.get_value(column);
                    let bound = &params[*param_idx - 1];
                    match *op {
                        "=" => &cell == bound,
                        ">" => cell.partial_cmp(bound) == Some(std::cmp::Ordering::Greater),
                        "<" => cell.partial_cmp(bound) == Some(std::cmp::Ordering::Less),
                        other => panic!("unexpected operator {other:?} in {sql}"),
                    }
                })
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QueryExecutor for MemoryTable {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        self.queries.lock().unwrap().push(sql.to_string());

        if sql.starts_with("SELECT COUNT(*) AS total") {
            let total = self.matching_rows(sql, params).len() as i64;
            return Ok(vec![row(&[("total", Value::Int(total))])]);
        }

        let mut rows = self.matching_rows(sql, params);
        if let Some((column, descending)) = parse_order_by(sql) {
            rows.sort_by(|a, b| {
                let ordering = a
                    .get_value(&column)
                    .partial_cmp(&b.get_value(&column))
                    .expect("order column must be comparable");
                if descending { ordering.reverse() } else { ordering }
            });
        }
        if let Some(limit) = parse_limit(sql) {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

/// Extracts `(column, operator, placeholder index)` triples from the WHERE
/// clause of engine-rendered SQL.
fn parse_conditions(sql: &str) -> Vec<(String, &'static str, usize)> {
    let Some(start) = sql.find(" WHERE ") else {
        return Vec::new();
    };
    let clause = &sql[start + " WHERE ".len()..];
    let clause = clause.split(" ORDER BY ").next().unwrap_or(clause);

    clause
        .split(" AND ")
        .map(|condition| {
            let mut parts = condition.split_whitespace();
            let column = parts.next().expect("condition column").to_string();
            let op = match parts.next().expect("condition operator") {
                "=" => "=",
                ">" => ">",
                "<" => "<",
                other => panic!("unexpected operator {other:?} in {sql}"),
            };
            let placeholder = parts.next().expect("condition placeholder");
            let param_idx: usize = placeholder
                .trim_start_matches('$')
                .parse()
                .expect("placeholder index");
            (column, op, param_idx)
        })
        .collect()
}

fn parse_order_by(sql: &str) -> Option<(String, bool)> {
    let start = sql.find(" ORDER BY ")?;
    let clause = &sql[start + " ORDER BY ".len()..];
    let mut parts = clause.split_whitespace();
    let column = parts.next()?.to_string();
    let descending = parts.next() == Some("DESC");
    Some((column, descending))
}

fn parse_limit(sql: &str) -> Option<usize> {
    let start = sql.find(" LIMIT ")?;
    sql[start + " LIMIT ".len()..]
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// Executor that replays a scripted sequence of responses in call order and
/// records every call. Panics when the script runs dry.
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Result<Vec<Row>, String>>>,
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedExecutor {
    pub fn new(responses: Vec<Result<Vec<Row>, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted query: {sql}"));
        next.map_err(|message| QueryError::execution(std::io::Error::other(message)))
    }
}

/// Executor keyed by exact SQL text, for fan-out tests where call order is
/// not fixed.
pub struct KeyedExecutor {
    responses: HashMap<String, Result<Vec<Row>, String>>,
}

impl KeyedExecutor {
    pub fn new(responses: Vec<(&str, Result<Vec<Row>, String>)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(sql, outcome)| (sql.to_string(), outcome))
                .collect(),
        }
    }
}

#[async_trait]
impl QueryExecutor for KeyedExecutor {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, QueryError> {
        match self.responses.get(sql) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(QueryError::execution(std::io::Error::other(
                message.clone(),
            ))),
            None => panic!("no response keyed for query: {sql}"),
        }
    }
}

/// Delay that records what it was asked to sleep and returns immediately,
/// making backoff sequences assertable without wall-clock time.
#[derive(Default)]
pub struct RecordingDelay {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
