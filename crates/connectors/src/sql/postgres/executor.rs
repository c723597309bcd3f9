use crate::{error::QueryError, executor::QueryExecutor, sql::postgres::params::PgParamStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use model::{core::value::Value, records::row::Row};
use tokio_postgres::{Client, types::Type};
use tracing::error;

/// `QueryExecutor` backed by a tokio-postgres client. The caller owns
/// connecting and driving the connection task; this wrapper only executes.
pub struct PostgresExecutor {
    client: Client,
}

impl PostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects with the default (no-TLS) transport and spawns the
    /// connection driver. TLS setups should build the client themselves and
    /// use `new`.
    pub async fn connect(conn_str: &str) -> Result<Self, QueryError> {
        let (client, connection) = tokio_postgres::connect(conn_str, tokio_postgres::NoTls)
            .await
            .map_err(QueryError::execution)?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "Postgres connection terminated");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        let store = PgParamStore::from_values(params);
        let pg_rows = self
            .client
            .query(sql, &store.as_refs())
            .await
            .map_err(QueryError::execution)?;

        pg_rows.iter().map(decode_row).collect()
    }
}

fn decode_row(pg_row: &tokio_postgres::Row) -> Result<Row, QueryError> {
    let mut row = Row::default();
    for (idx, column) in pg_row.columns().iter().enumerate() {
        row.push(column.name(), decode_cell(pg_row, idx, column)?);
    }
    Ok(row)
}

fn decode_cell(
    pg_row: &tokio_postgres::Row,
    idx: usize,
    column: &tokio_postgres::Column,
) -> Result<Value, QueryError> {
    fn get<'a, T>(
        pg_row: &'a tokio_postgres::Row,
        idx: usize,
        column: &tokio_postgres::Column,
    ) -> Result<Option<T>, QueryError>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        pg_row
            .try_get::<_, Option<T>>(idx)
            .map_err(|err| QueryError::Decode {
                column: column.name().to_string(),
                message: err.to_string(),
            })
    }

    let ty = column.type_();
    let value = if *ty == Type::BOOL {
        get::<bool>(pg_row, idx, column)?.map(Value::Boolean)
    } else if *ty == Type::INT2 {
        get::<i16>(pg_row, idx, column)?.map(|v| Value::Int(v as i64))
    } else if *ty == Type::INT4 {
        get::<i32>(pg_row, idx, column)?.map(|v| Value::Int(v as i64))
    } else if *ty == Type::INT8 {
        get::<i64>(pg_row, idx, column)?.map(Value::Int)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(pg_row, idx, column)?.map(|v| Value::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(pg_row, idx, column)?.map(Value::Float)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        get::<String>(pg_row, idx, column)?.map(Value::String)
    } else if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(pg_row, idx, column)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMP {
        // Naive timestamps are taken as UTC; the traversed sources store
        // UTC wall-clock times.
        get::<NaiveDateTime>(pg_row, idx, column)?.map(|v| Value::Timestamp(v.and_utc()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<serde_json::Value>(pg_row, idx, column)?.map(Value::Json)
    } else {
        return Err(QueryError::UnsupportedType {
            column: column.name().to_string(),
            ty: ty.to_string(),
        });
    };

    Ok(value.unwrap_or(Value::Null))
}
