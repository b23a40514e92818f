use async_trait::async_trait;
use thiserror::Error;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use super::schema::Row;

/// Failure reported by the engine for a single statement. The message is the
/// underlying driver/engine text, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<tiberius::error::Error> for QueryError {
    fn from(err: tiberius::error::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// A live SQL session.
///
/// This is the one handle every relational component borrows: the
/// introspector, the query gateway and the entity stores all take
/// `&mut dyn SqlSession`, so tests can substitute a scripted fake and the
/// application wires in [`TiberiusSession`].
#[async_trait]
pub trait SqlSession: Send {
    /// Run a statement that produces rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, QueryError>;

    /// Run a statement that mutates data; returns the engine-reported
    /// affected-row count.
    async fn execute(&mut self, sql: &str) -> Result<u64, QueryError>;
}

/// Production session over a tiberius SQL Server client.
pub struct TiberiusSession {
    client: Client<Compat<TcpStream>>,
}

impl TiberiusSession {
    pub(crate) fn from_client(client: Client<Compat<TcpStream>>) -> Self {
        Self { client }
    }

    /// Convert a tiberius row into our ordered Row map.
    fn row_to_map(row: &tiberius::Row) -> Row {
        let mut map = Row::new();
        for col in row.columns() {
            let name = col.name().to_string();
            let value = Self::column_to_json(row, col);
            map.insert(name, value);
        }
        map
    }

    /// Convert a single tiberius column value to serde_json::Value.
    fn column_to_json(row: &tiberius::Row, col: &tiberius::Column) -> serde_json::Value {
        use tiberius::ColumnType;

        match col.column_type() {
            ColumnType::Null => serde_json::Value::Null,
            ColumnType::Bit | ColumnType::Bitn => match row.try_get::<bool, _>(col.name()) {
                Ok(Some(v)) => serde_json::Value::Bool(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int1 => match row.try_get::<u8, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int2 => match row.try_get::<i16, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int4 => match row.try_get::<i32, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Int8 => match row.try_get::<i64, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Intn => {
                if let Ok(Some(v)) = row.try_get::<i64, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<i32, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<i16, _>(col.name()) {
                    serde_json::json!(v)
                } else {
                    serde_json::Value::Null
                }
            }
            ColumnType::Float4 => match row.try_get::<f32, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Float8 => match row.try_get::<f64, _>(col.name()) {
                Ok(Some(v)) => serde_json::json!(v),
                _ => serde_json::Value::Null,
            },
            ColumnType::Floatn => {
                if let Ok(Some(v)) = row.try_get::<f64, _>(col.name()) {
                    serde_json::json!(v)
                } else if let Ok(Some(v)) = row.try_get::<f32, _>(col.name()) {
                    serde_json::json!(v)
                } else {
                    serde_json::Value::Null
                }
            }
            ColumnType::Numericn | ColumnType::Decimaln => {
                match row.try_get::<f64, _>(col.name()) {
                    Ok(Some(v)) => serde_json::json!(v),
                    _ => match row.try_get::<&str, _>(col.name()) {
                        Ok(Some(v)) => serde_json::Value::String(v.to_string()),
                        _ => serde_json::Value::Null,
                    },
                }
            }
            _ => {
                // String/text/date/binary/guid types are read as strings.
                match row.try_get::<&str, _>(col.name()) {
                    Ok(Some(v)) => serde_json::Value::String(v.to_string()),
                    _ => serde_json::Value::Null,
                }
            }
        }
    }
}

#[async_trait]
impl SqlSession for TiberiusSession {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, QueryError> {
        let stream = self.client.simple_query(sql).await?;
        let rows = stream.into_first_result().await?;
        Ok(rows.iter().map(Self::row_to_map).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, QueryError> {
        let result = self.client.execute(sql, &[]).await?;
        Ok(result.total())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::*;

    /// Scripted in-memory session. Components under test run against this
    /// instead of a live server: queued results are handed out in order, and
    /// every statement is recorded for assertions.
    #[derive(Default)]
    pub(crate) struct FakeSession {
        pub queries: Vec<String>,
        pub executes: Vec<String>,
        query_results: VecDeque<Result<Vec<Row>, QueryError>>,
        execute_results: VecDeque<Result<u64, QueryError>>,
    }

    impl FakeSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_rows(&mut self, rows: Vec<Row>) {
            self.query_results.push_back(Ok(rows));
        }

        pub fn push_query_error(&mut self, message: &str) {
            self.query_results
                .push_back(Err(QueryError::new(message)));
        }

        pub fn push_affected(&mut self, count: u64) {
            self.execute_results.push_back(Ok(count));
        }

        pub fn push_execute_error(&mut self, message: &str) {
            self.execute_results
                .push_back(Err(QueryError::new(message)));
        }

        pub fn statement_count(&self) -> usize {
            self.queries.len() + self.executes.len()
        }
    }

    /// Build a Row from key/value pairs, keeping the given order.
    pub(crate) fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[async_trait]
    impl SqlSession for FakeSession {
        async fn query(&mut self, sql: &str) -> Result<Vec<Row>, QueryError> {
            self.queries.push(sql.to_string());
            self.query_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn execute(&mut self, sql: &str) -> Result<u64, QueryError> {
            self.executes.push(sql.to_string());
            self.execute_results.pop_front().unwrap_or(Ok(0))
        }
    }
}
