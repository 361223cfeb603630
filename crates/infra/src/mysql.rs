//! MySQL-backed [`Database`] implementation over a sqlx pool.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};
use storefront_core::{ApiError, ApiResult};

use crate::database::{Database, ExecResult, RowMap, SqlValue};

/// Production database handle. Connections are borrowed from the pool for
/// the duration of a single statement and returned at scope exit on every
/// path.
pub struct MySqlDatabase {
    pool: MySqlPool,
    last_insert_id: AtomicU64,
}

impl MySqlDatabase {
    /// Connect lazily-sized pool to the given MySQL URL.
    pub async fn connect(url: &str) -> ApiResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(connection_error)?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool,
            last_insert_id: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> ApiResult<ExecResult> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(connection_error)?;

        let exec = ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        };
        if exec.last_insert_id > 0 {
            self.last_insert_id.store(exec.last_insert_id, Ordering::Relaxed);
        }
        Ok(exec)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Vec<RowMap>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(connection_error)?;

        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn fetch_first(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Option<RowMap>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(connection_error)?;

        Ok(row.as_ref().map(row_to_map))
    }

    fn insert_id(&self) -> u64 {
        self.last_insert_id.load(Ordering::Relaxed)
    }
}

fn connection_error(err: sqlx::Error) -> ApiError {
    tracing::error!(error = %err, "database call failed");
    ApiError::database_connection(err.to_string())
}

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>;

fn bind_params<'q>(mut query: MySqlQuery<'q>, params: &[SqlValue]) -> MySqlQuery<'q> {
    for param in params {
        query = match param {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

fn row_to_map(row: &MySqlRow) -> RowMap {
    let mut map = RowMap::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    map
}

/// Decode a column into a JSON value by MySQL type name. Decode failures
/// degrade to null rather than failing the whole row.
fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .and_then(|v| serde_json::Number::from_f64(v as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "DECIMAL" => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "JSON" => row
            .try_get::<Option<Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .or_else(|_| row.try_get_unchecked::<Option<String>, _>(index))
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
