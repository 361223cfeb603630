//! The narrow database contract consumed by resource models.

use async_trait::async_trait;
use storefront_core::ApiResult;

/// A result row as an ordered column-name → JSON-value map.
pub type RowMap = serde_json::Map<String, serde_json::Value>;

/// A bindable statement parameter.
///
/// Every WHERE-clause value goes through a placeholder; the single
/// sanctioned exception is the integer-coerced offset/limit pair in listing
/// queries.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Narrow persistence interface.
///
/// Infrastructure failures surface as `DatabaseConnection` errors; nothing
/// here is retried.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a write statement with bound parameters.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> ApiResult<ExecResult>;

    /// Run a read statement, returning every row.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Vec<RowMap>>;

    /// Run a read statement, returning the first row if any.
    async fn fetch_first(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Option<RowMap>>;

    /// Identifier generated by the most recent insert on this handle.
    fn insert_id(&self) -> u64;
}
