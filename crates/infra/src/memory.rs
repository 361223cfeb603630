//! Scripted in-memory [`Database`] for tests and development wiring.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use storefront_core::{ApiError, ApiResult};

use crate::database::{Database, ExecResult, RowMap, SqlValue};

/// Stubbed outcome for a statement whose text starts with a given prefix.
#[derive(Debug, Clone)]
enum Outcome {
    Rows(Vec<RowMap>),
    Exec(ExecResult),
    Fail(String),
}

#[derive(Debug)]
struct Stub {
    prefix: String,
    outcome: Outcome,
}

/// In-memory database double.
///
/// Stubs are consumed FIFO: the first stub whose prefix matches the
/// statement answers it and is removed, so repeated statements can be given
/// different answers in sequence. Unmatched reads return no rows and
/// unmatched writes affect no rows. Every call is recorded.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    stubs: Mutex<VecDeque<Stub>>,
    calls: Mutex<Vec<(String, Vec<SqlValue>)>>,
    last_insert_id: AtomicU64,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next statement starting with `prefix` with these rows.
    pub fn stub_rows(&self, prefix: &str, rows: Vec<RowMap>) {
        self.push(prefix, Outcome::Rows(rows));
    }

    /// Answer the next statement starting with `prefix` with a write result.
    pub fn stub_exec(&self, prefix: &str, rows_affected: u64, last_insert_id: u64) {
        self.push(
            prefix,
            Outcome::Exec(ExecResult {
                rows_affected,
                last_insert_id,
            }),
        );
    }

    /// Fail the next statement starting with `prefix`.
    pub fn stub_failure(&self, prefix: &str, message: &str) {
        self.push(prefix, Outcome::Fail(message.to_string()));
    }

    /// Every statement issued so far, in order.
    pub fn recorded(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.calls.lock().expect("memory db lock").clone()
    }

    fn push(&self, prefix: &str, outcome: Outcome) {
        self.stubs.lock().expect("memory db lock").push_back(Stub {
            prefix: prefix.to_string(),
            outcome,
        });
    }

    fn take(&self, sql: &str) -> Option<Outcome> {
        let mut stubs = self.stubs.lock().expect("memory db lock");
        let position = stubs.iter().position(|s| sql.starts_with(&s.prefix))?;
        stubs.remove(position).map(|s| s.outcome)
    }

    fn record(&self, sql: &str, params: &[SqlValue]) {
        self.calls
            .lock()
            .expect("memory db lock")
            .push((sql.to_string(), params.to_vec()));
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> ApiResult<ExecResult> {
        self.record(sql, params);
        match self.take(sql) {
            Some(Outcome::Exec(result)) => {
                if result.last_insert_id > 0 {
                    self.last_insert_id
                        .store(result.last_insert_id, Ordering::Relaxed);
                }
                Ok(result)
            }
            Some(Outcome::Fail(message)) => Err(ApiError::database_connection(message)),
            _ => Ok(ExecResult::default()),
        }
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Vec<RowMap>> {
        self.record(sql, params);
        match self.take(sql) {
            Some(Outcome::Rows(rows)) => Ok(rows),
            Some(Outcome::Fail(message)) => Err(ApiError::database_connection(message)),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_first(&self, sql: &str, params: &[SqlValue]) -> ApiResult<Option<RowMap>> {
        let rows = self.query(sql, params).await?;
        Ok(rows.into_iter().next())
    }

    fn insert_id(&self) -> u64 {
        self.last_insert_id.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_core::ErrorKind;

    fn row(pairs: &[(&str, serde_json::Value)]) -> RowMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn stubs_answer_in_fifo_order() {
        let db = MemoryDatabase::new();
        db.stub_rows("SELECT * FROM users", vec![]);
        db.stub_rows("SELECT * FROM users", vec![row(&[("id", json!(1))])]);

        let first = db.query("SELECT * FROM users WHERE email = ?", &[]).await.unwrap();
        let second = db.query("SELECT * FROM users WHERE email = ?", &[]).await.unwrap();

        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn unmatched_statements_degrade_to_empty_results() {
        let db = MemoryDatabase::new();

        let rows = db.query("SELECT * FROM orders", &[]).await.unwrap();
        assert!(rows.is_empty());

        let exec = db.execute("DELETE FROM orders WHERE id = ?", &[SqlValue::Int(1)]).await.unwrap();
        assert_eq!(exec.rows_affected, 0);
    }

    #[tokio::test]
    async fn exec_stub_updates_insert_id() {
        let db = MemoryDatabase::new();
        db.stub_exec("INSERT INTO users", 1, 42);

        let exec = db.execute("INSERT INTO users (name) VALUES (?)", &[]).await.unwrap();
        assert_eq!(exec.last_insert_id, 42);
        assert_eq!(db.insert_id(), 42);
    }

    #[tokio::test]
    async fn failure_stub_raises_database_connection() {
        let db = MemoryDatabase::new();
        db.stub_failure("SELECT", "connection refused");

        let err = db.query("SELECT 1", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DatabaseConnection);
    }

    #[tokio::test]
    async fn calls_are_recorded_with_params() {
        let db = MemoryDatabase::new();
        db.query("SELECT * FROM products WHERE id = ?", &[SqlValue::Int(3)])
            .await
            .unwrap();

        let recorded = db.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, vec![SqlValue::Int(3)]);
    }
}
