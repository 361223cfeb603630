//! SQL-backed session store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use storefront_auth::{Session, SessionStore, SessionStoreError};

use crate::database::{Database, SqlValue};

/// Session persistence over the [`Database`] collaborator.
///
/// The upsert keys on the user: `ON DUPLICATE KEY UPDATE` replaces the
/// user's prior token in a single statement, which doubles as the
/// conflict-free concurrent-login path for one user.
pub struct SqlSessionStore {
    db: Arc<dyn Database>,
}

impl SqlSessionStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn upsert(&self, session: Session) -> Result<(), SessionStoreError> {
        let expires = mysql_datetime(session.expires_at);
        self.db
            .execute(
                "INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE token = ?, expires_at = ?",
                &[
                    SqlValue::Int(session.user_id),
                    SqlValue::Text(session.token.clone()),
                    SqlValue::Text(expires.clone()),
                    SqlValue::Text(session.token),
                    SqlValue::Text(expires),
                ],
            )
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>, SessionStoreError> {
        // Expired rows are filtered here so they are indistinguishable from
        // absent ones.
        let row = self
            .db
            .fetch_first(
                "SELECT user_id, token, expires_at FROM sessions \
                 WHERE token = ? AND expires_at > ? LIMIT 1",
                &[
                    SqlValue::Text(token.to_string()),
                    SqlValue::Text(mysql_datetime(Utc::now())),
                ],
            )
            .await
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_id = row.get("user_id").and_then(|v| v.as_i64()).unwrap_or(0);
        let expires_at = row
            .get("expires_at")
            .and_then(|v| v.as_str())
            .and_then(parse_mysql_datetime);

        match expires_at {
            Some(expires_at) => Ok(Some(Session {
                token: token.to_string(),
                user_id,
                expires_at,
            })),
            None => {
                tracing::warn!(token_len = token.len(), "session row has unreadable expiry");
                Ok(None)
            }
        }
    }

    async fn delete(&self, token: &str) -> Result<(), SessionStoreError> {
        self.db
            .execute(
                "DELETE FROM sessions WHERE token = ?",
                &[SqlValue::Text(token.to_string())],
            )
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(err: storefront_core::ApiError) -> SessionStoreError {
    SessionStoreError::Unavailable(err.to_string())
}

fn mysql_datetime(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_mysql_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use chrono::Duration;
    use serde_json::json;

    fn store_with_db() -> (SqlSessionStore, Arc<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        (SqlSessionStore::new(db.clone()), db)
    }

    #[tokio::test]
    async fn upsert_issues_on_duplicate_key_update() {
        let (store, db) = store_with_db();
        db.stub_exec("INSERT INTO sessions", 1, 0);

        store
            .upsert(Session {
                token: "tok123".to_string(),
                user_id: 8,
                expires_at: Utc::now() + Duration::days(14),
            })
            .await
            .unwrap();

        let recorded = db.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].0.contains("ON DUPLICATE KEY UPDATE"));
        assert_eq!(recorded[0].1[0], SqlValue::Int(8));
    }

    #[tokio::test]
    async fn find_filters_expiry_in_the_query() {
        let (store, db) = store_with_db();
        let expires = mysql_datetime(Utc::now() + Duration::days(1));
        db.stub_rows(
            "SELECT user_id, token, expires_at FROM sessions",
            vec![
                [
                    ("user_id".to_string(), json!(42)),
                    ("token".to_string(), json!("tok123")),
                    ("expires_at".to_string(), json!(expires)),
                ]
                .into_iter()
                .collect(),
            ],
        );

        let session = store.find("tok123").await.unwrap().unwrap();
        assert_eq!(session.user_id, 42);

        let recorded = db.recorded();
        assert!(recorded[0].0.contains("expires_at > ?"));
    }

    #[tokio::test]
    async fn find_miss_returns_none() {
        let (store, _db) = store_with_db();
        assert!(store.find("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_targets_the_token_row() {
        let (store, db) = store_with_db();
        store.delete("tok123").await.unwrap();

        let recorded = db.recorded();
        assert_eq!(recorded[0].0, "DELETE FROM sessions WHERE token = ?");
        assert_eq!(recorded[0].1, vec![SqlValue::Text("tok123".to_string())]);
    }
}
