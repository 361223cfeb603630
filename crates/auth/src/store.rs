//! Session store trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A server-side session row: opaque token, owning user, expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session store failure. Surfaces to clients as a `DatabaseConnection`
/// error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract for sessions.
///
/// One active session per user: `upsert` replaces any prior token held by
/// `session.user_id`. `find` must treat expired rows as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn upsert(&self, session: Session) -> Result<(), SessionStoreError>;

    async fn find(&self, token: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Idempotent: deleting an unknown token is not an error.
    async fn delete(&self, token: &str) -> Result<(), SessionStoreError>;
}

/// In-memory session store for development and tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_token: HashMap<String, Session>,
    token_by_user: HashMap<i64, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session row directly, bypassing the one-per-user upsert.
    /// Test hook for seeding expired or hand-built rows.
    pub fn insert_raw(&self, session: Session) {
        let mut inner = self.inner.lock().expect("session store lock");
        inner
            .token_by_user
            .insert(session.user_id, session.token.clone());
        inner.by_token.insert(session.token.clone(), session);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session store lock").by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert(&self, session: Session) -> Result<(), SessionStoreError> {
        let mut inner = self.inner.lock().expect("session store lock");
        if let Some(previous) = inner.token_by_user.insert(session.user_id, session.token.clone()) {
            inner.by_token.remove(&previous);
        }
        inner.by_token.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>, SessionStoreError> {
        let inner = self.inner.lock().expect("session store lock");
        let found = inner
            .by_token
            .get(token)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned();
        Ok(found)
    }

    async fn delete(&self, token: &str) -> Result<(), SessionStoreError> {
        let mut inner = self.inner.lock().expect("session store lock");
        if let Some(session) = inner.by_token.remove(token) {
            inner.token_by_user.remove(&session.user_id);
        }
        Ok(())
    }
}
