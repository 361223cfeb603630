//! Session lifecycle: issuance, validation, revocation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use storefront_core::{ApiError, ApiResult};

use crate::store::{Session, SessionStore, SessionStoreError};
use crate::token;

/// Name of the session cookie. Fixed across the API.
pub const SESSION_COOKIE: &str = "storefront_session";

/// Session lifetime: 14 days.
pub const SESSION_TIMEOUT_SECS: i64 = 60 * 60 * 24 * 14;

/// The authenticated identity bound to a request after token validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: i64,
    pub token: String,
}

/// Issues, validates, and revokes session tokens against a [`SessionStore`].
#[derive(Clone)]
pub struct SessionAuthenticator {
    store: Arc<dyn SessionStore>,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Create a session for `user_id`, replacing any session the user
    /// already holds. Returns the stored session so the caller can set the
    /// cookie.
    pub async fn create_session(&self, user_id: i64) -> ApiResult<Session> {
        let session = Session {
            token: token::generate(),
            user_id,
            expires_at: Utc::now() + Duration::seconds(SESSION_TIMEOUT_SECS),
        };

        self.store
            .upsert(session.clone())
            .await
            .map_err(store_error)?;

        tracing::debug!(user_id, "session created");
        Ok(session)
    }

    /// Validate a presented token and resolve it to a user.
    ///
    /// The allow-list character check runs before any store access; a
    /// missing, malformed, or unknown token raises an `Authentication`
    /// error. Expired rows are reported absent by the store.
    pub async fn authenticate(&self, token: Option<&str>) -> ApiResult<AuthSession> {
        let token = token.unwrap_or_default();

        if !token::is_well_formed(token) {
            return Err(ApiError::authentication(
                "Invalid or missing authentication token",
            ));
        }

        match self.store.find(token).await.map_err(store_error)? {
            Some(session) => Ok(AuthSession {
                user_id: session.user_id,
                token: session.token,
            }),
            None => Err(ApiError::authentication("Session not found")),
        }
    }

    /// Remove the session row for `token`. Absence is not an error.
    pub async fn delete_session(&self, token: &str) -> ApiResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.store.delete(token).await.map_err(store_error)
    }
}

fn store_error(err: SessionStoreError) -> ApiError {
    ApiError::database_connection(err.to_string())
}
