//! User persistence and credential checks.

use std::sync::Arc;

use serde_json::{Value, json};
use storefront_core::ApiError;
use storefront_infra::{Database, RowMap};

use crate::dispatch::Failure;

pub struct UserModel {
    db: Arc<dyn Database>,
}

impl UserModel {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Resolve credentials to the user's row, or `None` when the email is
    /// unknown or the password does not verify. The row still carries the
    /// stored hash; callers strip it before rendering.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<RowMap>, Failure> {
        let row = self
            .db
            .fetch_first("SELECT * FROM users WHERE email = ? LIMIT 1", &[email.into()])
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hash = row
            .get("password")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match bcrypt::verify(password, hash) {
            Ok(true) => Ok(Some(row)),
            Ok(false) => Ok(None),
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                Ok(None)
            }
        }
    }

    pub async fn create(&self, name: &str, email: &str, password: &str) -> Result<Value, Failure> {
        let existing = self
            .db
            .fetch_first("SELECT * FROM users WHERE email = ? LIMIT 1", &[email.into()])
            .await?;

        if existing.is_some() {
            return Err(ApiError::validation("Email is already in use")
                .with_context("email", email)
                .into());
        }

        let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::from)?;

        let exec = self
            .db
            .execute(
                "INSERT INTO users (name, email, password) VALUES (?, ?, ?)",
                &[name.into(), email.into(), hashed.into()],
            )
            .await?;

        if exec.last_insert_id > 0 {
            Ok(json!({ "id": exec.last_insert_id, "email": email, "name": name }))
        } else {
            Err(ApiError::validation("Failed to create user. Please try again shortly.").into())
        }
    }

    /// Public projection of a user row; an empty array when the row is
    /// missing.
    pub async fn read(&self, id: i64) -> Result<Value, Failure> {
        let row = self
            .db
            .fetch_first("SELECT * FROM users WHERE id = ? LIMIT 1", &[id.into()])
            .await?;

        Ok(match row {
            Some(row) => json!({
                "id": row.get("id").cloned().unwrap_or(Value::Null),
                "name": row.get("name").cloned().unwrap_or(Value::Null),
                "email": row.get("email").cloned().unwrap_or(Value::Null),
            }),
            None => json!([]),
        })
    }

    /// Update name and email, optionally rotating the password after
    /// verifying the current one. Returns `None` when no row changed.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        email: &str,
        password: &str,
        new_password: &str,
    ) -> Result<Option<Value>, Failure> {
        let exec = if !password.is_empty() && !new_password.is_empty() {
            let row = self
                .db
                .fetch_first("SELECT * FROM users WHERE id = ? LIMIT 1", &[id.into()])
                .await?;

            if let Some(row) = row {
                let hash = row
                    .get("password")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !bcrypt::verify(password, hash).unwrap_or(false) {
                    return Err(ApiError::validation("Your current password is invalid").into());
                }
            }

            let hashed =
                bcrypt::hash(new_password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::from)?;

            self.db
                .execute(
                    "UPDATE users SET name = ?, email = ?, password = ? WHERE id = ?",
                    &[name.into(), email.into(), hashed.into(), id.into()],
                )
                .await?
        } else {
            self.db
                .execute(
                    "UPDATE users SET name = ?, email = ? WHERE id = ?",
                    &[name.into(), email.into(), id.into()],
                )
                .await?
        };

        if exec.rows_affected > 0 {
            Ok(Some(json!({ "id": id, "email": email, "name": name })))
        } else {
            Ok(None)
        }
    }

    pub async fn delete(&self, id: i64) -> Result<bool, Failure> {
        let exec = self
            .db
            .execute("DELETE FROM users WHERE id = ?", &[id.into()])
            .await?;
        Ok(exec.rows_affected > 0)
    }
}
