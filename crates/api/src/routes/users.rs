//! Session and user endpoints.

use serde_json::{Value, json};
use storefront_auth::{SESSION_COOKIE, SESSION_TIMEOUT_SECS};
use storefront_core::ApiError;
use storefront_core::sanitize::StringOptions;

use crate::dispatch::{Failure, HandlerCx};
use crate::models::UserModel;
use crate::response::CookieOptions;
use crate::routes::Reply;

/// GET /auth/session — the authenticated user's account row.
pub async fn session_show(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let user_id = cx.session()?.user_id;

    let result = UserModel::new(cx.db()).read(user_id).await?;
    Ok(Reply::data(result))
}

/// DELETE /auth/session — drop the session for the presented token.
pub async fn session_destroy(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let token = cx
        .request
        .cookie(SESSION_COOKIE)
        .unwrap_or_default()
        .to_string();

    cx.services.authenticator.delete_session(&token).await?;
    cx.response.clear_cookie(SESSION_COOKIE);

    Ok(Reply::data(Value::Null))
}

/// POST /auth/login — verify credentials, then issue the session cookie.
pub async fn login(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let email = cx.request.email("email");
    let password = cx.request.password("password");

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::missing_parameters("Email and password are required").into());
    }

    let model = UserModel::new(cx.db());
    let Some(mut row) = model.login(&email, &password).await? else {
        cx.response.clear_cookie(SESSION_COOKIE);
        return Err(ApiError::not_found("Invalid email or password").into());
    };

    let user_id = row.get("id").and_then(Value::as_i64).unwrap_or(0);
    let session = cx.services.authenticator.create_session(user_id).await?;

    cx.response.cookie(
        SESSION_COOKIE,
        &session.token,
        CookieOptions {
            max_age: Some(SESSION_TIMEOUT_SECS),
            secure: true,
            ..Default::default()
        },
    );

    // Never echo the stored hash.
    row.remove("password");
    Ok(Reply::data(Value::Object(row)))
}

/// POST /auth/logout.
pub async fn logout(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let token = cx
        .request
        .cookie(SESSION_COOKIE)
        .unwrap_or_default()
        .to_string();

    cx.services.authenticator.delete_session(&token).await?;
    cx.response.clear_cookie(SESSION_COOKIE);

    Ok(Reply::with_message(Value::Null, "Logged out successfully"))
}

/// POST /user — register an account.
pub async fn create(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let name = cx.request.string("name", &StringOptions::default());
    let email = cx.request.email("email");
    let password = cx.request.password("password");

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(
            ApiError::missing_parameters("Name, email, and password are required").into(),
        );
    }

    let result = UserModel::new(cx.db()).create(&name, &email, &password).await?;
    Ok(Reply::data(result))
}

/// GET /user/:userId — the session user's account row.
pub async fn show(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let user_id = cx.session()?.user_id;

    if user_id == 0 {
        return Err(ApiError::missing_parameters("User id is required").into());
    }

    let result = UserModel::new(cx.db()).read(user_id).await?;
    Ok(Reply::data(result))
}

/// PUT /user/:userId — update the session user's account, optionally
/// rotating the password.
pub async fn update(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let user_id = cx.session()?.user_id;

    let name = cx.request.string("name", &StringOptions::default());
    let email = cx.request.email("email");
    let password = cx.request.password("password");
    let new_password = cx.request.password("new_password");

    if user_id == 0 || name.is_empty() || email.is_empty() {
        return Err(ApiError::missing_parameters("User ID, name, and email are required").into());
    }

    if !password.is_empty() || !new_password.is_empty() {
        if password.is_empty() || new_password.is_empty() {
            return Err(ApiError::validation("Password is not valid").into());
        }
        if password == new_password {
            return Err(ApiError::validation(
                "Your current password and new password cannot be the same",
            )
            .into());
        }
    }

    let model = UserModel::new(cx.db());
    let Some(result) = model
        .update(user_id, &name, &email, &password, &new_password)
        .await?
    else {
        return Err(ApiError::validation("Failed to update user. Please try again shortly.").into());
    };

    Ok(Reply::data(result))
}

/// DELETE /user/:userId — remove the session user's account.
pub async fn delete(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let user_id = cx.session()?.user_id;

    if user_id == 0 {
        return Err(ApiError::missing_parameters("User ID is required").into());
    }

    let deleted = UserModel::new(cx.db()).delete(user_id).await?;
    if !deleted {
        return Err(ApiError::validation("Failed to delete user").into());
    }

    cx.response.clear_cookie(SESSION_COOKIE);
    Ok(Reply::data(json!(true)))
}

/// POST /user/sendMail — contact-form relay through the mailer
/// collaborator.
pub async fn send_mail(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let name = cx.request.string("name", &StringOptions::default());
    let email = cx.request.email("email");
    let message = cx.request.string("message", &StringOptions::default());

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(
            ApiError::missing_parameters("Name, email, and message are required").into(),
        );
    }

    if let Err(err) = cx.services.mailer.send_contact(&name, &email, &message).await {
        tracing::warn!(error = %err, "contact mail delivery failed");
        return Err(
            ApiError::validation("Failed to send email. Please try again shortly.").into(),
        );
    }

    Ok(Reply::data(json!(true)))
}
