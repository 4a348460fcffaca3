//! Authentication endpoints
//!
//! Cookie-based login/logout plus the password reset flow
//! [REQ-AUTH-050], [REQ-AUTH-060]. There is no mail relay, so the reset
//! token is returned in the response body and logged.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use nashir_common::auth::{
    authenticate, consume_password_reset, create_session, destroy_session, issue_password_reset,
    validate_session, SESSION_COOKIE,
};
use nashir_common::config::get_setting_i64;
use nashir_common::locale::Message;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::session::{cookie_value, request_locale, session_cookie};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm: String,
}

/// POST /api/auth/login
///
/// Sets the session cookie on success. Bad credentials, unknown and
/// inactive accounts all get the same localized 401.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let locale = request_locale(&headers);

    let user = authenticate(&state.db, &req.username, &req.password)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthorized(Message::InvalidCredentials.text(locale).to_string())
        })?;

    let token = create_session(&state.db, &user.guid).await?;
    let timeout = get_setting_i64(&state.db, "session_timeout_seconds", 31_536_000).await?;

    info!("User {} logged in", user.username);

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, timeout))],
        Json(user),
    ))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        destroy_session(&state.db, &token).await?;
    }

    Ok((
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(json!({ "status": "logged_out" })),
    ))
}

/// GET /api/auth/me
///
/// Public: answers with the session user or an anonymous marker, never 401.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>> {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        if let Some(user) = validate_session(&state.db, &token).await? {
            return Ok(Json(json!({ "anonymous": false, "user": user })));
        }
    }
    Ok(Json(json!({ "anonymous": true })))
}

/// POST /api/auth/request-reset
///
/// Responds 200 whether or not the account exists, so the endpoint
/// cannot be used to probe for registered addresses. The token field is
/// null for unknown accounts.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(req): Json<RequestResetRequest>,
) -> Result<Json<Value>> {
    match issue_password_reset(&state.db, &req.email).await? {
        Some(token) => {
            info!("Password reset token for {}: {}", req.email, token);
            Ok(Json(json!({ "reset_token": token })))
        }
        None => Ok(Json(json!({ "reset_token": Value::Null }))),
    }
}

/// POST /api/auth/reset-password
///
/// 400 on mismatched or too-short passwords, 401 on an invalid, expired
/// or already-used token. Success revokes all of the user's sessions.
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);

    if req.password != req.confirm {
        return Err(ApiError::BadRequest(
            Message::PasswordMismatch.text(locale).to_string(),
        ));
    }

    let min_chars = get_setting_i64(&state.db, "min_password_chars", 8).await?;
    if (req.password.chars().count() as i64) < min_chars {
        return Err(ApiError::BadRequest(
            Message::PasswordTooShort.text(locale).to_string(),
        ));
    }

    if consume_password_reset(&state.db, &req.token, &req.password).await? {
        Ok(Json(json!({ "status": "password_updated" })))
    } else {
        Err(ApiError::Unauthorized(
            Message::ResetTokenInvalid.text(locale).to_string(),
        ))
    }
}
