//! Session middleware and request identity
//!
//! Campaign management is a staff surface; those routes run behind
//! `session_middleware`, which validates the `nashir_session` cookie
//! issued by nashir-cms against the shared database. The serving and
//! tracking endpoints are public and never touch this layer.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use nashir_common::auth::{validate_session, SESSION_COOKIE};
use nashir_common::db::models::User;
use nashir_common::locale::{negotiate, Locale, Message};

use crate::error::ApiError;
use crate::AppState;

/// Authenticated user for the current request
///
/// Inserted by `session_middleware`; handlers extract it with
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Read one cookie value from the Cookie header
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Negotiate the response locale from Accept-Language
pub fn request_locale(headers: &HeaderMap) -> Locale {
    negotiate(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    )
}

/// Localized 404 body
pub fn not_found(locale: Locale) -> ApiError {
    ApiError::NotFound(Message::NotFound.text(locale).to_string())
}

/// Author, editor or admin
pub fn require_staff(user: &User, locale: Locale) -> Result<(), ApiError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(Message::Forbidden.text(locale).to_string()))
    }
}

/// Session validation middleware for protected routes
///
/// Rejects requests without a valid session with a localized 401. The
/// session's expiry slides forward on every validated request.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = request_locale(request.headers());

    let user = match cookie_value(request.headers(), SESSION_COOKIE) {
        Some(token) => validate_session(&state.db, &token).await?,
        None => None,
    };

    match user {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        None => Err(ApiError::Unauthorized(
            Message::SessionRequired.text(locale).to_string(),
        )),
    }
}
