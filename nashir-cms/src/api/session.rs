//! Session middleware and request identity
//!
//! Protected routes run behind `session_middleware`, which validates the
//! `nashir_session` cookie and attaches the user to request extensions.
//! Role checks happen in the handlers; this layer only establishes WHO
//! is calling.

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

/// Build the Set-Cookie value for a session token
///
/// `max_age_seconds = 0` clears the cookie on logout.
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

// ========================================
// Role Checks
// ========================================

/// Localized 404 body
pub fn not_found(locale: Locale) -> ApiError {
    ApiError::NotFound(Message::NotFound.text(locale).to_string())
}

fn forbidden(locale: Locale) -> ApiError {
    ApiError::Forbidden(Message::Forbidden.text(locale).to_string())
}

/// Author, editor or admin
pub fn require_staff(user: &User, locale: Locale) -> Result<(), ApiError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(forbidden(locale))
    }
}

/// Editor or admin
pub fn require_editor(user: &User, locale: Locale) -> Result<(), ApiError> {
    if user.can_edit_any_article() {
        Ok(())
    } else {
        Err(forbidden(locale))
    }
}

/// Admin only
pub fn require_admin(user: &User, locale: Locale) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(forbidden(locale))
    }
}

/// Resolve a staff user from the session cookie, if any
///
/// For public endpoints that show extra content to logged-in staff
/// (draft article detail). Readers and anonymous visitors get `None`.
pub async fn staff_session(state: &AppState, headers: &HeaderMap) -> crate::error::Result<Option<User>> {
    if let Some(token) = cookie_value(headers, SESSION_COOKIE) {
        if let Some(user) = validate_session(&state.db, &token).await? {
            if user.is_staff() {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_value_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; nashir_session=abc123; other=x"),
        );
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_cookie_value_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), None);
        assert_eq!(cookie_value(&HeaderMap::new(), SESSION_COOKIE), None);
    }

    #[test]
    fn test_request_locale_defaults_to_arabic() {
        assert_eq!(request_locale(&HeaderMap::new()), Locale::Ar);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en;q=0.9,ar;q=0.5"),
        );
        assert_eq!(request_locale(&headers), Locale::En);
    }

    #[test]
    fn test_session_cookie_shape() {
        let cookie = session_cookie("tok", 3600);
        assert_eq!(
            cookie,
            "nashir_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"
        );
        assert!(session_cookie("x", 0).contains("Max-Age=0"));
    }
}
