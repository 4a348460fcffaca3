//! Session middleware and request identity
//!
//! The assistant endpoints are staff tools; they run behind
//! `session_middleware`, which validates the `nashir_session` cookie
//! issued by nashir-cms against the shared database. Role checks
//! happen in the handlers.

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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_value_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; nashir_session=tok42; other=x"),
        );
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE),
            Some("tok42".to_string())
        );
    }

    #[test]
    fn test_request_locale_defaults_to_arabic() {
        assert_eq!(request_locale(&HeaderMap::new()), Locale::Ar);
    }

    #[test]
    fn test_request_locale_honors_english() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en;q=0.9"),
        );
        assert_eq!(request_locale(&headers), Locale::En);
    }
}
