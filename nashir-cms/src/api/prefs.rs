//! Per-user preferences
//!
//! Accessibility and display settings stored per account: font scale,
//! high contrast, reduced motion, speech rate, interface locale and
//! lite-feed autoplay. Keys outside the whitelist get a localized 400.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use nashir_common::locale::Message;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::session::{request_locale, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

const ALLOWED_KEYS: &[&str] = &[
    "font_scale",
    "high_contrast",
    "reduce_motion",
    "tts_rate",
    "locale",
    "lite_autoplay",
];

/// GET /api/prefs
///
/// The calling user's preference map. Unset keys are simply absent.
pub async fn get_prefs(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM user_prefs WHERE user_id = ? ORDER BY key")
            .bind(&user.guid)
            .fetch_all(&state.db)
            .await?;

    let mut map = Map::new();
    for (key, value) in rows {
        map.insert(key, Value::String(value));
    }
    Ok(Json(Value::Object(map)))
}

#[derive(Debug, Deserialize)]
pub struct SetPrefRequest {
    pub key: String,
    pub value: String,
}

/// PUT /api/prefs
pub async fn set_pref(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<SetPrefRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);

    if !ALLOWED_KEYS.contains(&req.key.as_str()) {
        return Err(ApiError::BadRequest(
            Message::UnknownPreference.text(locale).to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO user_prefs (user_id, key, value, updated_at)
        VALUES (?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&user.guid)
    .bind(&req.key)
    .bind(&req.value)
    .execute(&state.db)
    .await?;

    get_prefs(State(state), Extension(CurrentUser(user))).await
}
