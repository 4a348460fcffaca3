//! Theme endpoints
//!
//! Themes carry design tokens as a JSON object. Exactly one theme is
//! active; activation swaps the flag in a single transaction so clients
//! never observe zero or two active themes.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use nashir_common::events::NashirEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_admin, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ThemeRow {
    guid: String,
    name: String,
    tokens: String,
    active: bool,
    created_at: String,
    updated_at: String,
}

/// Theme with its tokens decoded for the client
#[derive(Debug, Serialize)]
pub struct ThemeView {
    pub guid: String,
    pub name: String,
    pub tokens: Value,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ThemeRow> for ThemeView {
    fn from(row: ThemeRow) -> Self {
        let tokens = serde_json::from_str(&row.tokens).unwrap_or_else(|_| Value::Object(Default::default()));
        ThemeView {
            guid: row.guid,
            name: row.name,
            tokens,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// GET /api/themes
pub async fn list_themes(State(state): State<AppState>) -> Result<Json<Vec<ThemeView>>> {
    let themes = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(themes.into_iter().map(ThemeView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateThemeRequest {
    pub name: String,
    pub tokens: Value,
}

/// POST /api/themes (admin)
///
/// Tokens must be a JSON object. New themes start inactive.
pub async fn create_theme(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateThemeRequest>,
) -> Result<Json<ThemeView>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if !req.tokens.is_object() {
        return Err(ApiError::BadRequest("tokens must be a JSON object".to_string()));
    }

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM themes WHERE name = ?")
        .bind(req.name.trim())
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("theme already exists: {}", req.name.trim())));
    }

    let guid = Uuid::new_v4().to_string();
    let tokens = req.tokens.to_string();
    sqlx::query("INSERT INTO themes (guid, name, tokens, active) VALUES (?, ?, ?, 0)")
        .bind(&guid)
        .bind(req.name.trim())
        .bind(&tokens)
        .execute(&state.db)
        .await?;

    let theme = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(ThemeView::from(theme)))
}

/// POST /api/themes/:id/activate (admin)
///
/// Deactivates every theme and activates the requested one in one
/// transaction. Emits ThemeActivated.
pub async fn activate_theme(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ThemeView>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let theme = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE themes SET active = 0, updated_at = CURRENT_TIMESTAMP WHERE active = 1")
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE themes SET active = 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(&theme.guid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Theme {} activated by {}", theme.name, user.username);
    state.events.emit_lossy(NashirEvent::ThemeActivated {
        theme_id: theme.guid.clone(),
        name: theme.name.clone(),
        timestamp: Utc::now(),
    });

    let updated = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE guid = ?")
        .bind(&theme.guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(ThemeView::from(updated)))
}
