//! Site announcements
//!
//! Banner messages shown across the site. The public endpoint filters
//! by the active flag and the [starts_at, ends_at] window; critical
//! announcements sort ahead of the rest.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nashir_common::events::NashirEvent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_admin, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Announcement {
    pub guid: String,
    pub title: String,
    pub body: String,
    pub level: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn valid_level(level: &str) -> bool {
    matches!(level, "info" | "warning" | "critical")
}

/// Parse and normalize an RFC3339 window bound
fn normalize_bound(raw: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {}", raw)))?;
    Ok(parsed.with_timezone(&Utc).to_rfc3339())
}

/// GET /api/announcements/active
///
/// Announcements currently in their display window, critical first,
/// then newest.
pub async fn active_announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>> {
    let now = Utc::now().to_rfc3339();
    let announcements = sqlx::query_as::<_, Announcement>(
        r#"
        SELECT * FROM announcements
        WHERE active = 1
          AND (starts_at IS NULL OR starts_at <= ?)
          AND (ends_at IS NULL OR ends_at >= ?)
        ORDER BY CASE WHEN level = 'critical' THEN 0 ELSE 1 END, created_at DESC
        "#,
    )
    .bind(&now)
    .bind(&now)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(announcements))
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub level: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub active: Option<bool>,
}

/// POST /api/announcements (admin)
///
/// Creating an active announcement emits AnnouncementPublished.
pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let level = req.level.unwrap_or_else(|| "info".to_string());
    if !valid_level(&level) {
        return Err(ApiError::BadRequest(format!("invalid level: {}", level)));
    }

    let starts_at = req.starts_at.as_deref().map(normalize_bound).transpose()?;
    let ends_at = req.ends_at.as_deref().map(normalize_bound).transpose()?;
    let active = req.active.unwrap_or(true);

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO announcements (guid, title, body, level, starts_at, ends_at, active)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(req.title.trim())
    .bind(&req.body)
    .bind(&level)
    .bind(&starts_at)
    .bind(&ends_at)
    .bind(active)
    .execute(&state.db)
    .await?;

    if active {
        state.events.emit_lossy(NashirEvent::AnnouncementPublished {
            announcement_id: guid.clone(),
            title: req.title.trim().to_string(),
            level: level.clone(),
            timestamp: Utc::now(),
        });
    }

    let announcement = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(announcement))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub level: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub active: Option<bool>,
}

/// PUT /api/announcements/:id (admin)
pub async fn update_announcement(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let existing = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let title = req.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let level = req.level.unwrap_or(existing.level);
    if !valid_level(&level) {
        return Err(ApiError::BadRequest(format!("invalid level: {}", level)));
    }

    let starts_at = match req.starts_at {
        Some(raw) => Some(normalize_bound(&raw)?),
        None => existing.starts_at,
    };
    let ends_at = match req.ends_at {
        Some(raw) => Some(normalize_bound(&raw)?),
        None => existing.ends_at,
    };

    sqlx::query(
        r#"
        UPDATE announcements
        SET title = ?, body = ?, level = ?, starts_at = ?, ends_at = ?, active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(title.trim())
    .bind(req.body.unwrap_or(existing.body))
    .bind(&level)
    .bind(&starts_at)
    .bind(&ends_at)
    .bind(req.active.unwrap_or(existing.active))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let announcement = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(announcement))
}

/// DELETE /api/announcements/:id (admin)
pub async fn delete_announcement(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let result = sqlx::query("DELETE FROM announcements WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }

    Ok(Json(json!({ "status": "deleted" })))
}
