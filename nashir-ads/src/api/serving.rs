//! Public ad delivery endpoints
//!
//! Serving degrades instead of failing: a slot with nothing deliverable
//! answers 200 with an empty list so reader pages never break on ads.
//! Impression dedup rides on the (creative_id, session_key) primary
//! key; the client-generated session key is opaque here.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use nashir_common::config::get_setting_i64;

use crate::api::session::{not_found, request_locale};
use crate::error::{ApiError, Result};
use crate::models::AdCreative;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub device: Option<String>,
}

/// GET /api/ads/slot/:slot_id - deliverable creatives for a slot
///
/// Filters by creative active flag, campaign status and window, and
/// device class. The rotation_start index advances round-robin per
/// request so clients starting the carousel there spread first
/// positions across creatives.
pub async fn serve_slot(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>> {
    let now = Utc::now().to_rfc3339();

    let mut creatives: Vec<AdCreative> = sqlx::query_as(
        r#"
        SELECT c.* FROM ad_creatives c
        JOIN ad_campaigns p ON p.guid = c.campaign_id
        WHERE c.slot = ?
          AND c.active = 1
          AND p.status = 'active'
          AND (p.starts_at IS NULL OR p.starts_at <= ?)
          AND (p.ends_at IS NULL OR p.ends_at >= ?)
        ORDER BY c.weight DESC, c.created_at
        "#,
    )
    .bind(&slot_id)
    .bind(&now)
    .bind(&now)
    .fetch_all(&state.db)
    .await?;

    if let Some(device) = query.device.as_deref() {
        creatives.retain(|creative| creative.matches_device(device));
    }

    let max_creatives = get_setting_i64(&state.db, "ad_slot_max_creatives", 10).await?.max(1);
    creatives.truncate(max_creatives as usize);

    let rotation_start = state.rotation.next_start(&slot_id, creatives.len());
    let rotation_interval_ms = get_setting_i64(&state.db, "ad_rotation_interval_ms", 8000).await?;

    debug!(slot = %slot_id, served = creatives.len(), rotation_start, "slot served");

    Ok(Json(json!({
        "slot": slot_id,
        "creatives": creatives,
        "rotation_start": rotation_start,
        "rotation_interval_ms": rotation_interval_ms,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub session_key: String,
}

/// POST /api/ads/track/impression/:creative_id - record one view
///
/// Repeat impressions from the same session are acknowledged but not
/// counted again [REQ-ADS-010].
pub async fn track_impression(
    State(state): State<AppState>,
    Path(creative_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<TrackRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    if request.session_key.trim().is_empty() {
        return Err(ApiError::BadRequest("session_key is required".to_string()));
    }

    let exists: Option<String> = sqlx::query_scalar("SELECT guid FROM ad_creatives WHERE guid = ?")
        .bind(&creative_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(not_found(locale));
    }

    let result = sqlx::query(
        "INSERT OR IGNORE INTO ad_impressions (creative_id, session_key) VALUES (?, ?)",
    )
    .bind(&creative_id)
    .bind(request.session_key.trim())
    .execute(&state.db)
    .await?;

    let counted = result.rows_affected() == 1;
    debug!(creative = %creative_id, counted, "impression tracked");
    Ok(Json(json!({ "counted": counted })))
}

/// POST /api/ads/track/click/:creative_id - record a click-through
///
/// Every click appends a row; the destination URL comes back so the
/// client can open it without a second request.
pub async fn track_click(
    State(state): State<AppState>,
    Path(creative_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<TrackRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    if request.session_key.trim().is_empty() {
        return Err(ApiError::BadRequest("session_key is required".to_string()));
    }

    let destination: Option<String> =
        sqlx::query_scalar("SELECT destination_url FROM ad_creatives WHERE guid = ?")
            .bind(&creative_id)
            .fetch_optional(&state.db)
            .await?;
    let Some(destination_url) = destination else {
        return Err(not_found(locale));
    };

    sqlx::query("INSERT INTO ad_clicks (creative_id, session_key) VALUES (?, ?)")
        .bind(&creative_id)
        .bind(request.session_key.trim())
        .execute(&state.db)
        .await?;

    debug!(creative = %creative_id, "click tracked");
    Ok(Json(json!({ "destination_url": destination_url })))
}
